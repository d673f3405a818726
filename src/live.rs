use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use crate::post::Post;

const NEW_MESSAGE: &str = "new message";

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("websocket failure: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("subscribe frame could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Name of the per-viewer channel carrying dashboard pushes.
pub fn channel_name(email: &str) -> String {
    format!("dashboard-{email}")
}

#[derive(Deserialize, Debug)]
struct Envelope {
    event: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize, Debug)]
struct NewMessage {
    post: Post,
}

/// Extracts the pushed post from a raw frame, if it is a "new message"
/// event for `channel`. The broker string-encodes `data` on some paths,
/// so both shapes are accepted.
fn parse_event(raw: &str, channel: &str) -> Option<Post> {
    let envelope: Envelope = serde_json::from_str(raw).ok()?;
    if envelope.event != NEW_MESSAGE {
        return None;
    }
    if envelope.channel.as_deref().is_some_and(|name| name != channel) {
        return None;
    }
    let message: NewMessage = match envelope.data {
        Value::String(inner) => serde_json::from_str(&inner).ok()?,
        data => serde_json::from_value(data).ok()?,
    };
    Some(message.post)
}

/// Live subscription to a viewer's dashboard channel. Dropping the handle
/// aborts the reader task, so an unmounted component stops receiving.
pub struct LiveSubscription {
    events: mpsc::UnboundedReceiver<Post>,
    reader: JoinHandle<()>,
}

impl LiveSubscription {
    /// The next pushed post; `None` once the channel has closed.
    pub async fn recv(&mut self) -> Option<Post> {
        self.events.recv().await
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

pub async fn subscribe(broker: &Url, email: &str) -> Result<LiveSubscription, LiveError> {
    let channel = channel_name(email);
    let (mut socket, _) = connect_async(broker.as_str()).await?;

    let frame = serde_json::to_string(&serde_json::json!({
        "event": "pusher:subscribe",
        "data": { "channel": &channel },
    }))?;
    socket.send(Message::Text(frame)).await?;
    info!("Subscribed to {}", channel);

    let (events_tx, events) = mpsc::unbounded_channel();
    let reader = tokio::spawn(async move {
        while let Some(message) = socket.next().await {
            let message = match message {
                Ok(message) => message,
                Err(error) => {
                    warn!("live channel dropped: {}", error);
                    break;
                }
            };
            match message {
                Message::Text(raw) => {
                    if let Some(post) = parse_event(&raw, &channel) {
                        if events_tx.send(post).is_err() {
                            break;
                        }
                    }
                }
                Message::Close(_) => {
                    debug!("live channel closed by broker");
                    break;
                }
                _ => {}
            }
        }
    });

    Ok(LiveSubscription { events, reader })
}
