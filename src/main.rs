mod api;
mod config;
mod feed;
mod live;
mod nav;
mod post;
mod viewer;

#[cfg(test)]
mod testutil;

use std::error::Error;

use api::ApiClient;
use config::Config;
use feed::FeedViewModel;
use log::{info, warn};
use nav::NavViewModel;
use post::display_posts;
use viewer::display_viewer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::parse();
    config.init_logger();
    info!("# Dashboard #");
    info!("");

    let api = ApiClient::new(&config);

    info!("Loading viewer profile");
    let mut nav = NavViewModel::new();
    nav.load_viewer_profile(&api).await?;
    if let Some(viewer) = nav.viewer() {
        display_viewer(viewer);
    }
    info!("");

    info!("Loading feed");
    let mut feed = FeedViewModel::new();
    feed.on_session_established(&api).await?;
    for _ in 1..config.pages() {
        feed.load_next_page(&api).await?;
    }
    info!("{} posts (cursor at page {})", feed.posts().len(), feed.cursor());
    display_posts(feed.posts());

    if let Some(message) = config.message() {
        info!("Composing post");
        if !nav.update_draft_text(message) {
            warn!(
                "Message is longer than {} characters, not sent",
                post::CONTENT_LIMIT
            );
        } else {
            if let Some(image) = config.image() {
                nav.select_image(image.to_owned());
            }
            nav.submit(&api).await?;
        }
        info!("");
    }

    if config.follow() {
        let broker = config
            .live()
            .ok_or("following live updates needs --live <url>")?;
        let email = nav
            .viewer()
            .and_then(|viewer| viewer.email.clone())
            .ok_or("viewer profile has no email for the live channel")?;

        info!("Following live updates (ctrl-c to stop)");
        let mut subscription = live::subscribe(broker, &email).await?;
        while let Some(new_post) = subscription.recv().await {
            if feed.on_live_event(new_post) {
                if let Some(latest) = feed.posts().first() {
                    info!("| {} | {}", latest.author.username, latest.excerpt());
                }
            }
        }
        warn!("Live channel ended");
    }

    info!("All done!");
    Ok(())
}
