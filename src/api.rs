use std::{
    fmt::{self, Display},
    future::Future,
    path::Path,
};

use mime_guess::MimeGuess;
use reqwest::{multipart, Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::{
    config::Config,
    post::{NewPost, Post},
    viewer::Viewer,
};

const RETRY_LIMIT: u32 = 3;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {0}")]
    Status(StatusCode),
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("could not read attachment: {0}")]
    Attachment(#[from] std::io::Error),
}

impl ApiError {
    /// Transient failures are worth retrying; everything else should be
    /// reported to the viewer.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Http(error) => error.is_timeout() || error.is_connect(),
            ApiError::Status(status) => status.is_server_error(),
            ApiError::Endpoint(_) => false,
            ApiError::Attachment(_) => false,
        }
    }
}

/// Snapshot of a failed operation, kept on the owning view model so the
/// host can offer a retry for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    message: String,
    transient: bool,
}

impl FetchFailure {
    pub fn new(error: &ApiError) -> Self {
        Self {
            message: error.to_string(),
            transient: error.is_transient(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }
}

impl Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// The slice of the backend the view models consume. Production code uses
/// [`ApiClient`]; tests substitute a scripted fake.
pub trait DashboardApi {
    fn fetch_page(&self, cursor: u64) -> impl Future<Output = ApiResult<Vec<Post>>> + Send;
    fn fetch_viewer(&self) -> impl Future<Output = ApiResult<Viewer>> + Send;
    fn create_post(&self, post: &NewPost) -> impl Future<Output = ApiResult<()>> + Send;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    server: Url,
    session: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            server: config.server().clone(),
            session: config.session(),
        }
    }

    fn client(&self) -> ClientWithMiddleware {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(RETRY_LIMIT);
        ClientBuilder::new(self.client.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Ok(self.server.join(path)?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        let response = self
            .client()
            .get(url)
            .header("Cookie", &self.session)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }
        Ok(response.json().await?)
    }
}

impl DashboardApi for ApiClient {
    fn fetch_page(&self, cursor: u64) -> impl Future<Output = ApiResult<Vec<Post>>> + Send {
        async move {
            let mut url = self.endpoint("api/dashboard")?;
            url.query_pairs_mut()
                .append_pair("skip", &cursor.to_string());
            let page: DashboardPage = self.get_json(url).await?;
            Ok(page.posts)
        }
    }

    fn fetch_viewer(&self) -> impl Future<Output = ApiResult<Viewer>> + Send {
        async move {
            let envelope: UserEnvelope = self.get_json(self.endpoint("api/user")?).await?;
            Ok(envelope.user)
        }
    }

    fn create_post(&self, post: &NewPost) -> impl Future<Output = ApiResult<()>> + Send {
        async move {
            let mut form = multipart::Form::new().text("post", post.content.clone());
            if let Some(path) = &post.image {
                form = form.part("image", image_part(path).await?);
            }

            // submissions are not idempotent, so they skip the retry
            // middleware and go through the bare client
            let response = self
                .client
                .post(self.endpoint("api/post")?)
                .header("Cookie", &self.session)
                .multipart(form)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(ApiError::Status(response.status()));
            }
            Ok(())
        }
    }
}

async fn image_part(path: &Path) -> ApiResult<multipart::Part> {
    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let mime = MimeGuess::from_path(path).first_or_octet_stream();
    Ok(multipart::Part::bytes(bytes)
        .file_name(filename)
        .mime_str(mime.as_ref())?)
}

//==============================================================================
//
//==============================================================================
#[derive(Deserialize, Debug, Clone)]
struct DashboardPage {
    posts: Vec<Post>,
}

#[derive(Deserialize, Debug, Clone)]
struct UserEnvelope {
    user: Viewer,
}
