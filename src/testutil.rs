use std::{collections::VecDeque, future::Future, sync::Mutex};

use chrono::Local;
use reqwest::StatusCode;

use crate::{
    api::{ApiError, ApiResult, DashboardApi},
    post::{NewPost, Post},
    viewer::Viewer,
};

/// Scripted stand-in for the backend: page and profile responses are
/// queued up front, submissions are recorded. An empty queue answers with
/// an empty page or a default profile.
#[derive(Debug, Default)]
pub struct FakeApi {
    pub pages: Mutex<VecDeque<ApiResult<Vec<Post>>>>,
    pub viewers: Mutex<VecDeque<ApiResult<Viewer>>>,
    pub submissions: Mutex<Vec<NewPost>>,
    pub submit_results: Mutex<VecDeque<ApiResult<()>>>,
}

impl FakeApi {
    pub fn with_pages(pages: Vec<ApiResult<Vec<Post>>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            ..Default::default()
        }
    }
}

impl DashboardApi for FakeApi {
    fn fetch_page(&self, _cursor: u64) -> impl Future<Output = ApiResult<Vec<Post>>> + Send {
        let next = self
            .pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()));
        std::future::ready(next)
    }

    fn fetch_viewer(&self) -> impl Future<Output = ApiResult<Viewer>> + Send {
        let next = self
            .viewers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(viewer(1, "ada")));
        std::future::ready(next)
    }

    fn create_post(&self, post: &NewPost) -> impl Future<Output = ApiResult<()>> + Send {
        self.submissions.lock().unwrap().push(post.clone());
        let next = self
            .submit_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        std::future::ready(next)
    }
}

pub fn viewer(id: u64, username: &str) -> Viewer {
    Viewer {
        id,
        username: username.to_owned(),
        email: Some(format!("{username}@example.com")),
        ..Default::default()
    }
}

pub fn post(id: u64) -> Post {
    Post {
        id,
        author: viewer(1, "ada"),
        content: format!("post {id}"),
        image: None,
        created_at: Local::now(),
        is_repost: false,
        post_created_at: None,
        likes: Vec::new(),
        reposts: Vec::new(),
    }
}

pub fn server_error() -> ApiError {
    ApiError::Status(StatusCode::INTERNAL_SERVER_ERROR)
}
