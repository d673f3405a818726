use std::path::PathBuf;

use chrono::{DateTime, Local};
use log::info;
use serde::{Deserialize, Serialize};

use crate::viewer::Viewer;

/// Hard length limit the backend enforces on post content.
pub const CONTENT_LIMIT: usize = 280;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: u64,
    pub author: Viewer,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    pub created_at: DateTime<Local>,
    #[serde(default)]
    pub is_repost: bool,
    #[serde(default)]
    pub post_created_at: Option<DateTime<Local>>,
    #[serde(default)]
    pub likes: Vec<Engagement>,
    #[serde(default)]
    pub reposts: Vec<Engagement>,
}

impl Post {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn repost_count(&self) -> usize {
        self.reposts.len()
    }

    pub fn liked_by(&self, viewer_id: u64) -> bool {
        self.likes.iter().any(|like| like.author.id == viewer_id)
    }

    pub fn excerpt(&self) -> String {
        const WIDTH: usize = 60;
        let mut excerpt: String = self.content.chars().take(WIDTH).collect();
        if self.content.chars().count() > WIDTH {
            excerpt.push_str("...");
        }
        excerpt
    }
}

/// A like or repost relation. The backend nests full author and post
/// objects here; only the identifiers survive deserialization.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Engagement {
    pub author: EntityRef,
    pub post: EntityRef,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRef {
    pub id: u64,
}

/// Draft contents packaged for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub content: String,
    pub image: Option<PathBuf>,
}

impl NewPost {
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

pub fn display_posts(posts: &[Post]) {
    if !log::log_enabled!(log::Level::Info) {
        return;
    }

    let (mut id_width, mut author_width, likes_width) = (4_usize, 8_usize, 7_usize);
    for post in posts.iter() {
        id_width = post.id.to_string().len().max(id_width);
        author_width = post.author.username.len().max(author_width);
    }

    info!(
        "+-{:-<id_width$}-+-{:-<author_width$}-+-{:-<likes_width$}-+-{}------- - -",
        " Id ", " Author ", " Likes ", " Content "
    );
    for post in posts.iter() {
        let marker = if post.is_repost { "[rt] " } else { "" };
        info!(
            "| {:id_width$} | {:author_width$} | {:likes_width$} | {}{}",
            post.id,
            post.author.username,
            post.like_count(),
            marker,
            post.excerpt()
        );
    }
    info!(
        "+-{}-+-{}-+-{}-+------------ - -",
        "-".repeat(id_width),
        "-".repeat(author_width),
        "-".repeat(likes_width)
    );
    info!("");
}
