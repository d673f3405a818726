use log::info;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Viewer {
    pub id: u64,
    pub email: Option<String>,
    pub username: String,
    pub displayname: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<String>,
    pub banner: Option<String>,
    #[serde(rename = "_count")]
    pub counts: ViewerCounts,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerCounts {
    #[serde(default)]
    pub notifications: u64,
}

impl Viewer {
    /// Name shown in the nav: the display name when one is set, the
    /// username otherwise.
    pub fn display_name(&self) -> &str {
        match &self.displayname {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }

    pub fn handle(&self) -> String {
        format!("@{}", self.username)
    }
}

pub fn display_viewer(viewer: &Viewer) {
    info!("Signed in as {} ({})", viewer.handle(), viewer.display_name());
    if viewer.counts.notifications > 0 {
        info!("{} unread notifications", viewer.counts.notifications);
    }
}
