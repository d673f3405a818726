use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use log::{debug, info};

use crate::{
    api::{ApiError, DashboardApi, FetchFailure},
    post::{NewPost, CONTENT_LIMIT},
    viewer::Viewer,
};

/// Hands out revocable preview handles for selected images, standing in
/// for the host's object-URL registry. An entry lives until its handle is
/// dropped, so replacing or clearing an attachment releases the preview.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry(Arc<Mutex<PreviewEntries>>);

#[derive(Debug, Default)]
struct PreviewEntries {
    next_id: u64,
    active: HashSet<u64>,
}

impl PreviewRegistry {
    pub fn register(&self, path: &Path) -> PreviewHandle {
        let mut entries = self.0.lock().unwrap();
        entries.next_id += 1;
        let id = entries.next_id;
        entries.active.insert(id);
        debug!("preview {} for {}", id, path.display());
        PreviewHandle {
            id,
            registry: Arc::clone(&self.0),
        }
    }

    pub fn active(&self) -> usize {
        self.0.lock().unwrap().active.len()
    }
}

#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    registry: Arc<Mutex<PreviewEntries>>,
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.lock().unwrap().active.remove(&self.id);
    }
}

#[derive(Debug, Default)]
struct Draft {
    text: String,
    image: Option<Attachment>,
}

#[derive(Debug)]
struct Attachment {
    path: PathBuf,
    #[allow(dead_code)]
    preview: PreviewHandle,
}

/// Navigation and composer state: the viewer's profile summary plus the
/// in-progress draft. Created empty; the draft is cleared on successful
/// submit or explicit cancel, never persisted.
#[derive(Debug, Default)]
pub struct NavViewModel {
    viewer: Option<Viewer>,
    draft: Draft,
    previews: PreviewRegistry,
    last_error: Option<FetchFailure>,
}

impl NavViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        self.viewer.as_ref()
    }

    pub fn draft_text(&self) -> &str {
        &self.draft.text
    }

    pub fn attachment(&self) -> Option<&Path> {
        self.draft.image.as_ref().map(|image| image.path.as_path())
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn last_error(&self) -> Option<&FetchFailure> {
        self.last_error.as_ref()
    }

    /// Characters still available in the draft.
    pub fn remaining(&self) -> usize {
        CONTENT_LIMIT - self.draft.text.chars().count()
    }

    /// Fetches the profile and notification summary shown in the nav.
    /// Until this succeeds the nav renders without a profile. Once loaded,
    /// further session events are no-ops.
    pub async fn load_viewer_profile(&mut self, api: &impl DashboardApi) -> Result<(), ApiError> {
        if self.viewer.is_some() {
            return Ok(());
        }
        match api.fetch_viewer().await {
            Ok(viewer) => {
                self.viewer = Some(viewer);
                self.last_error = None;
                Ok(())
            }
            Err(error) => {
                self.last_error = Some(FetchFailure::new(&error));
                Err(error)
            }
        }
    }

    /// Replaces the draft text. An edit that exceeds the content limit is
    /// rejected outright and the draft keeps its current value.
    pub fn update_draft_text(&mut self, text: &str) -> bool {
        if text.chars().count() > CONTENT_LIMIT {
            return false;
        }
        self.draft.text = text.to_owned();
        true
    }

    /// Attaches an image to the draft. At most one image: a previous
    /// selection is dropped, which revokes its preview handle.
    pub fn select_image(&mut self, path: PathBuf) {
        let preview = self.previews.register(&path);
        self.draft.image = Some(Attachment { path, preview });
    }

    /// Explicit cancel: empties the draft and releases the preview.
    pub fn clear_draft(&mut self) {
        self.draft = Draft::default();
    }

    /// Submits the draft and clears it on success. A failed submit leaves
    /// the draft intact for another attempt.
    pub async fn submit(&mut self, api: &impl DashboardApi) -> Result<(), ApiError> {
        let post = NewPost {
            content: self.draft.text.clone(),
            image: self.draft.image.as_ref().map(|image| image.path.clone()),
        };
        match api.create_post(&post).await {
            Ok(()) => {
                self.clear_draft();
                self.last_error = None;
                info!("Post made!");
                Ok(())
            }
            Err(error) => {
                self.last_error = Some(FetchFailure::new(&error));
                Err(error)
            }
        }
    }
}
