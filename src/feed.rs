use std::collections::HashSet;

use log::{debug, warn};

use crate::{
    api::{ApiError, DashboardApi, FetchFailure},
    post::Post,
};

/// Feed lifecycle. `Ready` is re-entered on every page append and live
/// prepend; there is no terminal state while the model is mounted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
}

/// Token for an in-flight page fetch. Only one may exist at a time, and
/// results carrying a superseded token are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    seq: u64,
    cursor: u64,
}

impl PageRequest {
    pub fn cursor(&self) -> u64 {
        self.cursor
    }
}

/// The viewer's feed: an ordered, newest-first list of posts, grown at the
/// tail by pagination and at the head by live events. Both paths
/// de-duplicate by post id.
#[derive(Debug, Default)]
pub struct FeedViewModel {
    posts: Vec<Post>,
    seen: HashSet<u64>,
    cursor: u64,
    next_seq: u64,
    in_flight: Option<PageRequest>,
    state: FeedState,
    last_error: Option<FetchFailure>,
}

impl FeedViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    pub fn last_error(&self) -> Option<&FetchFailure> {
        self.last_error.as_ref()
    }

    /// Claims the next page fetch. Refused while another request is in
    /// flight, so overlapping scroll triggers cannot double-append.
    pub fn begin_page(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() {
            debug!("page {} already in flight", self.cursor);
            return None;
        }
        self.next_seq += 1;
        let request = PageRequest {
            seq: self.next_seq,
            cursor: self.cursor,
        };
        self.in_flight = Some(request);
        if self.state == FeedState::Uninitialized {
            self.state = FeedState::Loading;
        }
        Some(request)
    }

    /// Folds a fetched page into the feed and advances the cursor. A stale
    /// token is discarded without touching any state. Returns how many
    /// posts were actually added.
    pub fn apply_page(&mut self, request: PageRequest, posts: Vec<Post>) -> usize {
        if self.in_flight != Some(request) {
            debug!("discarding superseded page response (seq {})", request.seq);
            return 0;
        }
        self.in_flight = None;
        self.cursor += 1;
        self.state = FeedState::Ready;
        self.last_error = None;

        let mut added = 0;
        for post in posts {
            if self.seen.insert(post.id) {
                self.posts.push(post);
                added += 1;
            }
        }
        added
    }

    /// Records a failed fetch. The cursor is not advanced, so the next
    /// trigger repeats the same page.
    pub fn fail_page(&mut self, request: PageRequest, error: &ApiError) {
        if self.in_flight != Some(request) {
            return;
        }
        self.in_flight = None;
        if self.state == FeedState::Loading {
            self.state = FeedState::Uninitialized;
        }
        warn!("page {} failed: {}", request.cursor, error);
        self.last_error = Some(FetchFailure::new(error));
    }

    /// Fetches the page at the current cursor and folds it in. Returns the
    /// number of new posts, or zero when a request is already in flight.
    pub async fn load_next_page(&mut self, api: &impl DashboardApi) -> Result<usize, ApiError> {
        let Some(request) = self.begin_page() else {
            return Ok(0);
        };
        match api.fetch_page(request.cursor()).await {
            Ok(posts) => Ok(self.apply_page(request, posts)),
            Err(error) => {
                self.fail_page(request, &error);
                Err(error)
            }
        }
    }

    /// Primes the feed on the no-session to session transition. Once the
    /// feed has left `Uninitialized` this is a no-op; the scroll trigger
    /// drives everything after page 0.
    pub async fn on_session_established(
        &mut self,
        api: &impl DashboardApi,
    ) -> Result<usize, ApiError> {
        if self.state != FeedState::Uninitialized {
            return Ok(0);
        }
        self.load_next_page(api).await
    }

    /// Inserts a pushed post at the head of the feed. The cursor is never
    /// touched; a post already present is dropped.
    pub fn on_live_event(&mut self, post: Post) -> bool {
        if !self.seen.insert(post.id) {
            debug!("live event for known post {}", post.id);
            return false;
        }
        self.posts.insert(0, post);
        self.state = FeedState::Ready;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{post, server_error, FakeApi};

    #[tokio::test]
    async fn pages_append_and_advance_cursor() {
        let api = FakeApi::with_pages(vec![
            Ok((0..10).map(post).collect()),
            Ok((10..15).map(post).collect()),
        ]);
        let mut feed = FeedViewModel::new();

        assert_eq!(feed.load_next_page(&api).await.unwrap(), 10);
        assert_eq!(feed.posts().len(), 10);
        assert_eq!(feed.cursor(), 1);

        assert_eq!(feed.load_next_page(&api).await.unwrap(), 5);
        assert_eq!(feed.posts().len(), 15);
        assert_eq!(feed.cursor(), 2);
        assert_eq!(feed.state(), FeedState::Ready);
    }

    #[tokio::test]
    async fn session_establishment_primes_once() {
        let api = FakeApi::with_pages(vec![Ok((0..10).map(post).collect())]);
        let mut feed = FeedViewModel::new();

        assert_eq!(feed.state(), FeedState::Uninitialized);
        assert_eq!(feed.on_session_established(&api).await.unwrap(), 10);
        assert_eq!(feed.cursor(), 1);

        // a second session event must not refetch page 0
        assert_eq!(feed.on_session_established(&api).await.unwrap(), 0);
        assert_eq!(feed.cursor(), 1);
        assert_eq!(feed.posts().len(), 10);
    }

    #[test]
    fn live_events_prepend_without_touching_cursor() {
        let mut feed = FeedViewModel::new();
        let request = feed.begin_page().unwrap();
        feed.apply_page(request, vec![post(1), post(2)]);

        assert!(feed.on_live_event(post(3)));
        assert_eq!(feed.cursor(), 1);
        let ids: Vec<u64> = feed.posts().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn duplicates_are_inserted_once() {
        let mut feed = FeedViewModel::new();

        // a live push racing ahead of the page that contains it
        assert!(feed.on_live_event(post(5)));
        let request = feed.begin_page().unwrap();
        assert_eq!(feed.apply_page(request, vec![post(5), post(4)]), 1);
        assert_eq!(feed.posts().len(), 2);

        // and the same id pushed twice
        assert!(!feed.on_live_event(post(4)));
        assert_eq!(feed.posts().len(), 2);
    }

    #[tokio::test]
    async fn failed_page_keeps_cursor_and_is_retryable() {
        let api = FakeApi::with_pages(vec![Err(server_error()), Ok(vec![post(1)])]);
        let mut feed = FeedViewModel::new();

        let error = feed.load_next_page(&api).await.unwrap_err();
        assert!(error.is_transient());
        assert_eq!(feed.cursor(), 0);
        assert_eq!(feed.state(), FeedState::Uninitialized);
        assert!(feed.last_error().unwrap().is_transient());

        // the retry repeats the same page
        assert_eq!(feed.load_next_page(&api).await.unwrap(), 1);
        assert_eq!(feed.cursor(), 1);
        assert!(feed.last_error().is_none());
    }

    #[test]
    fn overlapping_requests_are_refused_and_stale_results_discarded() {
        let mut feed = FeedViewModel::new();

        let first = feed.begin_page().unwrap();
        assert!(feed.begin_page().is_none());

        // the first request dies, a second one takes over
        feed.fail_page(first, &server_error());
        let second = feed.begin_page().unwrap();

        // the late response for the dead request must not apply
        assert_eq!(feed.apply_page(first, vec![post(1), post(2)]), 0);
        assert_eq!(feed.cursor(), 0);
        assert!(feed.posts().is_empty());

        assert_eq!(feed.apply_page(second, vec![post(1), post(2)]), 2);
        assert_eq!(feed.cursor(), 1);
    }
}
