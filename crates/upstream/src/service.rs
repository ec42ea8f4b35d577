use checkmp_core::{MediaCandidate, MediaStatistic, MediaType, Subscription};

use crate::UpstreamError;

/// The media-management service this facade wraps.
///
/// Everything that knows upstream paths and payload shapes lives behind this trait.
#[async_trait::async_trait]
pub trait MediaService: Send + Sync {
    /// Search media by title. Zero matches is an empty vec, not an error.
    async fn search(
        &self,
        title: &str,
        page: u32,
        count: u32,
    ) -> Result<Vec<MediaCandidate>, UpstreamError>;

    /// Fetch the current subscription set.
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, UpstreamError>;

    /// Subscribe to `candidate`. `season` is ignored for movies.
    async fn create_subscription(
        &self,
        candidate: &MediaCandidate,
        season: Option<i32>,
    ) -> Result<Subscription, UpstreamError>;

    async fn delete_subscription(&self, id: i64) -> Result<(), UpstreamError>;

    /// Popular titles among upstream subscribers.
    async fn popular(
        &self,
        media_type: MediaType,
        filter: &PopularFilter,
    ) -> Result<Vec<MediaCandidate>, UpstreamError>;

    async fn statistic(&self) -> Result<MediaStatistic, UpstreamError>;

    /// Storage usage, passed through as reported.
    async fn storage(&self) -> Result<serde_json::Value, UpstreamError>;

    /// Downloader status, passed through as reported.
    async fn downloader(&self) -> Result<serde_json::Value, UpstreamError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopularFilter {
    pub page: u32,
    pub count: u32,
    pub genre_id: Option<i64>,
    pub min_rating: Option<f64>,
}

impl Default for PopularFilter {
    fn default() -> Self {
        Self {
            page: 1,
            count: 20,
            genre_id: None,
            min_rating: None,
        }
    }
}
