//! Subscription reconciliation.
//!
//! Turns a title or TMDB id into one upstream identity and decides between
//! "already subscribed" and "create". The upstream subscription set is re-read on
//! every call; nothing is cached here.

use std::sync::Arc;

use checkmp_core::{
    ErrorKind, MediaCandidate, MediaQuery, MediaType, ReconciliationResult, Subscription,
};
use checkmp_upstream::{MediaService, UpstreamError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Page size used when resolving a title through upstream search.
const RESOLVE_SEARCH_COUNT: u32 = 8;

#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("either title or tmdb_id is required")]
    InvalidQuery,
    #[error("no match found for {0:?}")]
    NoMatch(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl SubscribeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidQuery => ErrorKind::InvalidQuery,
            Self::NoMatch(_) => ErrorKind::NoMatch,
            Self::Upstream(e) => e.kind(),
        }
    }
}

impl From<&SubscribeError> for ReconciliationResult {
    fn from(e: &SubscribeError) -> Self {
        ReconciliationResult::failed(e.kind(), e.to_string())
    }
}

#[derive(Clone)]
pub struct Reconciler {
    service: Arc<dyn MediaService>,
}

impl Reconciler {
    pub fn new(service: Arc<dyn MediaService>) -> Self {
        Self { service }
    }

    /// Subscribe to the media described by `query` unless an identical subscription exists.
    pub async fn subscribe(&self, query: &MediaQuery) -> Result<ReconciliationResult, SubscribeError> {
        let candidate = self.resolve(query).await?;
        let (Some(tmdb_id), Some(media_type)) = (candidate.tmdb_id, candidate.media_type) else {
            return Err(SubscribeError::NoMatch(describe(query)));
        };
        let season = query.season_for(media_type);

        let existing = self.find(tmdb_id, media_type, season).await?;
        if let Some(sub) = existing {
            debug!(tmdb_id, %media_type, ?season, id = sub.id, "subscription already present");
            return Ok(ReconciliationResult::already_exists(Some(sub)));
        }

        match self.service.create_subscription(&candidate, season).await {
            Ok(sub) => {
                info!(tmdb_id, %media_type, ?season, id = sub.id, "subscription created");
                Ok(ReconciliationResult::created(sub))
            }
            Err(UpstreamError::Conflict(msg)) => {
                warn!(tmdb_id, %media_type, ?season, message = %msg, "create raced an existing subscription");
                let sub = self.find(tmdb_id, media_type, season).await?;
                Ok(ReconciliationResult::already_exists(sub))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Current upstream subscription set.
    pub async fn list(&self) -> Result<Vec<Subscription>, SubscribeError> {
        Ok(self.service.list_subscriptions().await?)
    }

    pub async fn unsubscribe(&self, id: i64) -> Result<(), SubscribeError> {
        self.service.delete_subscription(id).await?;
        info!(id, "subscription deleted");
        Ok(())
    }

    /// Look up a subscription by TMDB id. `None` filters match anything.
    pub async fn check(
        &self,
        tmdb_id: i64,
        media_type: Option<MediaType>,
        season: Option<i32>,
    ) -> Result<Option<Subscription>, SubscribeError> {
        let subs = self.service.list_subscriptions().await?;
        Ok(subs.into_iter().find(|s| {
            s.tmdb_id == Some(tmdb_id)
                && media_type.is_none_or(|t| s.media_type.is_none_or(|st| st == t))
                && season.is_none_or(|n| s.season == Some(n))
        }))
    }

    /// Resolve `query` to a candidate with a TMDB id and a concrete media type.
    async fn resolve(&self, query: &MediaQuery) -> Result<MediaCandidate, SubscribeError> {
        if let Some(tmdb_id) = query.tmdb_id {
            return Ok(MediaCandidate {
                tmdb_id: Some(tmdb_id),
                title: query.trimmed_title().unwrap_or_default().to_string(),
                media_type: Some(query.media_type.unwrap_or_default()),
                ..Default::default()
            });
        }

        let title = query.trimmed_title().ok_or(SubscribeError::InvalidQuery)?;
        let candidates = self.service.search(title, 1, RESOLVE_SEARCH_COUNT).await?;
        let selected = select_candidate(&candidates, title, query.media_type)
            .ok_or_else(|| SubscribeError::NoMatch(title.to_string()))?;

        debug!(
            title = %title,
            tmdb_id = ?selected.tmdb_id,
            matched = %selected.title,
            "resolved title"
        );
        let mut candidate = selected.clone();
        candidate.media_type = Some(
            query
                .media_type
                .or(selected.media_type)
                .unwrap_or_default(),
        );
        Ok(candidate)
    }

    async fn find(
        &self,
        tmdb_id: i64,
        media_type: MediaType,
        season: Option<i32>,
    ) -> Result<Option<Subscription>, SubscribeError> {
        let subs = self.service.list_subscriptions().await?;
        Ok(subs
            .into_iter()
            .find(|s| s.matches(tmdb_id, media_type, season)))
    }
}

/// Pick the best candidate for `title`.
///
/// Only candidates with a TMDB id and a type compatible with `media_type` are eligible.
/// The first exact title match (case-insensitive) wins; otherwise the highest rating,
/// ties going to the earliest candidate in upstream order.
pub fn select_candidate<'a>(
    candidates: &'a [MediaCandidate],
    title: &str,
    media_type: Option<MediaType>,
) -> Option<&'a MediaCandidate> {
    let wanted = title.trim().to_lowercase();
    let eligible = |c: &MediaCandidate| {
        c.tmdb_id.is_some() && media_type.is_none_or(|t| c.media_type == Some(t))
    };

    if let Some(exact) = candidates
        .iter()
        .find(|c| eligible(c) && c.title.trim().to_lowercase() == wanted)
    {
        return Some(exact);
    }

    candidates
        .iter()
        .filter(|c| eligible(c))
        .fold(None, |best: Option<&'a MediaCandidate>, c| match best {
            Some(b) if b.rating >= c.rating => Some(b),
            _ => Some(c),
        })
}

fn describe(query: &MediaQuery) -> String {
    match (query.trimmed_title(), query.tmdb_id) {
        (_, Some(id)) => format!("tmdb:{id}"),
        (Some(title), None) => title.to_string(),
        (None, None) => String::new(),
    }
}
