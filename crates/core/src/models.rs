use serde::{Deserialize, Serialize};

use crate::types::{ErrorKind, MediaType, ReconcileAction, SubscriptionStatus};

/// Human-provided subscribe input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaQuery {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tmdb_id: Option<i64>,
    /// Absent means "take the type of the matched candidate" (tv when nothing says otherwise).
    #[serde(rename = "type", default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub season: Option<i32>,
}

impl MediaQuery {
    /// Title with surrounding whitespace removed; blank titles count as absent.
    pub fn trimmed_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Season that applies once the query resolved to `media_type`. Movies have none.
    pub fn season_for(&self, media_type: MediaType) -> Option<i32> {
        match media_type {
            MediaType::Tv => self.season,
            MediaType::Movie => None,
        }
    }
}

/// A search or hot-list result from the upstream service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaCandidate {
    pub tmdb_id: Option<i64>,
    pub douban_id: Option<String>,
    pub title: String,
    pub year: String,
    #[serde(rename = "type")]
    pub media_type: Option<MediaType>,
    pub rating: f64,
    pub overview: String,
    pub poster: String,
    pub backdrop: String,
    pub season: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_language: Option<String>,
}

/// A subscription record owned by the upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub tmdb_id: Option<i64>,
    pub title: String,
    pub year: String,
    #[serde(rename = "type")]
    pub media_type: Option<MediaType>,
    pub season: Option<i32>,
    pub poster: String,
    pub rating: f64,
    pub description: String,
    pub status: SubscriptionStatus,
}

impl Subscription {
    /// Whether this subscription covers the identity `{tmdb_id, type, season}`.
    ///
    /// A subscription whose type the upstream did not report matches either type.
    pub fn matches(&self, tmdb_id: i64, media_type: MediaType, season: Option<i32>) -> bool {
        self.tmdb_id == Some(tmdb_id)
            && self.media_type.is_none_or(|t| t == media_type)
            && self.season == season
    }
}

/// Result of a subscribe call, shaped for the inbound API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub action: ReconcileAction,
    pub subscription: Option<Subscription>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ReconciliationResult {
    pub fn created(subscription: Subscription) -> Self {
        let message = format!("subscribed to {}", display_name(&subscription));
        Self {
            action: ReconcileAction::Created,
            subscription: Some(subscription),
            message,
            error_kind: None,
        }
    }

    pub fn already_exists(subscription: Option<Subscription>) -> Self {
        let message = match &subscription {
            Some(sub) => format!("{} is already subscribed", display_name(sub)),
            None => "already subscribed".to_string(),
        };
        Self {
            action: ReconcileAction::AlreadyExists,
            subscription,
            message,
            error_kind: None,
        }
    }

    /// Failure result; `no_match` and `not_found` become `not_found`, everything else `error`.
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        let action = match kind {
            ErrorKind::NoMatch | ErrorKind::NotFound => ReconcileAction::NotFound,
            _ => ReconcileAction::Error,
        };
        Self {
            action,
            subscription: None,
            message: message.into(),
            error_kind: Some(kind),
        }
    }
}

fn display_name(sub: &Subscription) -> String {
    let name = if sub.title.is_empty() {
        match sub.tmdb_id {
            Some(id) => format!("tmdb:{id}"),
            None => format!("#{}", sub.id),
        }
    } else {
        sub.title.clone()
    };
    match sub.season {
        Some(season) => format!("{name} S{season:02}"),
        None => name,
    }
}

/// Library counts from the upstream dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStatistic {
    pub movie_count: u64,
    pub tv_count: u64,
    pub episode_count: u64,
    pub user_count: u64,
}

/// Dashboard summary returned by `/api/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub media: MediaStatistic,
    pub storage: Option<serde_json::Value>,
    pub downloader: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(tmdb_id: Option<i64>, media_type: Option<MediaType>, season: Option<i32>) -> Subscription {
        Subscription {
            id: 7,
            tmdb_id,
            title: "Squid Game".into(),
            year: "2021".into(),
            media_type,
            season,
            poster: String::new(),
            rating: 8.0,
            description: String::new(),
            status: SubscriptionStatus::Active,
        }
    }

    #[test]
    fn query_parses_upstream_type_label() {
        let q: MediaQuery =
            serde_json::from_str(r#"{"title":"鱿鱼游戏","type":"电视剧","season":2}"#).unwrap();
        assert_eq!(q.media_type, Some(MediaType::Tv));
        assert_eq!(q.trimmed_title(), Some("鱿鱼游戏"));

        let q: MediaQuery = serde_json::from_str(r#"{"tmdb_id":438631}"#).unwrap();
        assert_eq!(q.media_type, None);
    }

    #[test]
    fn blank_title_counts_as_absent() {
        let q = MediaQuery {
            title: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(q.trimmed_title(), None);
    }

    #[test]
    fn movie_queries_drop_season() {
        let q = MediaQuery {
            tmdb_id: Some(1),
            season: Some(3),
            ..Default::default()
        };
        assert_eq!(q.season_for(MediaType::Movie), None);
        assert_eq!(q.season_for(MediaType::Tv), Some(3));
    }

    #[test]
    fn subscription_identity_match() {
        let s = sub(Some(93405), Some(MediaType::Tv), Some(2));
        assert!(s.matches(93405, MediaType::Tv, Some(2)));
        assert!(!s.matches(93405, MediaType::Tv, Some(1)));
        assert!(!s.matches(93405, MediaType::Tv, None));
        assert!(!s.matches(93405, MediaType::Movie, Some(2)));
        assert!(!s.matches(1, MediaType::Tv, Some(2)));

        let untyped = sub(Some(93405), None, Some(2));
        assert!(untyped.matches(93405, MediaType::Tv, Some(2)));
    }

    #[test]
    fn failed_result_maps_action() {
        let r = ReconciliationResult::failed(ErrorKind::NoMatch, "nothing");
        assert_eq!(r.action, ReconcileAction::NotFound);
        let r = ReconciliationResult::failed(ErrorKind::UpstreamAuth, "denied");
        assert_eq!(r.action, ReconcileAction::Error);
        assert_eq!(r.error_kind, Some(ErrorKind::UpstreamAuth));
    }

    #[test]
    fn created_message_names_the_season() {
        let r = ReconciliationResult::created(sub(Some(93405), Some(MediaType::Tv), Some(2)));
        assert_eq!(r.message, "subscribed to Squid Game S02");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["action"], "created");
        assert_eq!(json["subscription"]["type"], "tv");
        assert!(json.get("error_kind").is_none());
    }
}
