use serde::{Deserialize, Serialize};

/// Media kind as exposed by this service.
///
/// Inbound payloads may also use the upstream's native labels (`电影`, `电视剧`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[serde(alias = "电影")]
    Movie,
    #[default]
    #[serde(alias = "电视剧")]
    Tv,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }

    /// Label the upstream service uses for this kind.
    pub fn upstream_label(self) -> &'static str {
        match self {
            Self::Movie => "电影",
            Self::Tv => "电视剧",
        }
    }

    /// Parse either a local (`movie`/`tv`) or upstream (`电影`/`电视剧`) label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "电影" => Some(Self::Movie),
            "电视剧" => Some(Self::Tv),
            other => match other.to_ascii_lowercase().as_str() {
                "movie" => Some(Self::Movie),
                "tv" => Some(Self::Tv),
                _ => None,
            },
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription state as reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Unknown,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Unknown => "unknown",
        }
    }

    /// Map the upstream state letter (`N` new, `P` pending, `R` running).
    pub fn from_upstream(state: &str) -> Self {
        match state.trim() {
            "N" | "P" => Self::Pending,
            "R" => Self::Active,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a subscribe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    Created,
    AlreadyExists,
    NotFound,
    Error,
}

impl ReconcileAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyExists => "already_exists",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure kind carried from the upstream client to the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidQuery,
    NoMatch,
    NotFound,
    UpstreamUnavailable,
    UpstreamAuth,
    UpstreamConflict,
    UpstreamValidation,
    UpstreamError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidQuery => "invalid_query",
            Self::NoMatch => "no_match",
            Self::NotFound => "not_found",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::UpstreamAuth => "upstream_auth",
            Self::UpstreamConflict => "upstream_conflict",
            Self::UpstreamValidation => "upstream_validation",
            Self::UpstreamError => "upstream_error",
        }
    }

    /// HTTP status the inbound layer answers with for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            Self::InvalidQuery => 400,
            Self::NoMatch | Self::NotFound => 404,
            Self::UpstreamConflict => 409,
            Self::UpstreamValidation => 422,
            Self::UpstreamAuth => 502,
            Self::UpstreamUnavailable => 503,
            Self::UpstreamError => 500,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
