pub mod moviepilot;
pub mod service;

use checkmp_core::ErrorKind;
use thiserror::Error;

pub use moviepilot::{ClientConfig, MoviePilotClient};
pub use service::{MediaService, PopularFilter};

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("upstream rejected credentials: {0}")]
    Auth(String),
    #[error("upstream reports a duplicate: {0}")]
    Conflict(String),
    #[error("upstream rejected the request: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unexpected upstream response: {0}")]
    Unexpected(String),
}

impl UpstreamError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) => ErrorKind::UpstreamUnavailable,
            Self::Auth(_) => ErrorKind::UpstreamAuth,
            Self::Conflict(_) => ErrorKind::UpstreamConflict,
            Self::Validation(_) => ErrorKind::UpstreamValidation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unexpected(_) => ErrorKind::UpstreamError,
        }
    }
}
