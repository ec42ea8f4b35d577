pub mod error;
pub mod models;
pub mod types;

pub use models::{
    MediaCandidate, MediaQuery, MediaStatistic, ReconciliationResult, StatsSummary, Subscription,
};
pub use types::{ErrorKind, MediaType, ReconcileAction, SubscriptionStatus};
