pub mod catalog;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod routes;
pub mod state;
