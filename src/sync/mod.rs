//! Due-date sync: bucket classification and list reconciliation.
//!
//! Core components:
//! - `bucket`: Bucket enum and the due-date classifier
//! - `mapping`: Bucket → list configuration and its board check
//! - `reconciler`: Sequential, rate-limited reconciliation pass
//! - `ticker`: Periodic trigger (interval or cron)
//! - `routes`: On-demand trigger and health endpoints

pub mod bucket;
pub mod mapping;
pub mod reconciler;
pub mod routes;
pub mod ticker;

pub use bucket::{Bucket, WeekWindow, classify};
pub use mapping::{ListMapping, MappingIssue};
pub use reconciler::{ReconciliationResult, Reconciler};
pub use routes::sync_routes;
pub use ticker::{Schedule, spawn_reconcile_ticker};
