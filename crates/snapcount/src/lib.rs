// Library root: re-exports all modules so integration tests and the
// `snapcount` binary share the same public API.

pub mod classify;
pub mod config;
pub mod error;
pub mod features;
pub mod ingest;
pub mod pipeline;
pub mod reconcile;
pub mod record;
pub mod season;
