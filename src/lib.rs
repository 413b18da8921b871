//! Palaver: write-behind aggregation engine for a forum platform.
//!
//! API-layer writes (view counts, like/rate toggles) land in an in-memory
//! staging store and are reconciled into Postgres in periodic batches,
//! deriving notifications and a bounded top-K "hot content" ranking as a
//! side effect of reconciliation.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
