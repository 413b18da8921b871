//! Application services layer: reconciliation engine and jobs.

pub mod error;
pub mod jobs;
pub mod outcome;
pub mod rank;
pub mod repos;
pub mod toggles;
pub mod views;
