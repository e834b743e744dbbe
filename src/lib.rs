//! Service crate for the admissions application workflow: mutable drafts,
//! completion scoring, and the atomic draft → submission commit that consumes
//! a single-use payment reference.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
