//! Snapshot-pair analysis.
//!
//! The matcher pairs vehicle records of two captures; dwell, failure and
//! departure analyses build on it, and route ranking works on a single
//! capture. [`pipeline::Pipeline`] runs them all for one pair.

pub mod departures;
pub mod dwell;
pub mod failures;
pub mod matcher;
pub mod pipeline;
pub mod routes;
pub mod types;
