//! Concrete clients for the enrichment and publishing seams.

pub mod infotbm;
pub mod s3;
