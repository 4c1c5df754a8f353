//! Seams to the outside world: route/stop enrichment and metric publishing.

pub mod enrichment;
pub mod publish;
