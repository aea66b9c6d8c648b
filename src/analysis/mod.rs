//! Analysis modules.
//!
//! Aggregation of the dataset per cursor year and the visual scales
//! applied to the aggregated places.

pub mod aggregator;
pub mod scale;

pub use aggregator::*;
pub use scale::Scale;
