pub mod aggregator;
pub mod models;

pub use aggregator::GroupAggregator;
pub use models::{GroupMetric, GroupStatisticsRecord, RankedEntry};
