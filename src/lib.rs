// Library crate for the Jass statistics service
// This file exposes the public API for integration tests

pub mod api;
pub mod auth;
pub mod event;
pub mod group;
pub mod records;
pub mod shared;
pub mod stats;

// Re-export commonly used types for easier access in tests
pub use event::{EventBus, EventDispatcher, RecordEvent, RecordEventHandler};
pub use group::{GroupAggregator, GroupMetric, GroupStatisticsRecord};
pub use records::{InMemoryRecordStore, RecordStore};
pub use shared::{AppError, AppState};
pub use stats::{
    EventApplier, InMemoryStatsRepository, PlayerStatisticsRecord, RecalculationEngine,
    SideResolver, StatsRecordSubscriber, StatsRepository, StatsUpdater,
};
