pub mod apply;
pub mod highlights;
pub mod models;
pub mod outcome;
pub mod partners;
pub mod recalculation;
pub mod repository;
pub mod streaks;
pub mod updater;

mod errors;

pub use apply::{Applied, EventApplier};
pub use errors::StatsError;
pub use models::*;
pub use outcome::{Outcome, OutcomeKind, SideResolver, SideStrategy, TeamPositionConfig};
pub use recalculation::{RecalculationEngine, RecalculationSummary};
pub use repository::{InMemoryStatsRepository, PlayerUpdate, StatsRepository};
pub use updater::{ParticipantUpdate, StatsRecordSubscriber, StatsUpdater};
