use serde::{Deserialize, Serialize};

/// Facts emitted when a record lands in the store or statistics change.
///
/// Events carry record keys, not record bodies: handlers reload the record
/// from the store, so a replayed or duplicated event is harmless.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecordEvent {
    /// A game finished and its record was stored.
    GameCompleted {
        session_id: String,
        game_number: u32,
    },

    /// A session was finalized and its aggregate record was stored.
    SessionFinalized { session_id: String },

    /// A tournament game finished and its record was stored.
    TournamentGameCompleted {
        tournament_id: String,
        game_number: u32,
    },

    /// A tournament was finalized with its rankings.
    TournamentFinalized { tournament_id: String },

    /// Player statistics documents were rewritten.
    StatsUpdated { player_ids: Vec<String> },
}

impl RecordEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            RecordEvent::GameCompleted { .. } => "game_completed",
            RecordEvent::SessionFinalized { .. } => "session_finalized",
            RecordEvent::TournamentGameCompleted { .. } => "tournament_game_completed",
            RecordEvent::TournamentFinalized { .. } => "tournament_finalized",
            RecordEvent::StatsUpdated { .. } => "stats_updated",
        }
    }
}
