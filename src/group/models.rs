use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter};

/// Leaderboard categories computed per group.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum GroupMetric {
    MostSessions,
    MostGames,
    GameWinRate,
    SessionWinRate,
    BestPointsDifference,
    BestStricheDifference,
    MostMatschMade,
    MostWeisPoints,
}

impl GroupMetric {
    /// Rate metrics need a minimum number of observations before a member
    /// appears on the board.
    pub fn is_rate(self) -> bool {
        matches!(self, GroupMetric::GameWinRate | GroupMetric::SessionWinRate)
    }
}

/// One row of a group leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub rank: u32,
    pub player_id: String,
    pub display_name: String,
    /// Metric value; counts and differences are whole numbers, rates are
    /// fractions in [0, 1].
    pub value: f64,
    /// Number of events the value is based on.
    pub events: u32,
}

/// Group-wide leaderboards, recomputed wholesale from the group's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatisticsRecord {
    pub group_id: String,
    /// Timestamp of the latest event that went into this computation.
    pub computed_through: Option<DateTime<Utc>>,
    pub member_count: u32,
    pub sessions_considered: u32,
    pub games_considered: u32,
    pub rankings: BTreeMap<GroupMetric, Vec<RankedEntry>>,
}

impl GroupStatisticsRecord {
    pub fn empty(group_id: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            computed_through: None,
            member_count: 0,
            sessions_considered: 0,
            games_considered: 0,
            rankings: BTreeMap::new(),
        }
    }
}
