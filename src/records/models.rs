use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the two scoring positions on the score sheet for a single game.
///
/// Sides are a per-game coordinate system and are independent of the
/// session's named team labels: a session's "team A" may write on either
/// side of the sheet, and in tournaments teams move between sides per game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
        }
    }
}

/// Session-level team naming, independent of sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TeamLabel {
    TeamA,
    TeamB,
}

impl TeamLabel {
    pub fn opponent(self) -> TeamLabel {
        match self {
            TeamLabel::TeamA => TeamLabel::TeamB,
            TeamLabel::TeamB => TeamLabel::TeamA,
        }
    }
}

/// Declared winner of a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionWinner {
    TeamA,
    TeamB,
    Draw,
}

/// Per-team stroke ("Strich") counts, by category.
///
/// `kontermatsch` was introduced after the first schema generation, so every
/// field defaults to zero when absent in historical documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StricheCounts {
    #[serde(default)]
    pub berg: u32,
    #[serde(default)]
    pub sieg: u32,
    #[serde(default)]
    pub matsch: u32,
    #[serde(default)]
    pub schneider: u32,
    #[serde(default)]
    pub kontermatsch: u32,
}

impl StricheCounts {
    pub fn total(&self) -> u32 {
        self.berg + self.sieg + self.matsch + self.schneider + self.kontermatsch
    }
}

/// A value recorded once per side of the score sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSide<T> {
    pub top: T,
    pub bottom: T,
}

impl<T> PerSide<T> {
    pub fn side(&self, side: Side) -> &T {
        match side {
            Side::Top => &self.top,
            Side::Bottom => &self.bottom,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Top => &mut self.top,
            Side::Bottom => &mut self.bottom,
        }
    }
}

/// Identity plus display name as captured on the session roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPlayer {
    pub player_id: String,
    pub display_name: String,
}

/// Named two-sided team rosters of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTeams {
    #[serde(default)]
    pub team_a: Vec<RosterPlayer>,
    #[serde(default)]
    pub team_b: Vec<RosterPlayer>,
}

impl SessionTeams {
    /// Label of the team whose roster contains the player, if any.
    pub fn label_of(&self, player_id: &str) -> Option<TeamLabel> {
        if self.team_a.iter().any(|p| p.player_id == player_id) {
            Some(TeamLabel::TeamA)
        } else if self.team_b.iter().any(|p| p.player_id == player_id) {
            Some(TeamLabel::TeamB)
        } else {
            None
        }
    }

    pub fn roster(&self, label: TeamLabel) -> &[RosterPlayer] {
        match label {
            TeamLabel::TeamA => &self.team_a,
            TeamLabel::TeamB => &self.team_b,
        }
    }
}

/// Which score-sheet side each named team wrote on.
///
/// Absent on legacy sessions; consumers fall back to a documented default
/// (team A on top) with a logged warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSideMapping {
    pub team_a: Side,
    pub team_b: Side,
}

impl TeamSideMapping {
    pub fn side_of(&self, label: TeamLabel) -> Side {
        match label {
            TeamLabel::TeamA => self.team_a,
            TeamLabel::TeamB => self.team_b,
        }
    }
}

impl Default for TeamSideMapping {
    fn default() -> Self {
        Self {
            team_a: Side::Top,
            team_b: Side::Bottom,
        }
    }
}

/// One finished game (hand/round-set) inside a session.
///
/// Immutable once created; all aggregation is append-only consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedGameRecord {
    pub session_id: String,
    pub game_number: u32,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_millis: Option<i64>,
    pub final_scores: PerSide<i64>,
    #[serde(default)]
    pub final_striche: PerSide<StricheCounts>,
    #[serde(default)]
    pub weis_points: PerSide<i64>,
    /// Seat order. When no explicit roster is present, seats 0 and 2 are
    /// assumed to play one side and seats 1 and 3 the other.
    pub participant_ids: Vec<String>,
    #[serde(default)]
    pub side_rosters: Option<PerSide<Vec<String>>>,
    #[serde(default)]
    pub winner_side: Option<Side>,
    #[serde(default)]
    pub group_id: Option<String>,
}

/// Aggregate record of one completed session ("Partie").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSessionRecord {
    pub session_id: String,
    #[serde(default)]
    pub group_id: Option<String>,
    pub participant_ids: Vec<String>,
    #[serde(default)]
    pub teams: SessionTeams,
    #[serde(default)]
    pub team_side_mapping: Option<TeamSideMapping>,
    pub final_scores: PerSide<i64>,
    #[serde(default)]
    pub final_striche: PerSide<StricheCounts>,
    #[serde(default)]
    pub weis_points: PerSide<i64>,
    #[serde(default)]
    pub winner: Option<SessionWinner>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub games_played: u32,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
}

impl CompletedSessionRecord {
    /// Canonical event timestamp: end of play when known, start otherwise.
    pub fn canonical_timestamp(&self) -> DateTime<Utc> {
        self.ended_at.unwrap_or(self.started_at)
    }
}

/// One completed game ("Passe") inside a tournament. Teams are re-drawn per
/// game, so only game-level rosters are meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentGameRecord {
    pub tournament_id: String,
    pub game_number: u32,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_millis: Option<i64>,
    pub final_scores: PerSide<i64>,
    #[serde(default)]
    pub final_striche: PerSide<StricheCounts>,
    #[serde(default)]
    pub weis_points: PerSide<i64>,
    pub participant_ids: Vec<String>,
    #[serde(default)]
    pub side_rosters: Option<PerSide<Vec<String>>>,
    #[serde(default)]
    pub winner_side: Option<Side>,
}

impl TournamentGameRecord {
    /// Views a tournament game through the regular game-record shape so the
    /// same resolution and aggregation code handles both. The tournament id
    /// stands in for the owning session id.
    pub fn to_game_record(&self) -> CompletedGameRecord {
        CompletedGameRecord {
            session_id: self.tournament_id.clone(),
            game_number: self.game_number,
            completed_at: self.completed_at,
            duration_millis: self.duration_millis,
            final_scores: self.final_scores,
            final_striche: self.final_striche,
            weis_points: self.weis_points,
            participant_ids: self.participant_ids.clone(),
            side_rosters: self.side_rosters.clone(),
            winner_side: self.winner_side,
            group_id: None,
        }
    }
}

/// Final ranking of one player at tournament end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRanking {
    pub player_id: String,
    pub rank: u32,
    pub total_ranked: u32,
    #[serde(default)]
    pub team_name: Option<String>,
}

/// Record emitted when a tournament is finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentResult {
    pub tournament_id: String,
    #[serde(default)]
    pub tournament_name: String,
    pub finalized_at: DateTime<Utc>,
    pub rankings: Vec<PlayerRanking>,
}

impl TournamentResult {
    pub fn ranking_of(&self, player_id: &str) -> Option<&PlayerRanking> {
        self.rankings.iter().find(|r| r.player_id == player_id)
    }
}
