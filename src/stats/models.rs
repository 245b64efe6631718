use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter};

/// Whether a metric records its extreme as a maximum or a minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricDirection {
    Highest,
    Lowest,
}

/// Every tracked superlative metric, at game and session granularity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HighlightMetric {
    HighestPointsGame,
    LowestPointsGame,
    MostStricheGame,
    MostStricheReceivedGame,
    MostWeisPointsGame,
    MostMatschGame,
    MostMatschReceivedGame,
    MostSchneiderGame,
    MostSchneiderReceivedGame,
    MostKontermatschGame,
    MostKontermatschReceivedGame,
    HighestPointsSession,
    LowestPointsSession,
    MostStricheSession,
    MostStricheReceivedSession,
    MostWeisPointsSession,
    MostWeisPointsReceivedSession,
    MostMatschSession,
    MostMatschReceivedSession,
    MostSchneiderSession,
    MostSchneiderReceivedSession,
    MostKontermatschSession,
    MostKontermatschReceivedSession,
}

impl HighlightMetric {
    pub fn direction(self) -> MetricDirection {
        match self {
            HighlightMetric::LowestPointsGame | HighlightMetric::LowestPointsSession => {
                MetricDirection::Lowest
            }
            _ => MetricDirection::Highest,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HighlightMetric::HighestPointsGame => "Highest points in a game",
            HighlightMetric::LowestPointsGame => "Lowest points in a game",
            HighlightMetric::MostStricheGame => "Most striche in a game",
            HighlightMetric::MostStricheReceivedGame => "Most striche received in a game",
            HighlightMetric::MostWeisPointsGame => "Most Weis points in a game",
            HighlightMetric::MostMatschGame => "Most matsch in a game",
            HighlightMetric::MostMatschReceivedGame => "Most matsch received in a game",
            HighlightMetric::MostSchneiderGame => "Most schneider in a game",
            HighlightMetric::MostSchneiderReceivedGame => "Most schneider received in a game",
            HighlightMetric::MostKontermatschGame => "Most kontermatsch in a game",
            HighlightMetric::MostKontermatschReceivedGame => {
                "Most kontermatsch received in a game"
            }
            HighlightMetric::HighestPointsSession => "Highest points in a session",
            HighlightMetric::LowestPointsSession => "Lowest points in a session",
            HighlightMetric::MostStricheSession => "Most striche in a session",
            HighlightMetric::MostStricheReceivedSession => "Most striche received in a session",
            HighlightMetric::MostWeisPointsSession => "Most Weis points in a session",
            HighlightMetric::MostWeisPointsReceivedSession => {
                "Most Weis points received in a session"
            }
            HighlightMetric::MostMatschSession => "Most matsch in a session",
            HighlightMetric::MostMatschReceivedSession => "Most matsch received in a session",
            HighlightMetric::MostSchneiderSession => "Most schneider in a session",
            HighlightMetric::MostSchneiderReceivedSession => {
                "Most schneider received in a session"
            }
            HighlightMetric::MostKontermatschSession => "Most kontermatsch in a session",
            HighlightMetric::MostKontermatschReceivedSession => {
                "Most kontermatsch received in a session"
            }
        }
    }
}

/// One superlative record: the extreme value seen so far for a metric,
/// with the date and the originating record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub metric: HighlightMetric,
    pub value: i64,
    pub date: DateTime<Utc>,
    pub related_id: String,
    pub label: String,
}

/// Current and longest run of one streak kind.
///
/// `current_start` is carried so that when the current run overtakes the
/// longest one, the longest run's start date stays anchored at the event
/// that began the run rather than the event that extended it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub current: u32,
    pub longest: u32,
    pub current_start: Option<DateTime<Utc>>,
    pub longest_start: Option<DateTime<Utc>>,
    pub longest_end: Option<DateTime<Utc>>,
}

/// The four streak kinds tracked per granularity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSet {
    pub win: Streak,
    pub loss: Streak,
    pub winless: Streak,
    pub undefeated: Streak,
}

/// Win rate as a fraction, with a pre-rendered display text ("4/6 = 66.7%").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinRateInfo {
    pub wins: u32,
    pub total: u32,
    pub rate: f64,
    pub display_text: String,
}

impl WinRateInfo {
    pub fn new(wins: u32, total: u32) -> Self {
        let rate = if total > 0 {
            f64::from(wins) / f64::from(total)
        } else {
            0.0
        };
        Self {
            wins,
            total,
            rate,
            display_text: format!("{}/{} = {:.1}%", wins, total, rate * 100.0),
        }
    }
}

/// Running totals for one co-player the profile player has played WITH.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerAggregate {
    pub partner_id: String,
    pub display_name: String,
    pub sessions_played_with: u32,
    pub sessions_won_with: u32,
    pub games_played_with: u32,
    pub games_won_with: u32,
    pub points_difference_with: i64,
    pub striche_difference_with: i64,
    pub matsch_made_with: u32,
    pub matsch_received_with: u32,
    pub schneider_made_with: u32,
    pub schneider_received_with: u32,
    pub kontermatsch_made_with: u32,
    pub kontermatsch_received_with: u32,
    pub last_played_with: Option<DateTime<Utc>>,
    pub game_win_rate: WinRateInfo,
    pub session_win_rate: WinRateInfo,
}

impl PartnerAggregate {
    pub fn new(partner_id: &str, display_name: &str) -> Self {
        Self {
            partner_id: partner_id.to_string(),
            display_name: display_name.to_string(),
            ..Self::default()
        }
    }
}

/// Running totals for one co-player the profile player has played AGAINST.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentAggregate {
    pub opponent_id: String,
    pub display_name: String,
    pub sessions_played_against: u32,
    pub sessions_won_against: u32,
    pub games_played_against: u32,
    pub games_won_against: u32,
    pub points_difference_against: i64,
    pub striche_difference_against: i64,
    pub matsch_made_against: u32,
    pub matsch_received_against: u32,
    pub schneider_made_against: u32,
    pub schneider_received_against: u32,
    pub kontermatsch_made_against: u32,
    pub kontermatsch_received_against: u32,
    pub last_played_against: Option<DateTime<Utc>>,
    pub game_win_rate: WinRateInfo,
    pub session_win_rate: WinRateInfo,
}

impl OpponentAggregate {
    pub fn new(opponent_id: &str, display_name: &str) -> Self {
        Self {
            opponent_id: opponent_id.to_string(),
            display_name: display_name.to_string(),
            ..Self::default()
        }
    }
}

/// One tournament placement in a player's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentPlacement {
    pub tournament_id: String,
    pub tournament_name: String,
    pub rank: u32,
    pub total_ranked: u32,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub team_name: Option<String>,
}

/// The single persisted aggregate per player.
///
/// Created lazily with zeroed defaults on a player's first event and never
/// deleted. Every derived field (differences, averages, win rates) is a pure
/// function of the running totals and is rebuilt by [`recompute_derived`].
///
/// [`recompute_derived`]: PlayerStatisticsRecord::recompute_derived
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatisticsRecord {
    pub player_id: String,
    pub first_played_at: Option<DateTime<Utc>>,
    pub last_played_at: Option<DateTime<Utc>>,
    /// Timestamp of the last applied event. Deliberately not wall clock, so
    /// two replays of the same history serialize identically.
    pub last_updated: Option<DateTime<Utc>>,

    pub total_sessions: u32,
    pub session_wins: u32,
    pub session_losses: u32,
    pub session_draws: u32,

    pub total_games: u32,
    pub game_wins: u32,
    pub game_losses: u32,
    pub game_draws: u32,

    pub total_points_made: i64,
    pub total_points_received: i64,
    pub total_points_difference: i64,

    pub total_striche_made: u32,
    pub total_striche_received: u32,
    pub total_striche_difference: i64,

    pub total_weis_made: i64,
    pub total_weis_received: i64,

    pub matsch_made: u32,
    pub matsch_received: u32,
    pub matsch_balance: i64,
    pub schneider_made: u32,
    pub schneider_received: u32,
    pub schneider_balance: i64,
    pub kontermatsch_made: u32,
    pub kontermatsch_received: u32,
    pub kontermatsch_balance: i64,

    pub total_play_time_seconds: i64,

    pub game_streaks: StreakSet,
    pub session_streaks: StreakSet,

    pub highlights: BTreeMap<HighlightMetric, Highlight>,

    pub avg_points_per_game: f64,
    pub avg_striche_per_game: f64,
    pub avg_weis_per_game: f64,
    pub game_win_rate: WinRateInfo,
    pub session_win_rate: WinRateInfo,

    pub tournaments_participated: u32,
    pub tournament_games_played: u32,
    pub tournament_wins: u32,
    pub best_tournament_placement: Option<TournamentPlacement>,
    pub tournament_placements: Vec<TournamentPlacement>,

    pub partners: BTreeMap<String, PartnerAggregate>,
    pub opponents: BTreeMap<String, OpponentAggregate>,
}

impl PlayerStatisticsRecord {
    pub fn new(player_id: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            ..Self::default()
        }
    }

    /// Rebuilds every derived field from the running totals. Draws are
    /// excluded from win-rate denominators.
    pub fn recompute_derived(&mut self) {
        self.total_points_difference = self.total_points_made - self.total_points_received;
        self.total_striche_difference =
            i64::from(self.total_striche_made) - i64::from(self.total_striche_received);
        self.matsch_balance = i64::from(self.matsch_made) - i64::from(self.matsch_received);
        self.schneider_balance =
            i64::from(self.schneider_made) - i64::from(self.schneider_received);
        self.kontermatsch_balance =
            i64::from(self.kontermatsch_made) - i64::from(self.kontermatsch_received);

        if self.total_games > 0 {
            let games = f64::from(self.total_games);
            self.avg_points_per_game = self.total_points_made as f64 / games;
            self.avg_striche_per_game = f64::from(self.total_striche_made) / games;
            self.avg_weis_per_game = self.total_weis_made as f64 / games;
        } else {
            self.avg_points_per_game = 0.0;
            self.avg_striche_per_game = 0.0;
            self.avg_weis_per_game = 0.0;
        }

        self.game_win_rate = WinRateInfo::new(self.game_wins, self.game_wins + self.game_losses);
        self.session_win_rate =
            WinRateInfo::new(self.session_wins, self.session_wins + self.session_losses);

        for partner in self.partners.values_mut() {
            partner.game_win_rate =
                WinRateInfo::new(partner.games_won_with, partner.games_played_with);
            partner.session_win_rate =
                WinRateInfo::new(partner.sessions_won_with, partner.sessions_played_with);
        }
        for opponent in self.opponents.values_mut() {
            opponent.game_win_rate =
                WinRateInfo::new(opponent.games_won_against, opponent.games_played_against);
            opponent.session_win_rate = WinRateInfo::new(
                opponent.sessions_won_against,
                opponent.sessions_played_against,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn win_rate_formats_as_fraction_and_percentage() {
        let info = WinRateInfo::new(4, 6);
        assert_eq!(info.display_text, "4/6 = 66.7%");
        assert!((info.rate - 4.0 / 6.0).abs() < f64::EPSILON);

        let empty = WinRateInfo::new(0, 0);
        assert_eq!(empty.display_text, "0/0 = 0.0%");
        assert_eq!(empty.rate, 0.0);
    }

    #[test]
    fn only_lowest_points_metrics_record_minima() {
        for metric in HighlightMetric::iter() {
            let expected = matches!(
                metric,
                HighlightMetric::LowestPointsGame | HighlightMetric::LowestPointsSession
            );
            assert_eq!(
                metric.direction() == MetricDirection::Lowest,
                expected,
                "unexpected direction for {metric}"
            );
        }
    }

    #[test]
    fn recompute_derived_is_a_pure_function_of_totals() {
        let mut stats = PlayerStatisticsRecord::new("p1");
        stats.total_points_made = 5000;
        stats.total_points_received = 3000;
        stats.total_striche_made = 7;
        stats.total_striche_received = 9;
        stats.total_games = 4;
        stats.game_wins = 3;
        stats.game_losses = 1;
        stats.matsch_made = 2;
        stats.matsch_received = 1;

        stats.recompute_derived();
        let first = stats.clone();
        stats.recompute_derived();

        assert_eq!(stats, first);
        assert_eq!(stats.total_points_difference, 2000);
        assert_eq!(stats.total_striche_difference, -2);
        assert_eq!(stats.matsch_balance, 1);
        assert_eq!(stats.avg_points_per_game, 1250.0);
        assert_eq!(stats.game_win_rate.display_text, "3/4 = 75.0%");
    }

    #[test]
    fn new_record_is_zero_initialized() {
        let stats = PlayerStatisticsRecord::new("p1");
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.game_streaks.win.current, 0);
        assert!(stats.highlights.is_empty());
        assert!(stats.partners.is_empty());
        assert!(stats.best_tournament_placement.is_none());
    }
}
