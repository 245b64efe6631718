use strum_macros::Display;
use tracing::warn;

use crate::records::{
    CompletedGameRecord, CompletedSessionRecord, PerSide, SessionWinner, Side, StricheCounts,
    TeamLabel, TeamSideMapping,
};

/// Table-position interpretation for positional rosters.
///
/// Threaded explicitly into every resolution call; never read from ambient
/// state. The defaults reflect the historical convention: seats 0 and 2 face
/// the top of the score sheet, seats 1 and 3 the bottom, and sessions without
/// an explicit mapping wrote team A on top.
#[derive(Debug, Clone)]
pub struct TeamPositionConfig {
    pub top_seats: [usize; 2],
    pub bottom_seats: [usize; 2],
    pub default_mapping: TeamSideMapping,
}

impl Default for TeamPositionConfig {
    fn default() -> Self {
        Self {
            top_seats: [0, 2],
            bottom_seats: [1, 3],
            default_mapping: TeamSideMapping::default(),
        }
    }
}

/// One step of the side-resolution fallback chain. Each strategy yields a
/// definite side or is inconclusive; the resolver walks them in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SideStrategy {
    /// Explicit per-side roster membership on the game record.
    RosterMembership,
    /// Session team-label membership translated through the side mapping.
    TeamLabelMapping,
    /// Positional fallback over the participant list.
    SeatPosition,
}

/// Resolves which side of the score sheet a player occupied in an event.
#[derive(Debug, Clone)]
pub struct SideResolver {
    config: TeamPositionConfig,
    strategies: Vec<SideStrategy>,
}

impl Default for SideResolver {
    fn default() -> Self {
        Self::new(TeamPositionConfig::default())
    }
}

impl SideResolver {
    pub fn new(config: TeamPositionConfig) -> Self {
        Self {
            config,
            strategies: vec![
                SideStrategy::RosterMembership,
                SideStrategy::TeamLabelMapping,
                SideStrategy::SeatPosition,
            ],
        }
    }

    /// Overrides the fallback order. Mainly for tests of the policy itself.
    pub fn with_strategies(config: TeamPositionConfig, strategies: Vec<SideStrategy>) -> Self {
        Self { config, strategies }
    }

    pub fn config(&self) -> &TeamPositionConfig {
        &self.config
    }

    /// The side a player occupied in a single game, with the strategy that
    /// decided it. `None` means membership is unresolvable and the caller
    /// must skip the player for this event.
    pub fn resolve_game_side(
        &self,
        player_id: &str,
        game: &CompletedGameRecord,
        session: Option<&CompletedSessionRecord>,
    ) -> Option<(Side, SideStrategy)> {
        for strategy in &self.strategies {
            let side = match strategy {
                SideStrategy::RosterMembership => {
                    roster_side(player_id, game.side_rosters.as_ref())
                }
                SideStrategy::TeamLabelMapping => {
                    session.and_then(|s| self.label_mapped_side(player_id, s))
                }
                SideStrategy::SeatPosition => self.seat_side(player_id, &game.participant_ids),
            };
            if let Some(side) = side {
                return Some((side, *strategy));
            }
        }
        None
    }

    /// The side a player's team wrote on for a whole session.
    pub fn resolve_session_side(
        &self,
        player_id: &str,
        session: &CompletedSessionRecord,
    ) -> Option<(Side, SideStrategy)> {
        for strategy in &self.strategies {
            let side = match strategy {
                // Sessions carry no per-side rosters of their own.
                SideStrategy::RosterMembership => None,
                SideStrategy::TeamLabelMapping => self.label_mapped_side(player_id, session),
                SideStrategy::SeatPosition => self.seat_side(player_id, &session.participant_ids),
            };
            if let Some(side) = side {
                return Some((side, *strategy));
            }
        }
        None
    }

    /// The team label owning a given side in a session.
    pub fn label_for_side(&self, session: &CompletedSessionRecord, side: Side) -> TeamLabel {
        let mapping = self.effective_mapping(session);
        if mapping.side_of(TeamLabel::TeamA) == side {
            TeamLabel::TeamA
        } else {
            TeamLabel::TeamB
        }
    }

    pub fn effective_mapping(&self, session: &CompletedSessionRecord) -> TeamSideMapping {
        session.team_side_mapping.unwrap_or_else(|| {
            warn!(
                session_id = %session.session_id,
                "Session has no team-side mapping, falling back to default"
            );
            self.config.default_mapping
        })
    }

    fn label_mapped_side(
        &self,
        player_id: &str,
        session: &CompletedSessionRecord,
    ) -> Option<Side> {
        let label = session.teams.label_of(player_id)?;
        Some(self.effective_mapping(session).side_of(label))
    }

    fn seat_side(&self, player_id: &str, participants: &[String]) -> Option<Side> {
        let seat = participants.iter().position(|id| id == player_id)?;
        if self.config.top_seats.contains(&seat) {
            Some(Side::Top)
        } else if self.config.bottom_seats.contains(&seat) {
            Some(Side::Bottom)
        } else {
            None
        }
    }
}

fn roster_side(player_id: &str, rosters: Option<&PerSide<Vec<String>>>) -> Option<Side> {
    let rosters = rosters?;
    if rosters.top.iter().any(|id| id == player_id) {
        Some(Side::Top)
    } else if rosters.bottom.iter().any(|id| id == player_id) {
        Some(Side::Bottom)
    } else {
        None
    }
}

/// Win/loss/draw from one player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Win,
    Loss,
    Draw,
    /// Membership could not be resolved. Zero-valued; callers skip it.
    Unknown,
}

/// Fully resolved outcome of one event for one player.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub result: OutcomeKind,
    pub side: Option<Side>,
    pub strategy: Option<SideStrategy>,
    /// Session team label, where the event has that coordinate system.
    pub team_label: Option<TeamLabel>,
    pub points_made: i64,
    pub points_received: i64,
    pub striche_made: StricheCounts,
    pub striche_received: StricheCounts,
    pub weis_made: i64,
    pub weis_received: i64,
}

impl Outcome {
    pub fn unknown() -> Self {
        Self {
            result: OutcomeKind::Unknown,
            side: None,
            strategy: None,
            team_label: None,
            points_made: 0,
            points_received: 0,
            striche_made: StricheCounts::default(),
            striche_received: StricheCounts::default(),
            weis_made: 0,
            weis_received: 0,
        }
    }

    /// Whether this outcome may contribute to any counter.
    pub fn is_counted(&self) -> bool {
        self.side.is_some() && self.result != OutcomeKind::Unknown
    }

    pub fn matsch_made(&self) -> bool {
        self.striche_made.matsch > 0
    }

    pub fn matsch_received(&self) -> bool {
        self.striche_received.matsch > 0
    }

    pub fn schneider_made(&self) -> bool {
        self.striche_made.schneider > 0
    }

    pub fn schneider_received(&self) -> bool {
        self.striche_received.schneider > 0
    }

    pub fn kontermatsch_made(&self) -> bool {
        self.striche_made.kontermatsch > 0
    }

    pub fn kontermatsch_received(&self) -> bool {
        self.striche_received.kontermatsch > 0
    }
}

fn result_from_scores(points_made: i64, points_received: i64) -> OutcomeKind {
    match points_made.cmp(&points_received) {
        std::cmp::Ordering::Greater => OutcomeKind::Win,
        std::cmp::Ordering::Less => OutcomeKind::Loss,
        std::cmp::Ordering::Equal => OutcomeKind::Draw,
    }
}

/// Resolves one game from a player's perspective. Pure: identical inputs
/// always yield identical outputs, which both the incremental and the
/// full-replay path rely on.
pub fn resolve_game_outcome(
    resolver: &SideResolver,
    player_id: &str,
    game: &CompletedGameRecord,
    session: Option<&CompletedSessionRecord>,
) -> Outcome {
    let Some((side, strategy)) = resolver.resolve_game_side(player_id, game, session) else {
        return Outcome::unknown();
    };
    let opponent = side.opponent();

    let points_made = *game.final_scores.side(side);
    let points_received = *game.final_scores.side(opponent);

    // Declared winner first; score comparison as fallback; ties are draws.
    let result = match game.winner_side {
        Some(winner) if winner == side => OutcomeKind::Win,
        Some(_) => OutcomeKind::Loss,
        None => result_from_scores(points_made, points_received),
    };

    Outcome {
        result,
        side: Some(side),
        strategy: Some(strategy),
        team_label: session.map(|s| resolver.label_for_side(s, side)),
        points_made,
        points_received,
        striche_made: *game.final_striche.side(side),
        striche_received: *game.final_striche.side(opponent),
        weis_made: *game.weis_points.side(side),
        weis_received: *game.weis_points.side(opponent),
    }
}

/// Resolves a whole session from a player's perspective, using the session's
/// aggregated per-side totals.
pub fn resolve_session_outcome(
    resolver: &SideResolver,
    player_id: &str,
    session: &CompletedSessionRecord,
) -> Outcome {
    let Some((side, strategy)) = resolver.resolve_session_side(player_id, session) else {
        return Outcome::unknown();
    };
    let opponent = side.opponent();
    let label = resolver.label_for_side(session, side);

    let points_made = *session.final_scores.side(side);
    let points_received = *session.final_scores.side(opponent);

    let result = match session.winner {
        Some(SessionWinner::Draw) => OutcomeKind::Draw,
        Some(SessionWinner::TeamA) => {
            if label == TeamLabel::TeamA {
                OutcomeKind::Win
            } else {
                OutcomeKind::Loss
            }
        }
        Some(SessionWinner::TeamB) => {
            if label == TeamLabel::TeamB {
                OutcomeKind::Win
            } else {
                OutcomeKind::Loss
            }
        }
        None => result_from_scores(points_made, points_received),
    };

    Outcome {
        result,
        side: Some(side),
        strategy: Some(strategy),
        team_label: Some(label),
        points_made,
        points_received,
        striche_made: *session.final_striche.side(side),
        striche_received: *session.final_striche.side(opponent),
        weis_made: *session.weis_points.side(side),
        weis_received: *session.weis_points.side(opponent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::test_fixtures::{game_record, session_record};
    use rstest::rstest;

    #[rstest]
    #[case("p1", Side::Top)]
    #[case("p2", Side::Bottom)]
    #[case("p3", Side::Top)]
    #[case("p4", Side::Bottom)]
    fn seat_position_fallback_assigns_alternating_sides(
        #[case] player: &str,
        #[case] expected: Side,
    ) {
        let resolver = SideResolver::default();
        let game = game_record("s1", 1, 2500, 1200);

        let (side, strategy) = resolver.resolve_game_side(player, &game, None).unwrap();
        assert_eq!(side, expected);
        assert_eq!(strategy, SideStrategy::SeatPosition);
    }

    #[test]
    fn explicit_roster_beats_seat_position() {
        let resolver = SideResolver::default();
        let mut game = game_record("s1", 1, 2500, 1200);
        // p1 sits at seat 0 but the roster puts them on the bottom side.
        game.side_rosters = Some(PerSide {
            top: vec!["p2".to_string(), "p4".to_string()],
            bottom: vec!["p1".to_string(), "p3".to_string()],
        });

        let (side, strategy) = resolver.resolve_game_side("p1", &game, None).unwrap();
        assert_eq!(side, Side::Bottom);
        assert_eq!(strategy, SideStrategy::RosterMembership);
    }

    #[test]
    fn session_label_mapping_beats_seat_position_for_games() {
        let resolver = SideResolver::default();
        let mut game = game_record("s1", 1, 2500, 1200);
        game.side_rosters = None;
        game.participant_ids = vec![]; // force the positional strategy to be inconclusive

        let mut session = session_record("s1", &["p1", "p2", "p3", "p4"]);
        session.team_side_mapping = Some(TeamSideMapping {
            team_a: Side::Bottom,
            team_b: Side::Top,
        });

        // p1 is on team A, which maps to the bottom side here.
        let (side, strategy) = resolver
            .resolve_game_side("p1", &game, Some(&session))
            .unwrap();
        assert_eq!(side, Side::Bottom);
        assert_eq!(strategy, SideStrategy::TeamLabelMapping);
    }

    #[test]
    fn unresolvable_membership_yields_flagged_unknown() {
        let resolver = SideResolver::default();
        let mut game = game_record("s1", 1, 2500, 1200);
        game.participant_ids = vec!["p1".to_string()]; // stranger not present anywhere

        let outcome = resolve_game_outcome(&resolver, "stranger", &game, None);
        assert_eq!(outcome.result, OutcomeKind::Unknown);
        assert!(!outcome.is_counted());
        assert_eq!(outcome.points_made, 0);
        assert_eq!(outcome.striche_made.total(), 0);
    }

    #[test]
    fn declared_winner_takes_precedence_over_scores() {
        let resolver = SideResolver::default();
        let mut game = game_record("s1", 1, 1000, 2000);
        // Contradictory record: bottom outscored top, but top is declared.
        game.winner_side = Some(Side::Top);

        let outcome = resolve_game_outcome(&resolver, "p1", &game, None);
        assert_eq!(outcome.result, OutcomeKind::Win);
    }

    #[test]
    fn score_tie_without_declared_winner_is_a_draw() {
        let resolver = SideResolver::default();
        let game = game_record("s1", 1, 1570, 1570);
        assert!(game.winner_side.is_none());

        let outcome = resolve_game_outcome(&resolver, "p1", &game, None);
        assert_eq!(outcome.result, OutcomeKind::Draw);
        assert!(outcome.is_counted());
    }

    #[test]
    fn resolution_is_referentially_transparent() {
        let resolver = SideResolver::default();
        let mut game = game_record("s1", 3, 2100, 900);
        game.final_striche.top.sieg = 1;
        game.weis_points.top = 80;
        let session = session_record("s1", &["p1", "p2", "p3", "p4"]);

        let first = resolve_game_outcome(&resolver, "p3", &game, Some(&session));
        let second = resolve_game_outcome(&resolver, "p3", &game, Some(&session));
        assert_eq!(first, second);
    }

    #[test]
    fn session_outcome_uses_declared_winner_labels() {
        let resolver = SideResolver::default();
        let mut session = session_record("s1", &["p1", "p2", "p3", "p4"]);
        session.final_scores = PerSide {
            top: 6200,
            bottom: 7100,
        };
        session.winner = Some(SessionWinner::TeamA);

        // p1 is team A (top side): declared winner wins despite lower score.
        let outcome = resolve_session_outcome(&resolver, "p1", &session);
        assert_eq!(outcome.result, OutcomeKind::Win);
        assert_eq!(outcome.team_label, Some(TeamLabel::TeamA));
        assert_eq!(outcome.points_made, 6200);

        let opponent = resolve_session_outcome(&resolver, "p2", &session);
        assert_eq!(opponent.result, OutcomeKind::Loss);
    }

    #[test]
    fn missing_mapping_falls_back_to_default_with_team_a_on_top() {
        let resolver = SideResolver::default();
        let mut session = session_record("s1", &["p1", "p2", "p3", "p4"]);
        session.team_side_mapping = None;
        session.final_scores = PerSide {
            top: 5000,
            bottom: 4000,
        };

        let outcome = resolve_session_outcome(&resolver, "p1", &session);
        assert_eq!(outcome.side, Some(Side::Top));
        assert_eq!(outcome.result, OutcomeKind::Win);
    }
}
