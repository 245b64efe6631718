use chrono::{DateTime, Utc};
use tracing::warn;

use crate::records::{
    CompletedGameRecord, CompletedSessionRecord, TournamentGameRecord, TournamentResult,
};

use super::highlights;
use super::models::{PlayerStatisticsRecord, TournamentPlacement};
use super::outcome::{
    resolve_game_outcome, resolve_session_outcome, Outcome, OutcomeKind, SideResolver,
};
use super::partners;
use super::streaks;

/// Whether an event contributed to the record or was skipped as uncountable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Counted,
    Skipped,
}

/// Applies completed records to one player's statistics record.
///
/// This is the single aggregation path: the incremental updater feeds it one
/// event at a time against the persisted record, the recalculation engine
/// replays a full sorted history against a fresh one. Keeping both on the
/// same code is what makes a replay reproduce incremental state.
///
/// Additive totals (points, striche, weis, event counts) accumulate from
/// game-level events only; session events contribute the session counters,
/// session streaks/highlights and pair session counts. Counting both levels
/// would double every quantity the session already aggregates.
pub struct EventApplier<'a> {
    resolver: &'a SideResolver,
}

impl<'a> EventApplier<'a> {
    pub fn new(resolver: &'a SideResolver) -> Self {
        Self { resolver }
    }

    pub fn apply_game(
        &self,
        stats: &mut PlayerStatisticsRecord,
        game: &CompletedGameRecord,
        session: Option<&CompletedSessionRecord>,
    ) -> Applied {
        let outcome = resolve_game_outcome(self.resolver, &stats.player_id, game, session);
        if !outcome.is_counted() {
            warn!(
                player_id = %stats.player_id,
                session_id = %game.session_id,
                game_number = game.game_number,
                "Unresolvable team membership, excluding player from game"
            );
            return Applied::Skipped;
        }

        let date = game.completed_at;
        let related_id = format!("{}#{}", game.session_id, game.game_number);

        stats.total_games += 1;
        match outcome.result {
            OutcomeKind::Win => stats.game_wins += 1,
            OutcomeKind::Loss => stats.game_losses += 1,
            OutcomeKind::Draw => stats.game_draws += 1,
            OutcomeKind::Unknown => {}
        }
        self.accumulate_quantities(stats, &outcome);

        streaks::apply_result(&mut stats.game_streaks, outcome.result, date);
        highlights::record_game(&mut stats.highlights, &outcome, date, &related_id);

        let sides = partners::reconstruct_game_sides(self.resolver, game, session);
        partners::apply_game(stats, &outcome, &sides, date);

        self.touch(stats, date);
        Applied::Counted
    }

    pub fn apply_session(
        &self,
        stats: &mut PlayerStatisticsRecord,
        session: &CompletedSessionRecord,
    ) -> Applied {
        let outcome = resolve_session_outcome(self.resolver, &stats.player_id, session);
        if !outcome.is_counted() {
            warn!(
                player_id = %stats.player_id,
                session_id = %session.session_id,
                "Unresolvable team membership, excluding player from session"
            );
            return Applied::Skipped;
        }

        let date = session.canonical_timestamp();

        stats.total_sessions += 1;
        match outcome.result {
            OutcomeKind::Win => stats.session_wins += 1,
            OutcomeKind::Loss => stats.session_losses += 1,
            OutcomeKind::Draw => stats.session_draws += 1,
            OutcomeKind::Unknown => {}
        }
        stats.total_play_time_seconds += session.duration_seconds.unwrap_or(0);

        streaks::apply_result(&mut stats.session_streaks, outcome.result, date);
        highlights::record_session(&mut stats.highlights, &outcome, date, &session.session_id);
        partners::apply_session(stats, &outcome, session, date);

        if stats.first_played_at.map_or(true, |t| session.started_at < t) {
            stats.first_played_at = Some(session.started_at);
        }
        self.touch(stats, date);
        Applied::Counted
    }

    pub fn apply_tournament_game(
        &self,
        stats: &mut PlayerStatisticsRecord,
        game: &TournamentGameRecord,
    ) -> Applied {
        let as_game = game.to_game_record();
        let applied = self.apply_game(stats, &as_game, None);
        if applied == Applied::Counted {
            stats.tournament_games_played += 1;
        }
        applied
    }

    pub fn apply_tournament_result(
        &self,
        stats: &mut PlayerStatisticsRecord,
        result: &TournamentResult,
    ) -> Applied {
        let Some(ranking) = result.ranking_of(&stats.player_id) else {
            warn!(
                player_id = %stats.player_id,
                tournament_id = %result.tournament_id,
                "Player missing from tournament rankings, skipping"
            );
            return Applied::Skipped;
        };

        stats.tournaments_participated += 1;
        if ranking.rank == 1 {
            stats.tournament_wins += 1;
        }

        let placement = TournamentPlacement {
            tournament_id: result.tournament_id.clone(),
            tournament_name: result.tournament_name.clone(),
            rank: ranking.rank,
            total_ranked: ranking.total_ranked,
            date: result.finalized_at,
            team_name: ranking.team_name.clone(),
        };
        let improves = stats
            .best_tournament_placement
            .as_ref()
            .map_or(true, |best| placement.rank < best.rank);
        if improves {
            stats.best_tournament_placement = Some(placement.clone());
        }
        stats.tournament_placements.push(placement);

        self.touch(stats, result.finalized_at);
        Applied::Counted
    }

    /// Rebuilds the derived fields after a batch of applications.
    pub fn finalize(&self, stats: &mut PlayerStatisticsRecord) {
        stats.recompute_derived();
    }

    fn accumulate_quantities(&self, stats: &mut PlayerStatisticsRecord, outcome: &Outcome) {
        stats.total_points_made += outcome.points_made;
        stats.total_points_received += outcome.points_received;
        stats.total_striche_made += outcome.striche_made.total();
        stats.total_striche_received += outcome.striche_received.total();
        stats.total_weis_made += outcome.weis_made;
        stats.total_weis_received += outcome.weis_received;
        stats.matsch_made += outcome.striche_made.matsch;
        stats.matsch_received += outcome.striche_received.matsch;
        stats.schneider_made += outcome.striche_made.schneider;
        stats.schneider_received += outcome.striche_received.schneider;
        stats.kontermatsch_made += outcome.striche_made.kontermatsch;
        stats.kontermatsch_received += outcome.striche_received.kontermatsch;
    }

    fn touch(&self, stats: &mut PlayerStatisticsRecord, date: DateTime<Utc>) {
        if stats.first_played_at.map_or(true, |t| date < t) {
            stats.first_played_at = Some(date);
        }
        if stats.last_played_at.map_or(true, |t| date > t) {
            stats.last_played_at = Some(date);
        }
        // Event time, not wall clock, so a replay serializes identically.
        stats.last_updated = Some(date);
    }
}
