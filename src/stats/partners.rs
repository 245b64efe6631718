use chrono::{DateTime, Utc};
use tracing::warn;

use crate::records::{
    CompletedGameRecord, CompletedSessionRecord, PerSide, RosterPlayer, Side,
};

use super::models::{OpponentAggregate, PartnerAggregate, PlayerStatisticsRecord};
use super::outcome::{Outcome, OutcomeKind, SideResolver};

/// Reconstructs which identity occupied which game side.
///
/// A session's team-label rosters and a game's positional side labels are
/// different coordinate systems, so every participant is pushed through the
/// same resolver the outcome path uses. Participants whose side cannot be
/// determined are logged and skipped; partial data does not invalidate the
/// rest of the game.
pub fn reconstruct_game_sides(
    resolver: &SideResolver,
    game: &CompletedGameRecord,
    session: Option<&CompletedSessionRecord>,
) -> PerSide<Vec<RosterPlayer>> {
    let mut sides: PerSide<Vec<RosterPlayer>> = PerSide::default();
    for participant_id in &game.participant_ids {
        match resolver.resolve_game_side(participant_id, game, session) {
            Some((side, _)) => sides
                .side_mut(side)
                .push(roster_player(participant_id, session)),
            None => warn!(
                session_id = %game.session_id,
                game_number = game.game_number,
                player_id = %participant_id,
                "Could not place participant on a side, skipping for pair aggregation"
            ),
        }
    }
    sides
}

fn roster_player(player_id: &str, session: Option<&CompletedSessionRecord>) -> RosterPlayer {
    let display_name = session
        .and_then(|s| {
            s.teams
                .team_a
                .iter()
                .chain(&s.teams.team_b)
                .find(|p| p.player_id == player_id)
                .map(|p| p.display_name.clone())
        })
        .unwrap_or_else(|| player_id.to_string());
    RosterPlayer {
        player_id: player_id.to_string(),
        display_name,
    }
}

/// Updates partner and opponent aggregates for one game.
pub fn apply_game(
    stats: &mut PlayerStatisticsRecord,
    outcome: &Outcome,
    sides: &PerSide<Vec<RosterPlayer>>,
    date: DateTime<Utc>,
) {
    let Some(side) = outcome.side else {
        return;
    };
    let won = outcome.result == OutcomeKind::Win;
    let points_diff = outcome.points_made - outcome.points_received;
    let striche_diff =
        i64::from(outcome.striche_made.total()) - i64::from(outcome.striche_received.total());

    for co_player in teammates(stats, sides, side) {
        let entry = partner_entry(stats, &co_player);
        entry.games_played_with += 1;
        if won {
            entry.games_won_with += 1;
        }
        entry.points_difference_with += points_diff;
        entry.striche_difference_with += striche_diff;
        entry.matsch_made_with += outcome.striche_made.matsch;
        entry.matsch_received_with += outcome.striche_received.matsch;
        entry.schneider_made_with += outcome.striche_made.schneider;
        entry.schneider_received_with += outcome.striche_received.schneider;
        entry.kontermatsch_made_with += outcome.striche_made.kontermatsch;
        entry.kontermatsch_received_with += outcome.striche_received.kontermatsch;
        entry.last_played_with = Some(date);
    }

    for co_player in sides.side(side.opponent()).clone() {
        let entry = opponent_entry(stats, &co_player);
        entry.games_played_against += 1;
        if won {
            entry.games_won_against += 1;
        }
        entry.points_difference_against += points_diff;
        entry.striche_difference_against += striche_diff;
        entry.matsch_made_against += outcome.striche_made.matsch;
        entry.matsch_received_against += outcome.striche_received.matsch;
        entry.schneider_made_against += outcome.striche_made.schneider;
        entry.schneider_received_against += outcome.striche_received.schneider;
        entry.kontermatsch_made_against += outcome.striche_made.kontermatsch;
        entry.kontermatsch_received_against += outcome.striche_received.kontermatsch;
        entry.last_played_against = Some(date);
    }
}

/// Updates partner and opponent aggregates for one whole session, using the
/// session's named team rosters.
pub fn apply_session(
    stats: &mut PlayerStatisticsRecord,
    outcome: &Outcome,
    session: &CompletedSessionRecord,
    date: DateTime<Utc>,
) {
    let Some(label) = outcome.team_label else {
        return;
    };
    let won = outcome.result == OutcomeKind::Win;

    let own_roster: Vec<RosterPlayer> = session
        .teams
        .roster(label)
        .iter()
        .filter(|p| p.player_id != stats.player_id)
        .cloned()
        .collect();
    let opposing_roster: Vec<RosterPlayer> =
        session.teams.roster(label.opponent()).to_vec();

    for co_player in own_roster {
        let entry = partner_entry(stats, &co_player);
        entry.sessions_played_with += 1;
        if won {
            entry.sessions_won_with += 1;
        }
        entry.last_played_with = Some(date);
    }
    for co_player in opposing_roster {
        let entry = opponent_entry(stats, &co_player);
        entry.sessions_played_against += 1;
        if won {
            entry.sessions_won_against += 1;
        }
        entry.last_played_against = Some(date);
    }
}

fn teammates(
    stats: &PlayerStatisticsRecord,
    sides: &PerSide<Vec<RosterPlayer>>,
    side: Side,
) -> Vec<RosterPlayer> {
    sides
        .side(side)
        .iter()
        .filter(|p| p.player_id != stats.player_id)
        .cloned()
        .collect()
}

fn partner_entry<'a>(
    stats: &'a mut PlayerStatisticsRecord,
    co_player: &RosterPlayer,
) -> &'a mut PartnerAggregate {
    stats
        .partners
        .entry(co_player.player_id.clone())
        .or_insert_with(|| PartnerAggregate::new(&co_player.player_id, &co_player.display_name))
}

fn opponent_entry<'a>(
    stats: &'a mut PlayerStatisticsRecord,
    co_player: &RosterPlayer,
) -> &'a mut OpponentAggregate {
    stats
        .opponents
        .entry(co_player.player_id.clone())
        .or_insert_with(|| OpponentAggregate::new(&co_player.player_id, &co_player.display_name))
}
