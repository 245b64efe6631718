use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use strum::IntoEnumIterator;
use tracing::{info, instrument, warn};

use crate::records::{CompletedGameRecord, CompletedSessionRecord, RecordStore};
use crate::stats::outcome::{
    resolve_game_outcome, resolve_session_outcome, OutcomeKind, SideResolver,
};
use crate::stats::{StatsError, StatsRepository};

use super::models::{GroupMetric, GroupStatisticsRecord, RankedEntry};

/// Running per-member tallies fed by the group's session and game history.
#[derive(Debug, Default)]
struct MemberTally {
    player_id: String,
    display_name: String,
    sessions: u32,
    session_wins: u32,
    session_losses: u32,
    games: u32,
    game_wins: u32,
    game_losses: u32,
    points_difference: i64,
    striche_difference: i64,
    matsch_made: u32,
    weis_made: i64,
}

/// Computes group leaderboards from scratch on every refresh.
///
/// Group boards are small and read rarely, so a wholesale recompute over the
/// group's sessions and tagged games keeps them trivially consistent with
/// the record history with no incremental bookkeeping to drift.
pub struct GroupAggregator {
    records: Arc<dyn RecordStore>,
    repository: Arc<dyn StatsRepository>,
    resolver: SideResolver,
    min_rate_events: u32,
}

impl GroupAggregator {
    pub fn new(records: Arc<dyn RecordStore>, repository: Arc<dyn StatsRepository>) -> Self {
        Self {
            records,
            repository,
            resolver: SideResolver::default(),
            min_rate_events: 1,
        }
    }

    /// Replaces the table-position configuration. The updater and the
    /// recalculation engine must share the same one for the paths to agree.
    pub fn with_resolver(mut self, resolver: SideResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Minimum observations before a member appears on a rate leaderboard.
    pub fn with_min_rate_events(mut self, min_rate_events: u32) -> Self {
        self.min_rate_events = min_rate_events;
        self
    }

    /// Recomputes the group's boards and stores the result.
    #[instrument(skip(self))]
    pub async fn refresh_group(&self, group_id: &str) -> Result<GroupStatisticsRecord, StatsError> {
        let record = self.compute_group(group_id).await?;
        self.repository.put_group(record.clone()).await?;
        info!(
            group_id = %group_id,
            members = record.member_count,
            sessions = record.sessions_considered,
            games = record.games_considered,
            "Refreshed group leaderboards"
        );
        Ok(record)
    }

    pub async fn compute_group(&self, group_id: &str) -> Result<GroupStatisticsRecord, StatsError> {
        let mut sessions = self.records.sessions_for_group(group_id).await?;
        sessions.sort_by(|a, b| {
            a.canonical_timestamp()
                .cmp(&b.canonical_timestamp())
                .then_with(|| a.session_id.cmp(&b.session_id))
        });

        let mut record = GroupStatisticsRecord::empty(group_id);
        let mut order: Vec<String> = Vec::new();
        let mut tallies: HashMap<String, MemberTally> = HashMap::new();

        let mut covered_sessions: HashSet<String> = HashSet::new();
        for session in &sessions {
            covered_sessions.insert(session.session_id.clone());
            record.sessions_considered += 1;
            record.computed_through = Some(
                record
                    .computed_through
                    .map_or(session.canonical_timestamp(), |t| {
                        t.max(session.canonical_timestamp())
                    }),
            );
            self.tally_session(session, &mut order, &mut tallies);

            let mut games = self.records.games_for_session(&session.session_id).await?;
            games.sort_by_key(|g| g.game_number);
            for game in &games {
                self.tally_game(
                    group_id,
                    game,
                    Some(session),
                    &mut record,
                    &mut order,
                    &mut tallies,
                );
            }
        }

        // Games tagged with the group whose session record never arrived.
        let mut orphan_games = self.records.games_for_group(group_id).await?;
        orphan_games.retain(|g| !covered_sessions.contains(&g.session_id));
        orphan_games.sort_by(|a, b| {
            a.completed_at
                .cmp(&b.completed_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
                .then_with(|| a.game_number.cmp(&b.game_number))
        });
        for game in &orphan_games {
            let session = self.records.get_session(&game.session_id).await?;
            self.tally_game(
                group_id,
                game,
                session.as_ref(),
                &mut record,
                &mut order,
                &mut tallies,
            );
        }

        record.member_count = order.len() as u32;
        for metric in GroupMetric::iter() {
            record
                .rankings
                .insert(metric, self.build_board(metric, &order, &tallies));
        }
        Ok(record)
    }

    fn tally_game(
        &self,
        group_id: &str,
        game: &CompletedGameRecord,
        session: Option<&CompletedSessionRecord>,
        record: &mut GroupStatisticsRecord,
        order: &mut Vec<String>,
        tallies: &mut HashMap<String, MemberTally>,
    ) {
        record.games_considered += 1;
        record.computed_through = Some(
            record
                .computed_through
                .map_or(game.completed_at, |t| t.max(game.completed_at)),
        );
        for player_id in &game.participant_ids {
            let outcome = resolve_game_outcome(&self.resolver, player_id, game, session);
            if !outcome.is_counted() {
                warn!(
                    group_id = %group_id,
                    session_id = %game.session_id,
                    game_number = game.game_number,
                    player_id = %player_id,
                    "Skipping unplaceable participant in group tally"
                );
                continue;
            }
            let tally = member_entry(order, tallies, player_id, session);
            tally.games += 1;
            match outcome.result {
                OutcomeKind::Win => tally.game_wins += 1,
                OutcomeKind::Loss => tally.game_losses += 1,
                OutcomeKind::Draw | OutcomeKind::Unknown => {}
            }
            tally.points_difference += outcome.points_made - outcome.points_received;
            tally.striche_difference += i64::from(outcome.striche_made.total())
                - i64::from(outcome.striche_received.total());
            tally.matsch_made += outcome.striche_made.matsch;
            tally.weis_made += outcome.weis_made;
        }
    }

    fn tally_session(
        &self,
        session: &CompletedSessionRecord,
        order: &mut Vec<String>,
        tallies: &mut HashMap<String, MemberTally>,
    ) {
        let mut members: Vec<String> = session.participant_ids.clone();
        for player in session.teams.team_a.iter().chain(&session.teams.team_b) {
            if !members.contains(&player.player_id) {
                members.push(player.player_id.clone());
            }
        }

        for player_id in &members {
            let outcome = resolve_session_outcome(&self.resolver, player_id, session);
            if !outcome.is_counted() {
                warn!(
                    session_id = %session.session_id,
                    player_id = %player_id,
                    "Skipping unplaceable member in group session tally"
                );
                continue;
            }
            let tally = member_entry(order, tallies, player_id, Some(session));
            tally.sessions += 1;
            match outcome.result {
                OutcomeKind::Win => tally.session_wins += 1,
                OutcomeKind::Loss => tally.session_losses += 1,
                OutcomeKind::Draw | OutcomeKind::Unknown => {}
            }
        }
    }

    fn build_board(
        &self,
        metric: GroupMetric,
        order: &[String],
        tallies: &HashMap<String, MemberTally>,
    ) -> Vec<RankedEntry> {
        let mut entries: Vec<RankedEntry> = order
            .iter()
            .filter_map(|player_id| {
                let tally = &tallies[player_id];
                let (value, events) = metric_value(metric, tally)?;
                if metric.is_rate() && events < self.min_rate_events {
                    return None;
                }
                Some(RankedEntry {
                    rank: 0,
                    player_id: tally.player_id.clone(),
                    display_name: tally.display_name.clone(),
                    value,
                    events,
                })
            })
            .collect();

        // Stable sort; members tied on value and events keep history order.
        entries.sort_by(|a, b| {
            b.value
                .total_cmp(&a.value)
                .then_with(|| b.events.cmp(&a.events))
        });
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.rank = index as u32 + 1;
        }
        entries
    }
}

fn metric_value(metric: GroupMetric, tally: &MemberTally) -> Option<(f64, u32)> {
    match metric {
        GroupMetric::MostSessions => Some((f64::from(tally.sessions), tally.sessions)),
        GroupMetric::MostGames => Some((f64::from(tally.games), tally.games)),
        GroupMetric::GameWinRate => {
            // Draws do not count against a win rate.
            let decided = tally.game_wins + tally.game_losses;
            (decided > 0).then(|| (f64::from(tally.game_wins) / f64::from(decided), decided))
        }
        GroupMetric::SessionWinRate => {
            let decided = tally.session_wins + tally.session_losses;
            (decided > 0).then(|| (f64::from(tally.session_wins) / f64::from(decided), decided))
        }
        GroupMetric::BestPointsDifference => Some((tally.points_difference as f64, tally.games)),
        GroupMetric::BestStricheDifference => Some((tally.striche_difference as f64, tally.games)),
        GroupMetric::MostMatschMade => Some((f64::from(tally.matsch_made), tally.games)),
        GroupMetric::MostWeisPoints => Some((tally.weis_made as f64, tally.games)),
    }
}

fn member_entry<'a>(
    order: &mut Vec<String>,
    tallies: &'a mut HashMap<String, MemberTally>,
    player_id: &str,
    session: Option<&CompletedSessionRecord>,
) -> &'a mut MemberTally {
    let entry = tallies.entry(player_id.to_string()).or_insert_with(|| {
        order.push(player_id.to_string());
        MemberTally {
            player_id: player_id.to_string(),
            ..MemberTally::default()
        }
    });
    if let Some(name) = session.and_then(|s| {
        s.teams
            .team_a
            .iter()
            .chain(&s.teams.team_b)
            .find(|p| p.player_id == player_id)
            .map(|p| p.display_name.clone())
    }) {
        entry.display_name = name;
    } else if entry.display_name.is_empty() {
        entry.display_name = player_id.to_string();
    }
    entry
}
