use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::event::{EventBus, EventError, RecordEvent, RecordEventHandler};
use crate::group::GroupAggregator;
use crate::records::{CompletedGameRecord, CompletedSessionRecord, RecordStore};

use super::apply::{Applied, EventApplier};
use super::errors::StatsError;
use super::outcome::{resolve_session_outcome, SideResolver};
use super::recalculation::replay_player_history;
use super::repository::StatsRepository;

/// Result of applying one event to one participant.
#[derive(Debug)]
pub struct ParticipantUpdate {
    pub player_id: String,
    pub outcome: Result<Applied, StatsError>,
}

impl ParticipantUpdate {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Applies freshly stored records to every affected player document.
///
/// Participants are updated independently: a failure for one player is
/// logged and reported but never aborts the siblings, so a partially
/// updated event can be healed later by full recalculation.
pub struct StatsUpdater {
    records: Arc<dyn RecordStore>,
    repository: Arc<dyn StatsRepository>,
    resolver: SideResolver,
}

impl StatsUpdater {
    pub fn new(records: Arc<dyn RecordStore>, repository: Arc<dyn StatsRepository>) -> Self {
        Self {
            records,
            repository,
            resolver: SideResolver::default(),
        }
    }

    /// Replaces the table-position configuration. The recalculation engine
    /// and the group aggregator must share the same one for the paths to
    /// agree.
    pub fn with_resolver(mut self, resolver: SideResolver) -> Self {
        self.resolver = resolver;
        self
    }

    #[instrument(skip(self))]
    pub async fn process_completed_game(
        &self,
        session_id: &str,
        game_number: u32,
    ) -> Result<Vec<ParticipantUpdate>, StatsError> {
        let game = self
            .records
            .get_game(session_id, game_number)
            .await?
            .ok_or_else(|| {
                StatsError::RecordNotFound(format!("game {game_number} of session {session_id}"))
            })?;
        let session = self.records.get_session(session_id).await?;

        let mut updates = Vec::new();
        for player_id in participants_of_game(&game) {
            let outcome = self
                .apply_to_player(&player_id, {
                    let game = game.clone();
                    let session = session.clone();
                    let resolver = self.resolver.clone();
                    Box::new(move |stats| {
                        let applier = EventApplier::new(&resolver);
                        let applied = applier.apply_game(stats, &game, session.as_ref());
                        applier.finalize(stats);
                        applied
                    })
                })
                .await;
            updates.push(ParticipantUpdate { player_id, outcome });
        }
        self.log_summary("game", &updates);
        Ok(updates)
    }

    #[instrument(skip(self))]
    pub async fn process_finalized_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<ParticipantUpdate>, StatsError> {
        let session = self
            .records
            .get_session(session_id)
            .await?
            .ok_or_else(|| StatsError::RecordNotFound(format!("session {session_id}")))?;

        // The session record carries the team-to-side context its games may
        // have been processed without, so each participant's document is
        // rebuilt from the full history instead of patched incrementally.
        // This makes the stored state independent of record arrival order.
        let mut updates = Vec::new();
        for player_id in participants_of_session(&session) {
            let outcome = self.replay_participant(&player_id, &session).await;
            updates.push(ParticipantUpdate { player_id, outcome });
        }

        // The live producer's in-progress state is obsolete once the session
        // aggregate exists.
        self.records.clear_active_game(session_id).await?;

        self.log_summary("session", &updates);
        Ok(updates)
    }

    #[instrument(skip(self))]
    pub async fn process_tournament_game(
        &self,
        tournament_id: &str,
        game_number: u32,
    ) -> Result<Vec<ParticipantUpdate>, StatsError> {
        let game = self
            .records
            .get_tournament_game(tournament_id, game_number)
            .await?
            .ok_or_else(|| {
                StatsError::RecordNotFound(format!(
                    "tournament game {game_number} of {tournament_id}"
                ))
            })?;

        let mut updates = Vec::new();
        for player_id in game.participant_ids.clone() {
            let outcome = self
                .apply_to_player(&player_id, {
                    let game = game.clone();
                    let resolver = self.resolver.clone();
                    Box::new(move |stats| {
                        let applier = EventApplier::new(&resolver);
                        let applied = applier.apply_tournament_game(stats, &game);
                        applier.finalize(stats);
                        applied
                    })
                })
                .await;
            updates.push(ParticipantUpdate { player_id, outcome });
        }
        self.log_summary("tournament game", &updates);
        Ok(updates)
    }

    #[instrument(skip(self))]
    pub async fn process_tournament_result(
        &self,
        tournament_id: &str,
    ) -> Result<Vec<ParticipantUpdate>, StatsError> {
        let result = self
            .records
            .get_tournament_result(tournament_id)
            .await?
            .ok_or_else(|| {
                StatsError::RecordNotFound(format!("tournament result {tournament_id}"))
            })?;

        let mut updates = Vec::new();
        for ranking in &result.rankings {
            let player_id = ranking.player_id.clone();
            let outcome = self
                .apply_to_player(&player_id, {
                    let result = result.clone();
                    let resolver = self.resolver.clone();
                    Box::new(move |stats| {
                        let applier = EventApplier::new(&resolver);
                        let applied = applier.apply_tournament_result(stats, &result);
                        applier.finalize(stats);
                        applied
                    })
                })
                .await;
            updates.push(ParticipantUpdate { player_id, outcome });
        }
        self.log_summary("tournament result", &updates);
        Ok(updates)
    }

    async fn replay_participant(
        &self,
        player_id: &str,
        session: &CompletedSessionRecord,
    ) -> Result<Applied, StatsError> {
        let (stats, _, _) =
            match replay_player_history(self.records.as_ref(), &self.resolver, player_id).await {
                Ok(replayed) => replayed,
                Err(err) => {
                    error!(player_id = %player_id, error = ?err, "Failed to replay player history");
                    return Err(err);
                }
            };
        if let Err(err) = self.repository.overwrite_player(stats).await {
            error!(player_id = %player_id, error = ?err, "Failed to store replayed statistics");
            return Err(err);
        }
        Ok(
            if resolve_session_outcome(&self.resolver, player_id, session).is_counted() {
                Applied::Counted
            } else {
                Applied::Skipped
            },
        )
    }

    async fn apply_to_player(
        &self,
        player_id: &str,
        update: super::repository::PlayerUpdate,
    ) -> Result<Applied, StatsError> {
        let result = self.repository.update_player(player_id, update).await;
        if let Err(err) = &result {
            error!(player_id = %player_id, error = ?err, "Failed to update player statistics");
        }
        result
    }

    fn log_summary(&self, kind: &str, updates: &[ParticipantUpdate]) {
        let failed = updates.iter().filter(|u| !u.succeeded()).count();
        if failed > 0 {
            warn!(
                kind,
                participants = updates.len(),
                failed,
                "Applied event with partial failures"
            );
        } else {
            info!(kind, participants = updates.len(), "Applied event");
        }
    }
}

fn participants_of_game(game: &CompletedGameRecord) -> Vec<String> {
    let mut ids = game.participant_ids.clone();
    if let Some(rosters) = &game.side_rosters {
        for id in rosters.top.iter().chain(&rosters.bottom) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
    }
    ids
}

fn participants_of_session(session: &CompletedSessionRecord) -> Vec<String> {
    let mut ids = session.participant_ids.clone();
    for player in session.teams.team_a.iter().chain(&session.teams.team_b) {
        if !ids.contains(&player.player_id) {
            ids.push(player.player_id.clone());
        }
    }
    ids
}

/// Bridges record events onto the updater and the group aggregator.
pub struct StatsRecordSubscriber {
    updater: Arc<StatsUpdater>,
    group_aggregator: Arc<GroupAggregator>,
    records: Arc<dyn RecordStore>,
    event_bus: EventBus,
}

impl StatsRecordSubscriber {
    pub fn new(
        updater: Arc<StatsUpdater>,
        group_aggregator: Arc<GroupAggregator>,
        records: Arc<dyn RecordStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            updater,
            group_aggregator,
            records,
            event_bus,
        }
    }

    fn emit_stats_updated(&self, updates: &[ParticipantUpdate]) {
        let player_ids: Vec<String> = updates
            .iter()
            .filter(|u| u.succeeded())
            .map(|u| u.player_id.clone())
            .collect();
        if !player_ids.is_empty() {
            self.event_bus.emit(RecordEvent::StatsUpdated { player_ids });
        }
    }

    async fn refresh_group_for_session(&self, session_id: &str) {
        let group_id = match self.records.get_session(session_id).await {
            Ok(Some(session)) => session.group_id,
            Ok(None) => None,
            Err(err) => {
                error!(session_id = %session_id, error = ?err, "Failed to load session for group refresh");
                None
            }
        };
        if let Some(group_id) = group_id {
            if let Err(err) = self.group_aggregator.refresh_group(&group_id).await {
                error!(group_id = %group_id, error = ?err, "Failed to refresh group leaderboards");
            }
        }
    }
}

#[async_trait]
impl RecordEventHandler for StatsRecordSubscriber {
    async fn handle(&self, event: &RecordEvent) -> Result<(), EventError> {
        match event {
            RecordEvent::GameCompleted {
                session_id,
                game_number,
            } => {
                let updates = self
                    .updater
                    .process_completed_game(session_id, *game_number)
                    .await
                    .map_err(|e| EventError::retryable(e.to_string()))?;
                self.emit_stats_updated(&updates);
            }
            RecordEvent::SessionFinalized { session_id } => {
                let updates = self
                    .updater
                    .process_finalized_session(session_id)
                    .await
                    .map_err(|e| EventError::retryable(e.to_string()))?;
                self.emit_stats_updated(&updates);
                self.refresh_group_for_session(session_id).await;
            }
            RecordEvent::TournamentGameCompleted {
                tournament_id,
                game_number,
            } => {
                let updates = self
                    .updater
                    .process_tournament_game(tournament_id, *game_number)
                    .await
                    .map_err(|e| EventError::retryable(e.to_string()))?;
                self.emit_stats_updated(&updates);
            }
            RecordEvent::TournamentFinalized { tournament_id } => {
                let updates = self
                    .updater
                    .process_tournament_result(tournament_id)
                    .await
                    .map_err(|e| EventError::retryable(e.to_string()))?;
                self.emit_stats_updated(&updates);
            }
            RecordEvent::StatsUpdated { .. } => {}
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "StatsRecordSubscriber"
    }
}
