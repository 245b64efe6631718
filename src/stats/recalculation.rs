use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{error, info, instrument};

use crate::records::{
    CompletedGameRecord, CompletedSessionRecord, RecordStore, TournamentGameRecord,
    TournamentResult,
};

use super::apply::{Applied, EventApplier};
use super::errors::StatsError;
use super::models::PlayerStatisticsRecord;
use super::outcome::SideResolver;
use super::repository::StatsRepository;

/// One entry of a player's replayable history.
enum HistoryEvent {
    Game {
        game: CompletedGameRecord,
        session: Option<CompletedSessionRecord>,
    },
    Session(CompletedSessionRecord),
    TournamentGame(TournamentGameRecord),
    TournamentResult(TournamentResult),
}

impl HistoryEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        match self {
            HistoryEvent::Game { game, .. } => game.completed_at,
            HistoryEvent::Session(session) => session.canonical_timestamp(),
            HistoryEvent::TournamentGame(game) => game.completed_at,
            HistoryEvent::TournamentResult(result) => result.finalized_at,
        }
    }

    /// Orders events sharing a timestamp: games before the aggregate that
    /// closes them, tournament results last.
    fn class(&self) -> u8 {
        match self {
            HistoryEvent::Game { .. } | HistoryEvent::TournamentGame(_) => 0,
            HistoryEvent::Session(_) => 1,
            HistoryEvent::TournamentResult(_) => 2,
        }
    }

    fn tiebreak_key(&self) -> (String, u32) {
        match self {
            HistoryEvent::Game { game, .. } => (game.session_id.clone(), game.game_number),
            HistoryEvent::Session(session) => (session.session_id.clone(), 0),
            HistoryEvent::TournamentGame(game) => (game.tournament_id.clone(), game.game_number),
            HistoryEvent::TournamentResult(result) => (result.tournament_id.clone(), 0),
        }
    }

    fn cmp_replay_order(&self, other: &Self) -> Ordering {
        self.timestamp()
            .cmp(&other.timestamp())
            .then_with(|| self.class().cmp(&other.class()))
            .then_with(|| self.tiebreak_key().cmp(&other.tiebreak_key()))
    }
}

/// Summary of a batch recalculation run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculationSummary {
    pub total_players: usize,
    pub succeeded: usize,
    pub failed_players: Vec<String>,
}

/// Rebuilds player documents from scratch by replaying the record history
/// through the same applier the incremental path uses, so both paths agree
/// byte for byte.
pub struct RecalculationEngine {
    records: Arc<dyn RecordStore>,
    repository: Arc<dyn StatsRepository>,
    resolver: SideResolver,
    parallelism: usize,
}

impl RecalculationEngine {
    pub fn new(records: Arc<dyn RecordStore>, repository: Arc<dyn StatsRepository>) -> Self {
        Self {
            records,
            repository,
            resolver: SideResolver::default(),
            parallelism: 4,
        }
    }

    /// Replaces the table-position configuration. The updater and the group
    /// aggregator must share the same one for the paths to agree.
    pub fn with_resolver(mut self, resolver: SideResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Replays one player's full history into a fresh document and stores it.
    #[instrument(skip(self))]
    pub async fn rebuild_player(
        &self,
        player_id: &str,
    ) -> Result<PlayerStatisticsRecord, StatsError> {
        let (stats, applied, skipped) =
            replay_player_history(self.records.as_ref(), &self.resolver, player_id).await?;

        self.repository.overwrite_player(stats.clone()).await?;
        info!(
            player_id = %player_id,
            events = applied + skipped,
            applied,
            skipped,
            "Rebuilt player statistics"
        );
        Ok(stats)
    }

    /// Rebuilds every known player. Failures are collected per player; any
    /// failure makes the whole run an error, but already-rebuilt players
    /// keep their fresh documents.
    #[instrument(skip(self))]
    pub async fn recalculate_all(&self) -> Result<RecalculationSummary, StatsError> {
        let player_ids = self.records.all_player_ids().await?;
        let total_players = player_ids.len();

        let results: Vec<(String, Result<PlayerStatisticsRecord, StatsError>)> =
            stream::iter(player_ids)
                .map(|player_id| async move {
                    let result = self.rebuild_player(&player_id).await;
                    (player_id, result)
                })
                .buffer_unordered(self.parallelism)
                .collect()
                .await;

        let mut failed_players: Vec<String> = Vec::new();
        for (player_id, result) in results {
            if let Err(err) = result {
                error!(player_id = %player_id, error = ?err, "Player rebuild failed");
                failed_players.push(player_id);
            }
        }
        failed_players.sort();

        let summary = RecalculationSummary {
            total_players,
            succeeded: total_players - failed_players.len(),
            failed_players,
        };
        info!(
            total = summary.total_players,
            succeeded = summary.succeeded,
            failed = summary.failed_players.len(),
            "Recalculation run finished"
        );

        if summary.failed_players.is_empty() {
            Ok(summary)
        } else {
            Err(StatsError::RecalculationIncomplete {
                failed: summary.failed_players.len(),
                total: summary.total_players,
            })
        }
    }
}

/// Replays a player's complete record history through the shared applier
/// into a fresh document. Returns the document with the counted and skipped
/// event totals. Also used by the incremental updater to reconcile arrival
/// order when a session record lands after its games.
pub(crate) async fn replay_player_history(
    records: &dyn RecordStore,
    resolver: &SideResolver,
    player_id: &str,
) -> Result<(PlayerStatisticsRecord, usize, usize), StatsError> {
    let mut history = gather_history(records, player_id).await?;
    history.sort_by(HistoryEvent::cmp_replay_order);

    let applier = EventApplier::new(resolver);
    let mut stats = PlayerStatisticsRecord::new(player_id);
    let mut applied = 0usize;
    let mut skipped = 0usize;
    for event in &history {
        let outcome = match event {
            HistoryEvent::Game { game, session } => {
                applier.apply_game(&mut stats, game, session.as_ref())
            }
            HistoryEvent::Session(session) => applier.apply_session(&mut stats, session),
            HistoryEvent::TournamentGame(game) => applier.apply_tournament_game(&mut stats, game),
            HistoryEvent::TournamentResult(result) => {
                applier.apply_tournament_result(&mut stats, result)
            }
        };
        match outcome {
            Applied::Counted => applied += 1,
            Applied::Skipped => skipped += 1,
        }
    }
    applier.finalize(&mut stats);
    Ok((stats, applied, skipped))
}

async fn gather_history(
    records: &dyn RecordStore,
    player_id: &str,
) -> Result<Vec<HistoryEvent>, StatsError> {
    let mut history = Vec::new();

    for game in records.games_for_player(player_id).await? {
        let session = records.get_session(&game.session_id).await?;
        history.push(HistoryEvent::Game { game, session });
    }
    for session in records.sessions_for_player(player_id).await? {
        history.push(HistoryEvent::Session(session));
    }
    for game in records.tournament_games_for_player(player_id).await? {
        history.push(HistoryEvent::TournamentGame(game));
    }
    for result in records.tournament_results_for_player(player_id).await? {
        history.push(HistoryEvent::TournamentResult(result));
    }
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::test_fixtures::{game_record, session_record};
    use crate::records::InMemoryRecordStore;
    use crate::stats::repository::InMemoryStatsRepository;
    use crate::stats::updater::StatsUpdater;

    async fn seeded_store() -> Arc<InMemoryRecordStore> {
        let store = Arc::new(InMemoryRecordStore::new());
        store
            .insert_session(session_record("s1", &["p1", "p2", "p3", "p4"]))
            .await
            .unwrap();
        store
            .insert_game(game_record("s1", 1, 2500, 1200))
            .await
            .unwrap();
        store
            .insert_game(game_record("s1", 2, 900, 2500))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn rebuild_reproduces_incremental_state() {
        let store = seeded_store().await;

        let incremental_repo = Arc::new(InMemoryStatsRepository::new());
        let updater = StatsUpdater::new(store.clone(), incremental_repo.clone());
        updater.process_completed_game("s1", 1).await.unwrap();
        updater.process_completed_game("s1", 2).await.unwrap();
        updater.process_finalized_session("s1").await.unwrap();
        let incremental = incremental_repo.get_player("p1").await.unwrap().unwrap();

        let rebuilt_repo = Arc::new(InMemoryStatsRepository::new());
        let engine = RecalculationEngine::new(store, rebuilt_repo);
        let rebuilt = engine.rebuild_player("p1").await.unwrap();

        assert_eq!(rebuilt, incremental);
    }

    #[tokio::test]
    async fn rebuilding_twice_is_byte_identical() {
        let store = seeded_store().await;
        let repo = Arc::new(InMemoryStatsRepository::new());
        let engine = RecalculationEngine::new(store, repo);

        let first = engine.rebuild_player("p1").await.unwrap();
        let second = engine.rebuild_player("p1").await.unwrap();

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn rebuild_discards_previously_stored_state() {
        let store = seeded_store().await;
        let repo = Arc::new(InMemoryStatsRepository::new());
        repo.update_player(
            "p1",
            Box::new(|stats| {
                stats.total_games = 99;
                crate::stats::apply::Applied::Counted
            }),
        )
        .await
        .unwrap();

        let engine = RecalculationEngine::new(store, repo.clone());
        engine.rebuild_player("p1").await.unwrap();

        let stored = repo.get_player("p1").await.unwrap().unwrap();
        assert_eq!(stored.total_games, 2);
    }

    #[tokio::test]
    async fn recalculate_all_covers_every_known_player() {
        let store = seeded_store().await;
        let repo = Arc::new(InMemoryStatsRepository::new());
        let engine = RecalculationEngine::new(store, repo.clone()).with_parallelism(2);

        let summary = engine.recalculate_all().await.unwrap();
        assert_eq!(summary.total_players, 4);
        assert_eq!(summary.succeeded, 4);
        assert!(summary.failed_players.is_empty());

        for id in ["p1", "p2", "p3", "p4"] {
            let stats = repo.get_player(id).await.unwrap().unwrap();
            assert_eq!(stats.total_games, 2);
            assert_eq!(stats.total_sessions, 1);
        }
    }
}
