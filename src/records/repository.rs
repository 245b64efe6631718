use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

use super::models::{
    CompletedGameRecord, CompletedSessionRecord, TournamentGameRecord, TournamentResult,
};
use super::RecordError;

/// Append-only store of completed records.
///
/// The persistence technology is an external collaborator; this trait is the
/// seam. Records are immutable once inserted, so there are no update methods.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_game(&self, game: CompletedGameRecord) -> Result<(), RecordError>;
    async fn insert_session(&self, session: CompletedSessionRecord) -> Result<(), RecordError>;
    async fn insert_tournament_game(&self, game: TournamentGameRecord)
        -> Result<(), RecordError>;
    async fn insert_tournament_result(&self, result: TournamentResult)
        -> Result<(), RecordError>;

    async fn get_game(
        &self,
        session_id: &str,
        game_number: u32,
    ) -> Result<Option<CompletedGameRecord>, RecordError>;
    async fn get_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CompletedSessionRecord>, RecordError>;
    async fn games_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<CompletedGameRecord>, RecordError>;
    async fn get_tournament_game(
        &self,
        tournament_id: &str,
        game_number: u32,
    ) -> Result<Option<TournamentGameRecord>, RecordError>;
    async fn get_tournament_result(
        &self,
        tournament_id: &str,
    ) -> Result<Option<TournamentResult>, RecordError>;

    async fn sessions_for_player(
        &self,
        player_id: &str,
    ) -> Result<Vec<CompletedSessionRecord>, RecordError>;
    async fn games_for_player(
        &self,
        player_id: &str,
    ) -> Result<Vec<CompletedGameRecord>, RecordError>;
    async fn tournament_games_for_player(
        &self,
        player_id: &str,
    ) -> Result<Vec<TournamentGameRecord>, RecordError>;
    async fn tournament_results_for_player(
        &self,
        player_id: &str,
    ) -> Result<Vec<TournamentResult>, RecordError>;

    async fn sessions_for_group(
        &self,
        group_id: &str,
    ) -> Result<Vec<CompletedSessionRecord>, RecordError>;
    /// Games carrying the group tag themselves, independent of whether their
    /// session record exists.
    async fn games_for_group(
        &self,
        group_id: &str,
    ) -> Result<Vec<CompletedGameRecord>, RecordError>;

    /// Every player identity referenced by any stored record, in a stable
    /// order. Drives the "recalculate all" administrative operation.
    async fn all_player_ids(&self) -> Result<Vec<String>, RecordError>;

    /// Removes the in-progress game state left behind by the live producer
    /// once its session has been finalized.
    async fn clear_active_game(&self, session_id: &str) -> Result<(), RecordError>;
}

#[derive(Default)]
struct StoreInner {
    games: BTreeMap<(String, u32), CompletedGameRecord>,
    sessions: BTreeMap<String, CompletedSessionRecord>,
    tournament_games: BTreeMap<(String, u32), TournamentGameRecord>,
    tournament_results: BTreeMap<String, TournamentResult>,
    active_games: HashSet<String>,
}

/// In-memory implementation of [`RecordStore`] for development and testing.
#[derive(Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a session as having live game state, so tests can observe the
    /// cleanup performed on session finalization.
    pub async fn mark_active_game(&self, session_id: &str) {
        let mut inner = self.inner.write().await;
        inner.active_games.insert(session_id.to_string());
    }

    pub async fn has_active_game(&self, session_id: &str) -> bool {
        let inner = self.inner.read().await;
        inner.active_games.contains(session_id)
    }
}

fn game_involves(game: &CompletedGameRecord, player_id: &str) -> bool {
    game.participant_ids.iter().any(|id| id == player_id)
}

fn session_involves(session: &CompletedSessionRecord, player_id: &str) -> bool {
    session.participant_ids.iter().any(|id| id == player_id)
        || session.teams.label_of(player_id).is_some()
}

fn tournament_game_involves(game: &TournamentGameRecord, player_id: &str) -> bool {
    game.participant_ids.iter().any(|id| id == player_id)
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_game(&self, game: CompletedGameRecord) -> Result<(), RecordError> {
        let mut inner = self.inner.write().await;
        let key = (game.session_id.clone(), game.game_number);
        if inner.games.contains_key(&key) {
            return Err(RecordError::Duplicate(format!(
                "game {} of session {}",
                key.1, key.0
            )));
        }
        debug!(session_id = %key.0, game_number = key.1, "Storing completed game");
        inner.games.insert(key, game);
        Ok(())
    }

    async fn insert_session(&self, session: CompletedSessionRecord) -> Result<(), RecordError> {
        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(&session.session_id) {
            return Err(RecordError::Duplicate(format!(
                "session {}",
                session.session_id
            )));
        }
        debug!(session_id = %session.session_id, "Storing completed session");
        inner.sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn insert_tournament_game(
        &self,
        game: TournamentGameRecord,
    ) -> Result<(), RecordError> {
        let mut inner = self.inner.write().await;
        let key = (game.tournament_id.clone(), game.game_number);
        if inner.tournament_games.contains_key(&key) {
            return Err(RecordError::Duplicate(format!(
                "tournament game {} of {}",
                key.1, key.0
            )));
        }
        inner.tournament_games.insert(key, game);
        Ok(())
    }

    async fn insert_tournament_result(
        &self,
        result: TournamentResult,
    ) -> Result<(), RecordError> {
        let mut inner = self.inner.write().await;
        if inner.tournament_results.contains_key(&result.tournament_id) {
            return Err(RecordError::Duplicate(format!(
                "tournament result {}",
                result.tournament_id
            )));
        }
        inner
            .tournament_results
            .insert(result.tournament_id.clone(), result);
        Ok(())
    }

    async fn get_game(
        &self,
        session_id: &str,
        game_number: u32,
    ) -> Result<Option<CompletedGameRecord>, RecordError> {
        let inner = self.inner.read().await;
        Ok(inner
            .games
            .get(&(session_id.to_string(), game_number))
            .cloned())
    }

    async fn get_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CompletedSessionRecord>, RecordError> {
        let inner = self.inner.read().await;
        Ok(inner.sessions.get(session_id).cloned())
    }

    async fn games_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<CompletedGameRecord>, RecordError> {
        let inner = self.inner.read().await;
        Ok(inner
            .games
            .values()
            .filter(|g| g.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn get_tournament_game(
        &self,
        tournament_id: &str,
        game_number: u32,
    ) -> Result<Option<TournamentGameRecord>, RecordError> {
        let inner = self.inner.read().await;
        Ok(inner
            .tournament_games
            .get(&(tournament_id.to_string(), game_number))
            .cloned())
    }

    async fn get_tournament_result(
        &self,
        tournament_id: &str,
    ) -> Result<Option<TournamentResult>, RecordError> {
        let inner = self.inner.read().await;
        Ok(inner.tournament_results.get(tournament_id).cloned())
    }

    async fn sessions_for_player(
        &self,
        player_id: &str,
    ) -> Result<Vec<CompletedSessionRecord>, RecordError> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .values()
            .filter(|s| session_involves(s, player_id))
            .cloned()
            .collect())
    }

    async fn games_for_player(
        &self,
        player_id: &str,
    ) -> Result<Vec<CompletedGameRecord>, RecordError> {
        let inner = self.inner.read().await;
        Ok(inner
            .games
            .values()
            .filter(|g| game_involves(g, player_id))
            .cloned()
            .collect())
    }

    async fn tournament_games_for_player(
        &self,
        player_id: &str,
    ) -> Result<Vec<TournamentGameRecord>, RecordError> {
        let inner = self.inner.read().await;
        Ok(inner
            .tournament_games
            .values()
            .filter(|g| tournament_game_involves(g, player_id))
            .cloned()
            .collect())
    }

    async fn tournament_results_for_player(
        &self,
        player_id: &str,
    ) -> Result<Vec<TournamentResult>, RecordError> {
        let inner = self.inner.read().await;
        Ok(inner
            .tournament_results
            .values()
            .filter(|r| r.ranking_of(player_id).is_some())
            .cloned()
            .collect())
    }

    async fn sessions_for_group(
        &self,
        group_id: &str,
    ) -> Result<Vec<CompletedSessionRecord>, RecordError> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .values()
            .filter(|s| s.group_id.as_deref() == Some(group_id))
            .cloned()
            .collect())
    }

    async fn games_for_group(
        &self,
        group_id: &str,
    ) -> Result<Vec<CompletedGameRecord>, RecordError> {
        let inner = self.inner.read().await;
        Ok(inner
            .games
            .values()
            .filter(|g| g.group_id.as_deref() == Some(group_id))
            .cloned()
            .collect())
    }

    async fn all_player_ids(&self) -> Result<Vec<String>, RecordError> {
        let inner = self.inner.read().await;
        let mut ids = BTreeSet::new();
        for game in inner.games.values() {
            ids.extend(game.participant_ids.iter().cloned());
        }
        for session in inner.sessions.values() {
            ids.extend(session.participant_ids.iter().cloned());
            for player in session.teams.team_a.iter().chain(&session.teams.team_b) {
                ids.insert(player.player_id.clone());
            }
        }
        for game in inner.tournament_games.values() {
            ids.extend(game.participant_ids.iter().cloned());
        }
        for result in inner.tournament_results.values() {
            ids.extend(result.rankings.iter().map(|r| r.player_id.clone()));
        }
        Ok(ids.into_iter().collect())
    }

    async fn clear_active_game(&self, session_id: &str) -> Result<(), RecordError> {
        let mut inner = self.inner.write().await;
        if inner.active_games.remove(session_id) {
            debug!(session_id = %session_id, "Cleared live game state");
        }
        Ok(())
    }
}
