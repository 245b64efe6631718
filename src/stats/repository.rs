use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::group::GroupStatisticsRecord;

use super::apply::Applied;
use super::errors::StatsError;
use super::models::PlayerStatisticsRecord;

/// Mutation applied to one player's statistics document under the store's
/// write lock, so concurrent updates for the same player never interleave.
pub type PlayerUpdate = Box<dyn FnOnce(&mut PlayerStatisticsRecord) -> Applied + Send>;

#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn get_player(
        &self,
        player_id: &str,
    ) -> Result<Option<PlayerStatisticsRecord>, StatsError>;

    /// Runs `update` against the player's current document, creating a zeroed
    /// document first if none exists yet.
    async fn update_player(
        &self,
        player_id: &str,
        update: PlayerUpdate,
    ) -> Result<Applied, StatsError>;

    /// Replaces the player's document wholesale. Used by full recalculation.
    async fn overwrite_player(&self, record: PlayerStatisticsRecord) -> Result<(), StatsError>;

    async fn list_player_ids(&self) -> Result<Vec<String>, StatsError>;

    async fn get_group(
        &self,
        group_id: &str,
    ) -> Result<Option<GroupStatisticsRecord>, StatsError>;

    async fn put_group(&self, record: GroupStatisticsRecord) -> Result<(), StatsError>;
}

#[derive(Debug, Default)]
pub struct InMemoryStatsRepository {
    players: Arc<RwLock<BTreeMap<String, PlayerStatisticsRecord>>>,
    groups: Arc<RwLock<HashMap<String, GroupStatisticsRecord>>>,
}

impl InMemoryStatsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatsRepository for InMemoryStatsRepository {
    async fn get_player(
        &self,
        player_id: &str,
    ) -> Result<Option<PlayerStatisticsRecord>, StatsError> {
        let players = self.players.read().await;
        Ok(players.get(player_id).cloned())
    }

    async fn update_player(
        &self,
        player_id: &str,
        update: PlayerUpdate,
    ) -> Result<Applied, StatsError> {
        let mut players = self.players.write().await;
        let record = players
            .entry(player_id.to_string())
            .or_insert_with(|| PlayerStatisticsRecord::new(player_id));
        Ok(update(record))
    }

    async fn overwrite_player(&self, record: PlayerStatisticsRecord) -> Result<(), StatsError> {
        let mut players = self.players.write().await;
        players.insert(record.player_id.clone(), record);
        Ok(())
    }

    async fn list_player_ids(&self) -> Result<Vec<String>, StatsError> {
        let players = self.players.read().await;
        Ok(players.keys().cloned().collect())
    }

    async fn get_group(
        &self,
        group_id: &str,
    ) -> Result<Option<GroupStatisticsRecord>, StatsError> {
        let groups = self.groups.read().await;
        Ok(groups.get(group_id).cloned())
    }

    async fn put_group(&self, record: GroupStatisticsRecord) -> Result<(), StatsError> {
        let mut groups = self.groups.write().await;
        groups.insert(record.group_id.clone(), record);
        Ok(())
    }
}
