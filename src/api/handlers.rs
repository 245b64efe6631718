use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::{info, instrument};

use crate::event::RecordEvent;
use crate::group::GroupStatisticsRecord;
use crate::records::{
    CompletedGameRecord, CompletedSessionRecord, TournamentGameRecord, TournamentResult,
};
use crate::shared::{AppError, AppState};
use crate::stats::{PlayerStatisticsRecord, RecalculationSummary};

/// HTTP handler for ingesting a completed game record
///
/// POST /records/games
/// Stores the record and notifies subscribers, which apply it to the
/// participants' statistics.
#[instrument(name = "ingest_game", skip(state, game))]
pub async fn ingest_game(
    State(state): State<AppState>,
    Json(game): Json<CompletedGameRecord>,
) -> Result<StatusCode, AppError> {
    info!(
        session_id = %game.session_id,
        game_number = game.game_number,
        "Ingesting completed game"
    );

    let session_id = game.session_id.clone();
    let game_number = game.game_number;
    state.record_store.insert_game(game).await?;
    state.event_bus.emit(RecordEvent::GameCompleted {
        session_id,
        game_number,
    });

    Ok(StatusCode::CREATED)
}

/// HTTP handler for ingesting a finalized session record
///
/// POST /records/sessions
#[instrument(name = "ingest_session", skip(state, session))]
pub async fn ingest_session(
    State(state): State<AppState>,
    Json(session): Json<CompletedSessionRecord>,
) -> Result<StatusCode, AppError> {
    info!(session_id = %session.session_id, "Ingesting finalized session");

    let session_id = session.session_id.clone();
    state.record_store.insert_session(session).await?;
    state
        .event_bus
        .emit(RecordEvent::SessionFinalized { session_id });

    Ok(StatusCode::CREATED)
}

/// HTTP handler for ingesting a completed tournament game record
///
/// POST /records/tournament-games
#[instrument(name = "ingest_tournament_game", skip(state, game))]
pub async fn ingest_tournament_game(
    State(state): State<AppState>,
    Json(game): Json<TournamentGameRecord>,
) -> Result<StatusCode, AppError> {
    info!(
        tournament_id = %game.tournament_id,
        game_number = game.game_number,
        "Ingesting tournament game"
    );

    let tournament_id = game.tournament_id.clone();
    let game_number = game.game_number;
    state.record_store.insert_tournament_game(game).await?;
    state.event_bus.emit(RecordEvent::TournamentGameCompleted {
        tournament_id,
        game_number,
    });

    Ok(StatusCode::CREATED)
}

/// HTTP handler for ingesting a finalized tournament's rankings
///
/// POST /records/tournament-results
#[instrument(name = "ingest_tournament_result", skip(state, result))]
pub async fn ingest_tournament_result(
    State(state): State<AppState>,
    Json(result): Json<TournamentResult>,
) -> Result<StatusCode, AppError> {
    info!(
        tournament_id = %result.tournament_id,
        ranked = result.rankings.len(),
        "Ingesting tournament result"
    );

    let tournament_id = result.tournament_id.clone();
    state.record_store.insert_tournament_result(result).await?;
    state
        .event_bus
        .emit(RecordEvent::TournamentFinalized { tournament_id });

    Ok(StatusCode::CREATED)
}

/// HTTP handler for reading one player's statistics document
///
/// GET /players/:player_id/statistics
#[instrument(name = "get_player_statistics", skip(state))]
pub async fn get_player_statistics(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerStatisticsRecord>, AppError> {
    let stats = state
        .stats_repository
        .get_player(&player_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No statistics for player {player_id}")))?;

    Ok(Json(stats))
}

/// HTTP handler for reading a group's leaderboards
///
/// GET /groups/:group_id/statistics
#[instrument(name = "get_group_statistics", skip(state))]
pub async fn get_group_statistics(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<Json<GroupStatisticsRecord>, AppError> {
    let record = state
        .stats_repository
        .get_group(&group_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No statistics for group {group_id}")))?;

    Ok(Json(record))
}

/// HTTP handler for the administrative full-recalculation operation
///
/// POST /admin/recalculate
/// Requires a bearer token with the admin claim; authorization runs before
/// any data is touched.
#[instrument(name = "recalculate_all", skip(state, headers))]
pub async fn recalculate_all(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RecalculationSummary>, AppError> {
    let claims = state.token_config.require_admin(&headers)?;
    info!(subject = %claims.sub, "Starting full recalculation");

    let summary = state.recalculation.recalculate_all().await?;

    let player_ids = state.stats_repository.list_player_ids().await?;
    if !player_ids.is_empty() {
        state.event_bus.emit(RecordEvent::StatsUpdated { player_ids });
    }

    info!(
        total = summary.total_players,
        succeeded = summary.succeeded,
        "Full recalculation finished"
    );
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::records::test_fixtures::{game_record, session_record};
    use crate::records::repository::RecordStore;
    use crate::records::InMemoryRecordStore;
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    fn json_request(method: &str, uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn ingesting_a_game_stores_it_and_returns_created() {
        let store = Arc::new(InMemoryRecordStore::new());
        let state = AppStateBuilder::new()
            .with_record_store(store.clone())
            .build();
        let app = router(state);

        let game = game_record("s1", 1, 2500, 1200);
        let response = app
            .oneshot(json_request(
                "POST",
                "/records/games",
                serde_json::to_string(&game).unwrap(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(store.get_game("s1", 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_game_ingestion_conflicts() {
        let store = Arc::new(InMemoryRecordStore::new());
        store
            .insert_game(game_record("s1", 1, 2500, 1200))
            .await
            .unwrap();
        let state = AppStateBuilder::new().with_record_store(store).build();
        let app = router(state);

        let game = game_record("s1", 1, 2500, 1200);
        let response = app
            .oneshot(json_request(
                "POST",
                "/records/games",
                serde_json::to_string(&game).unwrap(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn player_statistics_read_after_direct_update() {
        let store = Arc::new(InMemoryRecordStore::new());
        store
            .insert_game(game_record("s1", 1, 2500, 1200))
            .await
            .unwrap();
        let state = AppStateBuilder::new()
            .with_record_store(store)
            .build();

        state.updater.process_completed_game("s1", 1).await.unwrap();

        let app = router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/players/p1/statistics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let stats: PlayerStatisticsRecord = serde_json::from_slice(&body).unwrap();
        assert_eq!(stats.player_id, "p1");
        assert_eq!(stats.game_wins, 1);
    }

    #[tokio::test]
    async fn unknown_player_statistics_are_not_found() {
        let state = AppStateBuilder::new().build();
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/players/nobody/statistics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn group_statistics_read_after_refresh() {
        let store = Arc::new(InMemoryRecordStore::new());
        let mut session = session_record("s1", &["p1", "p2", "p3", "p4"]);
        session.group_id = Some("g1".to_string());
        store.insert_session(session).await.unwrap();
        let state = AppStateBuilder::new().with_record_store(store).build();

        state.group_aggregator.refresh_group("g1").await.unwrap();

        let app = router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/groups/g1/statistics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let record: GroupStatisticsRecord = serde_json::from_slice(&body).unwrap();
        assert_eq!(record.group_id, "g1");
        assert_eq!(record.member_count, 4);
    }

    #[tokio::test]
    async fn recalculation_requires_an_admin_token() {
        let state = AppStateBuilder::new().build();
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/recalculate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn recalculation_rebuilds_every_player() {
        let store = Arc::new(InMemoryRecordStore::new());
        store
            .insert_session(session_record("s1", &["p1", "p2", "p3", "p4"]))
            .await
            .unwrap();
        store
            .insert_game(game_record("s1", 1, 2500, 1200))
            .await
            .unwrap();
        let state = AppStateBuilder::new().with_record_store(store).build();
        let token = state.token_config.create_admin_token("ops").unwrap();

        let app = router(state.clone());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/recalculate")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let summary: RecalculationSummary = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary.total_players, 4);
        assert_eq!(summary.succeeded, 4);

        let stats = state
            .stats_repository
            .get_player("p1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.total_games, 1);
    }
}
