pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::shared::AppState;

/// Builds the HTTP surface: record ingestion, statistics reads, and the
/// administrative recalculation operation.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/records/games", post(handlers::ingest_game))
        .route("/records/sessions", post(handlers::ingest_session))
        .route(
            "/records/tournament-games",
            post(handlers::ingest_tournament_game),
        )
        .route(
            "/records/tournament-results",
            post(handlers::ingest_tournament_result),
        )
        .route(
            "/players/:player_id/statistics",
            get(handlers::get_player_statistics),
        )
        .route(
            "/groups/:group_id/statistics",
            get(handlers::get_group_statistics),
        )
        .route("/admin/recalculate", post(handlers::recalculate_all))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
