use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::TokenConfig;
use crate::event::EventBus;
use crate::group::GroupAggregator;
use crate::records::{RecordError, RecordStore};
use crate::stats::outcome::SideResolver;
use crate::stats::{RecalculationEngine, StatsError, StatsRepository, StatsUpdater};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub record_store: Arc<dyn RecordStore>,
    pub stats_repository: Arc<dyn StatsRepository>,
    pub updater: Arc<StatsUpdater>,
    pub recalculation: Arc<RecalculationEngine>,
    pub group_aggregator: Arc<GroupAggregator>,
    pub event_bus: EventBus,
    pub token_config: TokenConfig,
}

impl AppState {
    pub fn new(
        record_store: Arc<dyn RecordStore>,
        stats_repository: Arc<dyn StatsRepository>,
        event_bus: EventBus,
    ) -> Self {
        // All three consumers of side resolution share one configuration, so
        // the incremental, replay and group paths place players identically.
        let resolver = SideResolver::default();
        let updater = Arc::new(
            StatsUpdater::new(record_store.clone(), stats_repository.clone())
                .with_resolver(resolver.clone()),
        );
        let recalculation = Arc::new(
            RecalculationEngine::new(record_store.clone(), stats_repository.clone())
                .with_resolver(resolver.clone()),
        );
        let group_aggregator = Arc::new(
            GroupAggregator::new(record_store.clone(), stats_repository.clone())
                .with_resolver(resolver),
        );
        Self {
            record_store,
            stats_repository,
            updater,
            recalculation,
            group_aggregator,
            event_bus,
            token_config: TokenConfig::new(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Duplicate(msg) => AppError::Conflict(msg),
            RecordError::NotFound(msg) => AppError::NotFound(msg),
            RecordError::Storage(msg) => AppError::StorageError(msg),
        }
    }
}

impl From<StatsError> for AppError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::RecordNotFound(msg) => AppError::NotFound(msg),
            StatsError::Records(inner) => inner.into(),
            StatsError::Storage(msg) => AppError::StorageError(msg),
            err @ StatsError::RecalculationIncomplete { .. } => {
                AppError::StorageError(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::StorageError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Storage error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
