use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jasstat::api;
use jasstat::event::{EventBus, EventDispatcher};
use jasstat::records::InMemoryRecordStore;
use jasstat::shared::AppState;
use jasstat::stats::{InMemoryStatsRepository, StatsRecordSubscriber};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jasstat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Jass statistics service");

    // In-memory stores for development; swap in persistent implementations
    // behind the same traits for production.
    let record_store = Arc::new(InMemoryRecordStore::new());
    let stats_repository = Arc::new(InMemoryStatsRepository::new());
    let event_bus = EventBus::with_default_capacity();

    let app_state = AppState::new(record_store.clone(), stats_repository, event_bus.clone());

    // Wire record events to the statistics updater.
    let subscriber = Arc::new(StatsRecordSubscriber::new(
        app_state.updater.clone(),
        app_state.group_aggregator.clone(),
        record_store,
        event_bus.clone(),
    ));
    let mut dispatcher = EventDispatcher::new(event_bus);
    dispatcher.add_handler(subscriber);
    dispatcher.start_listening().await;

    let app = api::router(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
