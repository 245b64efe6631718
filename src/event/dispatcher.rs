use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::{
    bus::EventBus,
    events::RecordEvent,
    handler::{EventError, RecordEventHandler},
};

/// Routes events from the bus to registered handlers.
///
/// Handlers run in their own tasks with a timeout and retry budget, so one
/// slow or failing handler never blocks the others.
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn RecordEventHandler>>,
    event_bus: EventBus,
    handler_timeout: Duration,
    max_retries: u32,
}

impl EventDispatcher {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            handlers: Vec::new(),
            event_bus,
            handler_timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    /// The handler starts receiving events once `start_listening` is called.
    pub fn add_handler(&mut self, handler: Arc<dyn RecordEventHandler>) {
        info!(handler_name = handler.name(), "Registering event handler");
        self.handlers.push(handler);
    }

    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Spawns the background task that runs until the bus is dropped.
    pub async fn start_listening(self) {
        let handlers = self.handlers;
        let mut receiver = self.event_bus.subscribe();
        let handler_timeout = self.handler_timeout;
        let max_retries = self.max_retries;

        info!(
            handler_count = handlers.len(),
            timeout_secs = handler_timeout.as_secs(),
            max_retries = max_retries,
            "Starting event dispatcher"
        );

        tokio::spawn(async move {
            while let Ok(event) = receiver.recv().await {
                debug!(
                    event_type = event.event_type(),
                    "Dispatching event to {} handlers",
                    handlers.len()
                );

                for handler in &handlers {
                    let event = event.clone();
                    let handler = handler.clone();
                    let timeout_duration = handler_timeout;

                    // One task per handler for isolation.
                    tokio::spawn(async move {
                        if let Err(e) =
                            Self::handle_with_retry(handler, event, timeout_duration, max_retries)
                                .await
                        {
                            error!(error = ?e, "Handler failed permanently");
                        }
                    });
                }
            }

            info!("Event dispatcher stopped listening");
        });
    }

    async fn handle_with_retry(
        handler: Arc<dyn RecordEventHandler>,
        event: RecordEvent,
        handler_timeout: Duration,
        max_retries: u32,
    ) -> Result<(), EventError> {
        let handler_name = handler.name();
        let event_type = event.event_type();

        for attempt in 0..=max_retries {
            match timeout(handler_timeout, handler.handle(&event)).await {
                Ok(Ok(())) => {
                    if attempt > 0 {
                        info!(
                            handler = handler_name,
                            event_type = event_type,
                            attempt = attempt + 1,
                            "Handler succeeded after retry"
                        );
                    }
                    return Ok(());
                }
                Ok(Err(e)) if e.is_retryable() && attempt < max_retries => {
                    warn!(
                        handler = handler_name,
                        event_type = event_type,
                        attempt = attempt + 1,
                        error = ?e,
                        "Handler failed, will retry"
                    );

                    // Exponential backoff
                    let delay = Duration::from_millis(100 * 2_u64.pow(attempt));
                    tokio::time::sleep(delay).await;
                }
                Ok(Err(e)) => {
                    error!(
                        handler = handler_name,
                        event_type = event_type,
                        attempt = attempt + 1,
                        error = ?e,
                        "Handler failed permanently"
                    );
                    return Err(e);
                }
                Err(_timeout) => {
                    if attempt < max_retries {
                        warn!(
                            handler = handler_name,
                            event_type = event_type,
                            attempt = attempt + 1,
                            "Handler timed out, will retry"
                        );
                        continue;
                    } else {
                        error!(
                            handler = handler_name,
                            event_type = event_type,
                            "Handler timed out permanently"
                        );
                        return Err(EventError::Timeout);
                    }
                }
            }
        }

        unreachable!("Loop should have returned by now");
    }
}
