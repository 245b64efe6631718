// Event-driven plumbing between the record store and its consumers.

pub use bus::EventBus;
pub use dispatcher::EventDispatcher;
pub use events::RecordEvent;
pub use handler::{EventError, RecordEventHandler};

mod bus;
mod dispatcher;
mod events;
mod handler;
