pub mod models;
pub mod repository;

pub use models::*;
pub use repository::{InMemoryRecordStore, RecordStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),
}
