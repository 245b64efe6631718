use thiserror::Error;

use crate::records::RecordError;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Record store error: {0}")]
    Records(#[from] RecordError),

    #[error("Recalculation incomplete: {failed} of {total} players failed")]
    RecalculationIncomplete { failed: usize, total: usize },
}
