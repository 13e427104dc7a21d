//! crates/saga_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete table store and language-model provider.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::keys::RowKeyRange;
use crate::prompt::AssembledPrompt;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    Conflict(String),
    /// The language model reported a rate or quota limit.
    #[error("Model quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Maps a failed model call to a port error by inspecting its message:
/// anything mentioning `quota` or `429` is a quota signal.
pub fn classify_model_failure(message: impl Into<String>) -> PortError {
    let message = message.into();
    if message.to_lowercase().contains("quota") || message.contains("429") {
        PortError::QuotaExceeded(message)
    } else {
        PortError::Unexpected(message)
    }
}

//=========================================================================================
// Table Store Port
//=========================================================================================

/// One row of the table store: a partition key, a row key and a flat property bag.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEntity {
    pub partition_key: String,
    pub row_key: String,
    pub properties: Map<String, Value>,
}

/// How `update_entity` combines the new properties with the stored ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Overlay the given properties, keeping any others.
    Merge,
    /// Overwrite the whole property bag.
    Replace,
}

#[async_trait]
pub trait TableStore: Send + Sync {
    async fn get_entity(&self, partition_key: &str, row_key: &str) -> PortResult<TableEntity>;

    /// Lists the rows of a partition whose row key falls in `range`, ascending by row key.
    async fn list_entities(
        &self,
        partition_key: &str,
        range: &RowKeyRange,
    ) -> PortResult<Vec<TableEntity>>;

    /// Inserts a new row. Fails with `Conflict` if the key is already taken.
    async fn create_entity(&self, entity: TableEntity) -> PortResult<()>;

    /// Updates an existing row. Fails with `NotFound` if the key is absent.
    async fn update_entity(&self, entity: TableEntity, mode: UpdateMode) -> PortResult<()>;

    /// Deletes an existing row. Fails with `NotFound` if the key is absent.
    async fn delete_entity(&self, partition_key: &str, row_key: &str) -> PortResult<()>;
}

//=========================================================================================
// Language Model Port
//=========================================================================================

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Sends a system instruction and user message, returning the completion text.
    async fn generate(&self, prompt: &AssembledPrompt) -> PortResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn quota_and_429_messages_are_quota_signals() {
        assert_matches!(
            classify_model_failure("You exceeded your current quota"),
            PortError::QuotaExceeded(_)
        );
        assert_matches!(
            classify_model_failure("status 429 Too Many Requests"),
            PortError::QuotaExceeded(_)
        );
        assert_matches!(
            classify_model_failure("Quota limit hit"),
            PortError::QuotaExceeded(_)
        );
    }

    #[test]
    fn other_messages_are_unexpected() {
        assert_matches!(
            classify_model_failure("connection reset by peer"),
            PortError::Unexpected(msg) if msg == "connection reset by peer"
        );
    }
}
