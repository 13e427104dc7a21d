//! services/api/src/adapters/memory_store.rs
//!
//! An in-process implementation of the `TableStore` port backed by an ordered
//! map. Used when no database is configured and by the test-suite.

use async_trait::async_trait;
use saga_core::keys::RowKeyRange;
use saga_core::ports::{PortError, PortResult, TableEntity, TableStore, UpdateMode};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ops::Bound;
use tokio::sync::RwLock;

type RowId = (String, String);

/// A `TableStore` that keeps every row in memory, ordered by (partition, row) key.
#[derive(Default)]
pub struct InMemoryTableStore {
    rows: RwLock<BTreeMap<RowId, Map<String, Value>>>,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn row_id(partition_key: &str, row_key: &str) -> RowId {
    (partition_key.to_string(), row_key.to_string())
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn get_entity(&self, partition_key: &str, row_key: &str) -> PortResult<TableEntity> {
        let rows = self.rows.read().await;
        rows.get(&row_id(partition_key, row_key))
            .map(|properties| TableEntity {
                partition_key: partition_key.to_string(),
                row_key: row_key.to_string(),
                properties: properties.clone(),
            })
            .ok_or_else(|| PortError::NotFound(row_key.to_string()))
    }

    async fn list_entities(
        &self,
        partition_key: &str,
        range: &RowKeyRange,
    ) -> PortResult<Vec<TableEntity>> {
        let rows = self.rows.read().await;
        let bounds = (
            Bound::Included(row_id(partition_key, &range.start)),
            Bound::Excluded(row_id(partition_key, &range.end)),
        );
        Ok(rows
            .range(bounds)
            .map(|((partition_key, row_key), properties)| TableEntity {
                partition_key: partition_key.clone(),
                row_key: row_key.clone(),
                properties: properties.clone(),
            })
            .collect())
    }

    async fn create_entity(&self, entity: TableEntity) -> PortResult<()> {
        let mut rows = self.rows.write().await;
        let id = (entity.partition_key, entity.row_key);
        if rows.contains_key(&id) {
            return Err(PortError::Conflict(id.1));
        }
        rows.insert(id, entity.properties);
        Ok(())
    }

    async fn update_entity(&self, entity: TableEntity, mode: UpdateMode) -> PortResult<()> {
        let mut rows = self.rows.write().await;
        let stored = rows
            .get_mut(&row_id(&entity.partition_key, &entity.row_key))
            .ok_or_else(|| PortError::NotFound(entity.row_key.clone()))?;
        match mode {
            UpdateMode::Merge => stored.extend(entity.properties),
            UpdateMode::Replace => *stored = entity.properties,
        }
        Ok(())
    }

    async fn delete_entity(&self, partition_key: &str, row_key: &str) -> PortResult<()> {
        let mut rows = self.rows.write().await;
        rows.remove(&row_id(partition_key, row_key))
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(row_key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use saga_core::keys::prefix_range;

    fn entity(pk: &str, rk: &str, props: Value) -> TableEntity {
        TableEntity {
            partition_key: pk.into(),
            row_key: rk.into(),
            properties: props.as_object().cloned().unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn create_is_conditional() {
        let store = InMemoryTableStore::new();
        store
            .create_entity(entity("User_a", "BOOK_1", serde_json::json!({"title": "A"})))
            .await
            .unwrap();
        let second = store
            .create_entity(entity("User_a", "BOOK_1", serde_json::json!({"title": "B"})))
            .await;
        assert_matches!(second, Err(PortError::Conflict(_)));
        let stored = store.get_entity("User_a", "BOOK_1").await.unwrap();
        assert_eq!(stored.properties["title"], "A");
    }

    #[tokio::test]
    async fn merge_overlays_and_replace_overwrites() {
        let store = InMemoryTableStore::new();
        store
            .create_entity(entity("p", "PAGE_b_00001", serde_json::json!({"a": 1, "b": 2})))
            .await
            .unwrap();

        store
            .update_entity(entity("p", "PAGE_b_00001", serde_json::json!({"b": 3})), UpdateMode::Merge)
            .await
            .unwrap();
        let merged = store.get_entity("p", "PAGE_b_00001").await.unwrap();
        assert_eq!(merged.properties, *serde_json::json!({"a": 1, "b": 3}).as_object().unwrap());

        store
            .update_entity(entity("p", "PAGE_b_00001", serde_json::json!({"c": 4})), UpdateMode::Replace)
            .await
            .unwrap();
        let replaced = store.get_entity("p", "PAGE_b_00001").await.unwrap();
        assert_eq!(replaced.properties, *serde_json::json!({"c": 4}).as_object().unwrap());
    }

    #[tokio::test]
    async fn list_is_scoped_to_partition_and_prefix() {
        let store = InMemoryTableStore::new();
        for (pk, rk) in [
            ("User_a", "CHAR_b1_x"),
            ("User_a", "CHAR_b1_y"),
            ("User_a", "CHAR_b10_z"),
            ("User_a", "LOC_b1_x"),
            ("User_b", "CHAR_b1_w"),
        ] {
            store.create_entity(entity(pk, rk, serde_json::json!({}))).await.unwrap();
        }

        let rows = store
            .list_entities("User_a", &prefix_range("CHAR_b1_"))
            .await
            .unwrap();
        let keys: Vec<&str> = rows.iter().map(|r| r.row_key.as_str()).collect();
        assert_eq!(keys, vec!["CHAR_b1_x", "CHAR_b1_y"]);
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let store = InMemoryTableStore::new();
        assert_matches!(store.get_entity("p", "r").await, Err(PortError::NotFound(_)));
        assert_matches!(store.delete_entity("p", "r").await, Err(PortError::NotFound(_)));
        assert_matches!(
            store.update_entity(entity("p", "r", serde_json::json!({})), UpdateMode::Merge).await,
            Err(PortError::NotFound(_))
        );
    }
}
