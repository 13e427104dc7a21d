//! services/api/src/adapters/pg_store.rs
//!
//! This module contains the PostgreSQL adapter, which is the concrete implementation
//! of the `TableStore` port from the `core` crate. Every entity lives in a single
//! `saga_entities` table keyed by (partition_key, row_key) with a JSONB property bag.

use async_trait::async_trait;
use saga_core::keys::RowKeyRange;
use saga_core::ports::{PortError, PortResult, TableEntity, TableStore, UpdateMode};
use serde_json::{Map, Value};
use sqlx::{types::Json, FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A table store adapter that implements the `TableStore` port on PostgreSQL.
#[derive(Clone)]
pub struct PgTableStore {
    pool: PgPool,
}

impl PgTableStore {
    /// Creates a new `PgTableStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Struct
//=========================================================================================

#[derive(FromRow)]
struct EntityRecord {
    partition_key: String,
    row_key: String,
    properties: Json<Map<String, Value>>,
}
impl EntityRecord {
    fn to_domain(self) -> TableEntity {
        TableEntity {
            partition_key: self.partition_key,
            row_key: self.row_key,
            properties: self.properties.0,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `TableStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl TableStore for PgTableStore {
    async fn get_entity(&self, partition_key: &str, row_key: &str) -> PortResult<TableEntity> {
        let record = sqlx::query_as::<_, EntityRecord>(
            "SELECT partition_key, row_key, properties FROM saga_entities \
             WHERE partition_key = $1 AND row_key = $2",
        )
        .bind(partition_key)
        .bind(row_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        record
            .map(EntityRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(row_key.to_string()))
    }

    async fn list_entities(
        &self,
        partition_key: &str,
        range: &RowKeyRange,
    ) -> PortResult<Vec<TableEntity>> {
        let records = sqlx::query_as::<_, EntityRecord>(
            "SELECT partition_key, row_key, properties FROM saga_entities \
             WHERE partition_key = $1 AND row_key >= $2 AND row_key < $3 \
             ORDER BY row_key ASC",
        )
        .bind(partition_key)
        .bind(&range.start)
        .bind(&range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(EntityRecord::to_domain).collect())
    }

    async fn create_entity(&self, entity: TableEntity) -> PortResult<()> {
        let result = sqlx::query(
            "INSERT INTO saga_entities (partition_key, row_key, properties) VALUES ($1, $2, $3) \
             ON CONFLICT (partition_key, row_key) DO NOTHING",
        )
        .bind(&entity.partition_key)
        .bind(&entity.row_key)
        .bind(Json(&entity.properties))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::Conflict(entity.row_key));
        }
        Ok(())
    }

    async fn update_entity(&self, entity: TableEntity, mode: UpdateMode) -> PortResult<()> {
        let statement = match mode {
            UpdateMode::Merge => {
                "UPDATE saga_entities SET properties = properties || $3 \
                 WHERE partition_key = $1 AND row_key = $2"
            }
            UpdateMode::Replace => {
                "UPDATE saga_entities SET properties = $3 \
                 WHERE partition_key = $1 AND row_key = $2"
            }
        };

        let result = sqlx::query(statement)
            .bind(&entity.partition_key)
            .bind(&entity.row_key)
            .bind(Json(&entity.properties))
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(entity.row_key));
        }
        Ok(())
    }

    async fn delete_entity(&self, partition_key: &str, row_key: &str) -> PortResult<()> {
        let result = sqlx::query(
            "DELETE FROM saga_entities WHERE partition_key = $1 AND row_key = $2",
        )
        .bind(partition_key)
        .bind(row_key)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(row_key.to_string()));
        }
        Ok(())
    }
}
