use crate::cloudevents::{CloudEvent, Publisher};
use crate::errors::CqrsError;
use crate::schema;
use deadpool_postgres::Pool;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;

fn map_pg_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> CqrsError {
    CqrsError::StoreFailure(e.to_string())
}

fn map_pool_error(e: deadpool_postgres::PoolError) -> CqrsError {
    CqrsError::StoreFailure(e.to_string())
}

#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub id: String,
    pub payload: JsonValue,
}

/// Database-backed queue (spec §4.H/§4.I): one table per aggregate-type
/// queue, named after the schema's `{aggregate}` segment.
///
/// Holds a `deadpool_postgres::Pool` rather than a single shared client, so
/// `poll`'s `BEGIN ... FOR UPDATE SKIP LOCKED ... COMMIT` sequence runs on a
/// connection checked out just for that call — concurrent receivers never
/// interleave transactions on the same physical connection.
#[derive(Clone)]
pub struct PostgresQueue {
    pool: Pool,
}

impl PostgresQueue {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn table_name(queue_name: &str) -> String {
        format!("{queue_name}_queue")
    }

    /// Idempotently ensures the queue table exists (spec §4.H step 2).
    pub async fn ensure_queue(&self, queue_name: &str) -> Result<(), CqrsError> {
        let client = self.pool.get().await.map_err(map_pool_error)?;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                message_id TEXT PRIMARY KEY,
                payload JSONB NOT NULL,
                visible_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                delivery_count INT NOT NULL DEFAULT 0
            )",
            Self::table_name(queue_name)
        );
        client.batch_execute(&sql).await.map_err(map_pg_error)
    }

    pub async fn enqueue(&self, queue_name: &str, message_id: &str, payload: &JsonValue) -> Result<(), CqrsError> {
        let client = self.pool.get().await.map_err(map_pool_error)?;
        let sql = format!(
            "INSERT INTO {} (message_id, payload) VALUES ($1, $2) ON CONFLICT (message_id) DO NOTHING",
            Self::table_name(queue_name)
        );
        client.execute(&sql, &[&message_id, payload]).await.map_err(map_pg_error)?;
        Ok(())
    }

    /// Reads up to one visible message and hides it for `visibility_timeout`
    /// (spec §4.I step 1). Uses `FOR UPDATE SKIP LOCKED` so concurrent
    /// receivers on the same queue never contend on the same row, on a
    /// connection checked out exclusively for this call so the
    /// `BEGIN`/`COMMIT` pair can't interleave with another poll.
    pub async fn poll(
        &self,
        queue_name: &str,
        visibility_timeout: Duration,
    ) -> Result<Option<QueuedMessage>, CqrsError> {
        let client = self.pool.get().await.map_err(map_pool_error)?;
        let table = Self::table_name(queue_name);
        client.batch_execute("BEGIN").await.map_err(map_pg_error)?;
        let select_sql = format!(
            "SELECT message_id, payload FROM {table} \
             WHERE visible_at <= now() ORDER BY created_at ASC LIMIT 1 FOR UPDATE SKIP LOCKED"
        );
        let row_opt = client.query_opt(&select_sql, &[]).await.map_err(map_pg_error)?;
        let Some(row) = row_opt else {
            client.batch_execute("COMMIT").await.map_err(map_pg_error)?;
            return Ok(None);
        };
        let message_id: String = row.try_get("message_id").map_err(map_pg_error)?;
        let payload: JsonValue = row.try_get("payload").map_err(map_pg_error)?;

        let update_sql = format!(
            "UPDATE {table} SET visible_at = now() + $1::interval, delivery_count = delivery_count + 1 \
             WHERE message_id = $2"
        );
        let interval = format!("{} seconds", visibility_timeout.as_secs());
        client
            .execute(&update_sql, &[&interval, &message_id])
            .await
            .map_err(map_pg_error)?;
        client.batch_execute("COMMIT").await.map_err(map_pg_error)?;

        debug!(queue_name, message_id, "polled queued message");
        Ok(Some(QueuedMessage {
            id: message_id,
            payload,
        }))
    }

    /// Acks (deletes) a successfully processed message (spec §4.I step 4).
    pub async fn ack(&self, queue_name: &str, message_id: &str) -> Result<(), CqrsError> {
        let client = self.pool.get().await.map_err(map_pool_error)?;
        let sql = format!("DELETE FROM {} WHERE message_id = $1", Self::table_name(queue_name));
        client.execute(&sql, &[&message_id]).await.map_err(map_pg_error)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Publisher for PostgresQueue {
    async fn publish(&self, cloud_event: &CloudEvent) -> Result<(), CqrsError> {
        let dataschema = cloud_event
            .dataschema
            .as_deref()
            .ok_or_else(|| CqrsError::PublishError("cloud event has no dataschema".to_string()))?;
        let queue_name = schema::command_aggregate(dataschema)
            .map_err(|e| CqrsError::PublishError(e.to_string()))?;
        self.ensure_queue(&queue_name).await.map_err(|e| CqrsError::PublishError(e.to_string()))?;
        let payload = serde_json::to_value(cloud_event).map_err(|e| CqrsError::PublishError(e.to_string()))?;
        self.enqueue(&queue_name, &cloud_event.id, &payload)
            .await
            .map_err(|e| CqrsError::PublishError(e.to_string()))?;
        Ok(())
    }
}
