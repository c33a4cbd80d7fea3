use crate::errors::CqrsError;
use crate::es::storage::{EventStoreStorage, EventStream};
use crate::event::EventEnvelope;
use crate::metadata::{Metadata, Version};
use crate::snapshot::Snapshot;
use crate::Aggregate;
use deadpool_postgres::{Object, Pool};
use futures::stream;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

fn map_pg_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> CqrsError {
    CqrsError::StoreFailure(e.to_string())
}

fn map_pool_error(e: deadpool_postgres::PoolError) -> CqrsError {
    CqrsError::StoreFailure(e.to_string())
}

/// Relational event store backend (spec §4.D): one journal table and one
/// snapshot table per aggregate type, named `{prefix}_journal` /
/// `{prefix}_snapshots`.
///
/// Holds a `deadpool_postgres::Pool` rather than a single shared client:
/// each call that opens a session (`start_session`) checks out its own
/// physical connection, so concurrent `save()` calls never interleave
/// `BEGIN`/`COMMIT` on the same connection-scoped transaction (spec §5,
/// "each `Save`/`GetById` uses its own short-lived session").
#[derive(Clone, Debug)]
pub struct PostgresPersist<A>
where
    A: Aggregate,
{
    pool: Pool,
    snapshot_table_name: String,
    journal_table_name: String,
    _phantom: std::marker::PhantomData<A>,
}

impl<A> PostgresPersist<A>
where
    A: Aggregate,
{
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            snapshot_table_name: format!("{}_snapshots", A::PREFIX),
            journal_table_name: format!("{}_journal", A::PREFIX),
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn snapshot_table_name(&self) -> &str {
        &self.snapshot_table_name
    }

    pub fn journal_table_name(&self) -> &str {
        &self.journal_table_name
    }

    /// Creates the journal/snapshot tables if they don't exist. Idempotent;
    /// called once at startup, not on the hot path.
    pub async fn ensure_schema(&self) -> Result<(), CqrsError> {
        let client = self.pool.get().await.map_err(map_pool_error)?;
        let journal_sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                event_id TEXT PRIMARY KEY,
                aggregate_id TEXT NOT NULL,
                version BIGINT NOT NULL,
                schema TEXT NOT NULL,
                payload JSONB NOT NULL,
                metadata JSONB NOT NULL,
                at TIMESTAMPTZ NOT NULL,
                UNIQUE (aggregate_id, version)
            )",
            self.journal_table_name
        );
        let snapshot_sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                aggregate_id TEXT PRIMARY KEY,
                data JSONB NOT NULL,
                version BIGINT NOT NULL,
                snapshotted_at TIMESTAMPTZ NOT NULL
            )",
            self.snapshot_table_name
        );
        client.batch_execute(&journal_sql).await.map_err(map_pg_error)?;
        client.batch_execute(&snapshot_sql).await.map_err(map_pg_error)?;
        Ok(())
    }
}

fn row_to_envelope<A: Aggregate>(row: &tokio_postgres::Row) -> Result<EventEnvelope<A>, CqrsError> {
    let payload: JsonValue = row.try_get("payload").map_err(map_pg_error)?;
    let metadata: JsonValue = row.try_get("metadata").map_err(map_pg_error)?;
    Ok(EventEnvelope::<A> {
        event_id: row.try_get::<_, String>("event_id").map_err(map_pg_error)?,
        aggregate_id: row.try_get::<_, String>("aggregate_id").map_err(map_pg_error)?,
        version: row.try_get::<_, i64>("version").map_err(map_pg_error)? as Version,
        payload: serde_json::from_value(payload)?,
        metadata: serde_json::from_value::<Metadata>(metadata)?,
        at: row.try_get("at").map_err(map_pg_error)?,
    })
}

#[async_trait::async_trait]
impl<A> EventStoreStorage<A> for PostgresPersist<A>
where
    A: Aggregate + Serialize + DeserializeOwned,
{
    // A checked-out connection held exclusively for the session's lifetime;
    // `BEGIN`/`COMMIT` on it can never interleave with another caller's.
    type Session = Object;

    async fn start_session(&self) -> Result<Self::Session, CqrsError> {
        let client = self.pool.get().await.map_err(map_pool_error)?;
        client.batch_execute("BEGIN").await.map_err(map_pg_error)?;
        Ok(client)
    }

    async fn commit_session(&self, session: Self::Session) -> Result<(), CqrsError> {
        session.batch_execute("COMMIT").await.map_err(map_pg_error)
    }

    async fn fetch_snapshot(&self, aggregate_id: &str) -> Result<Option<Snapshot<A>>, CqrsError> {
        let client = self.pool.get().await.map_err(map_pool_error)?;
        let sql = format!(
            "SELECT data, version, snapshotted_at FROM {} WHERE aggregate_id = $1",
            self.snapshot_table_name
        );
        let row_opt = client.query_opt(&sql, &[&aggregate_id]).await.map_err(map_pg_error)?;
        let Some(row) = row_opt else {
            return Ok(None);
        };
        let data: JsonValue = row.try_get("data").map_err(map_pg_error)?;
        let version: i64 = row.try_get("version").map_err(map_pg_error)?;
        Ok(Some(Snapshot {
            aggregate_id: aggregate_id.to_string(),
            state: serde_json::from_value(data)?,
            version: version as Version,
            snapshotted_at: row.try_get("snapshotted_at").map_err(map_pg_error)?,
        }))
    }

    async fn fetch_events_from_version(
        &self,
        aggregate_id: &str,
        version: Version,
    ) -> Result<EventStream<A>, CqrsError> {
        let client = self.pool.get().await.map_err(map_pool_error)?;
        let sql = format!(
            "SELECT event_id, aggregate_id, version, payload, metadata, at FROM {} \
             WHERE aggregate_id = $1 AND version > $2 ORDER BY version ASC",
            self.journal_table_name
        );
        let rows = client
            .query(&sql, &[&aggregate_id, &(version as i64)])
            .await
            .map_err(map_pg_error)?;
        let items: Vec<Result<EventEnvelope<A>, CqrsError>> =
            rows.iter().map(row_to_envelope::<A>).collect();
        Ok(Box::pin(stream::iter(items)))
    }

    async fn append_events(
        &self,
        session: &mut Self::Session,
        aggregate_id: &str,
        events: Vec<EventEnvelope<A>>,
        expected_version: Version,
    ) -> Result<(), CqrsError> {
        let current_sql = format!(
            "SELECT version FROM {} WHERE aggregate_id = $1 ORDER BY version DESC LIMIT 1",
            self.journal_table_name
        );
        let row_opt = session
            .query_opt(&current_sql, &[&aggregate_id])
            .await
            .map_err(map_pg_error)?;
        let current_version = row_opt
            .map(|row| row.try_get::<_, i64>("version"))
            .transpose()
            .map_err(map_pg_error)?
            .unwrap_or(0) as Version;
        if current_version != expected_version {
            return Err(CqrsError::Concurrency);
        }

        let insert_sql = format!(
            "INSERT INTO {} (event_id, aggregate_id, version, schema, payload, metadata, at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7)",
            self.journal_table_name
        );
        for event in &events {
            let payload = serde_json::to_value(&event.payload)?;
            let metadata = serde_json::to_value(&event.metadata)?;
            session
                .execute(
                    &insert_sql,
                    &[
                        &event.event_id,
                        &event.aggregate_id,
                        &(event.version as i64),
                        &event.payload.schema(),
                        &payload,
                        &metadata,
                        &event.at,
                    ],
                )
                .await
                .map_err(map_pg_error)?;
        }
        Ok(())
    }

    async fn save_snapshot(
        &self,
        session: &mut Self::Session,
        snapshot: Snapshot<A>,
    ) -> Result<(), CqrsError> {
        let data = serde_json::to_value(&snapshot.state)?;
        let sql = format!(
            "INSERT INTO {} (aggregate_id, data, version, snapshotted_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (aggregate_id) DO UPDATE SET \
             data = EXCLUDED.data, version = EXCLUDED.version, snapshotted_at = EXCLUDED.snapshotted_at",
            self.snapshot_table_name
        );
        session
            .execute(
                &sql,
                &[
                    &snapshot.aggregate_id,
                    &data,
                    &(snapshot.version as i64),
                    &snapshot.snapshotted_at,
                ],
            )
            .await
            .map_err(map_pg_error)?;
        Ok(())
    }
}
