use crate::prelude::*;

use crate::base::record::{NewTransferRecord, RecordId, StoredColumns, TransferRecord};
use crate::base::session::SessionId;
use crate::persistence::{TRANSFERS_TABLE, TransferStore};
use crate::settings::DatabaseConnectionSpec;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub struct PostgresTransferStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct TransferRow {
    id: uuid::Uuid,
    session_id: String,
    kind: String,
    file_name: Option<String>,
    file_size: Option<i64>,
    blob_ref: Option<String>,
    text_content: Option<String>,
    device_name: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransferRow> for TransferRecord {
    type Error = Error;

    fn try_from(row: TransferRow) -> Result<Self> {
        TransferRecord::try_from(StoredColumns {
            id: row.id.to_string(),
            session_id: row.session_id,
            kind: row.kind,
            file_name: row.file_name,
            file_size: row.file_size,
            blob_ref: row.blob_ref,
            text_content: row.text_content,
            device_name: row.device_name,
            created_at: row.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, session_id, kind, file_name, file_size, blob_ref, text_content, device_name, created_at";

impl PostgresTransferStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(spec: &DatabaseConnectionSpec) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(spec.max_connections)
            .connect(&spec.url)
            .await?;
        info!(max_connections = spec.max_connections, "connected to postgres");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl TransferStore for PostgresTransferStore {
    async fn setup(&self) -> Result<()> {
        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {TRANSFERS_TABLE} (
                seq BIGSERIAL NOT NULL,
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                session_id TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('photo', 'video', 'document', 'text')),
                file_name TEXT,
                file_size BIGINT,
                blob_ref TEXT,
                text_content TEXT,
                device_name TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),

                CHECK (
                    (kind = 'text' AND text_content IS NOT NULL
                        AND file_name IS NULL AND file_size IS NULL AND blob_ref IS NULL)
                    OR (kind <> 'text' AND text_content IS NULL
                        AND file_name IS NOT NULL AND file_size > 0 AND blob_ref IS NOT NULL)
                )
            );"
        );
        sqlx::query(&create_table).execute(&self.pool).await?;
        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS {TRANSFERS_TABLE}_session_created_idx
                ON {TRANSFERS_TABLE} (session_id, created_at DESC);"
        );
        sqlx::query(&create_index).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, record: NewTransferRecord) -> Result<TransferRecord> {
        record.validate()?;
        let columns = record.columns();
        let query_str = format!(
            "INSERT INTO {TRANSFERS_TABLE}
                (session_id, kind, file_name, file_size, blob_ref, text_content, device_name)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {SELECT_COLUMNS}"
        );
        let row: TransferRow = sqlx::query_as(&query_str)
            .bind(record.session_id.as_str())
            .bind(record.kind.as_str())
            .bind(columns.file_name)
            .bind(columns.file_size)
            .bind(columns.blob_ref)
            .bind(columns.text_content)
            .bind(&record.device_name)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn query_by_session(&self, session_id: &SessionId) -> Result<Vec<TransferRecord>> {
        let query_str = format!(
            "SELECT {SELECT_COLUMNS} FROM {TRANSFERS_TABLE}
                WHERE session_id = $1
                ORDER BY created_at DESC, seq DESC"
        );
        let rows: Vec<TransferRow> = sqlx::query_as(&query_str)
            .bind(session_id.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TransferRecord::try_from).collect()
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        // Ids this backend never issued cannot exist in it.
        let Ok(uuid) = uuid::Uuid::parse_str(&id.0) else {
            return Err(Error::NotFound(id.to_string()));
        };
        let query_str = format!("DELETE FROM {TRANSFERS_TABLE} WHERE id = $1");
        let result = sqlx::query(&query_str)
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}
