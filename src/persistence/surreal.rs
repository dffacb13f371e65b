use crate::prelude::*;

use crate::base::record::{NewTransferRecord, RecordId, StoredColumns, TransferRecord};
use crate::base::session::SessionId;
use crate::persistence::{TRANSFERS_TABLE, TransferStore};
use crate::settings::SurrealDBConnectionSpec;
use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;

#[derive(Clone)]
pub struct SurrealTransferStore {
    db: Surreal<Any>,
}

/// Timestamps travel as epoch microseconds so rows decode without
/// depending on Surreal's datetime wire type.
#[derive(Debug, Deserialize)]
struct SurrealTransferRow {
    record_key: String,
    session_id: String,
    kind: String,
    file_name: Option<String>,
    file_size: Option<i64>,
    blob_ref: Option<String>,
    text_content: Option<String>,
    device_name: String,
    created_at_micros: i64,
}

impl TryFrom<SurrealTransferRow> for TransferRecord {
    type Error = Error;

    fn try_from(row: SurrealTransferRow) -> Result<Self> {
        let created_at = DateTime::<Utc>::from_timestamp_micros(row.created_at_micros)
            .ok_or_else(|| {
                Error::invalid_record(format!("record {} has invalid created_at", row.record_key))
            })?;
        TransferRecord::try_from(StoredColumns {
            id: row.record_key,
            session_id: row.session_id,
            kind: row.kind,
            file_name: row.file_name,
            file_size: row.file_size,
            blob_ref: row.blob_ref,
            text_content: row.text_content,
            device_name: row.device_name,
            created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DeletedRow {
    #[allow(dead_code)]
    session_id: String,
}

const PROJECTION: &str = "record::id(id) AS record_key, session_id, kind, file_name, file_size, \
     blob_ref, text_content, device_name, time::micros(created_at) AS created_at_micros";

impl SurrealTransferStore {
    pub fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    /// Connect over any engine the url names (`ws://`, `http://`, ...).
    pub async fn connect(spec: &SurrealDBConnectionSpec) -> Result<Self> {
        let db = any::connect(spec.url.as_str()).await?;
        if let Some(user) = &spec.user {
            db.signin(Root {
                username: user,
                password: spec.password.as_deref().unwrap_or_default(),
            })
            .await?;
        }
        db.use_ns(&spec.namespace).use_db(&spec.database).await?;
        info!(namespace = %spec.namespace, database = %spec.database, "connected to surrealdb");
        Ok(Self::new(db))
    }
}

#[async_trait]
impl TransferStore for SurrealTransferStore {
    async fn setup(&self) -> Result<()> {
        self.db
            .query(format!(
                "DEFINE TABLE IF NOT EXISTS {TRANSFERS_TABLE} SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS {TRANSFERS_TABLE}_session_idx
                    ON {TRANSFERS_TABLE} FIELDS session_id;"
            ))
            .await?
            .check()?;
        Ok(())
    }

    async fn insert(&self, record: NewTransferRecord) -> Result<TransferRecord> {
        record.validate()?;
        let columns = record.columns();
        let file_name = columns.file_name.map(str::to_owned);
        let file_size = columns.file_size;
        let blob_ref = columns.blob_ref.map(str::to_owned);
        let text_content = columns.text_content.map(str::to_owned);
        let mut res = self
            .db
            .query(format!(
                "LET $created = CREATE ONLY {TRANSFERS_TABLE} SET
                    session_id = $session_id,
                    kind = $kind,
                    file_name = $file_name,
                    file_size = $file_size,
                    blob_ref = $blob_ref,
                    text_content = $text_content,
                    device_name = $device_name,
                    created_at = time::now();
                 SELECT {PROJECTION} FROM ONLY $created.id;"
            ))
            .bind(("session_id", record.session_id.as_str().to_owned()))
            .bind(("kind", record.kind.as_str().to_owned()))
            .bind(("file_name", file_name))
            .bind(("file_size", file_size))
            .bind(("blob_ref", blob_ref))
            .bind(("text_content", text_content))
            .bind(("device_name", record.device_name.clone()))
            .await?;
        let row: Option<SurrealTransferRow> = res.take(1)?;
        let row = row.ok_or_else(|| Error::store("surrealdb returned no row for insert"))?;
        row.try_into()
    }

    async fn query_by_session(&self, session_id: &SessionId) -> Result<Vec<TransferRecord>> {
        let mut res = self
            .db
            .query(format!(
                "SELECT {PROJECTION} FROM {TRANSFERS_TABLE}
                    WHERE session_id = $session_id
                    ORDER BY created_at_micros DESC;"
            ))
            .bind(("session_id", session_id.as_str().to_owned()))
            .await?;
        let rows: Vec<SurrealTransferRow> = res.take(0)?;
        rows.into_iter().map(TransferRecord::try_from).collect()
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        let mut res = self
            .db
            .query(format!(
                "DELETE type::thing('{TRANSFERS_TABLE}', $key) RETURN BEFORE;"
            ))
            .bind(("key", id.0.clone()))
            .await?;
        let deleted: Vec<DeletedRow> = res.take(0)?;
        if deleted.is_empty() {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}
