use crate::prelude::*;

use crate::base::record::{NewTransferRecord, RecordId, TransferRecord};
use crate::base::session::SessionId;
use crate::settings::StoreSpec;

pub mod memory;
pub mod postgres;
pub mod surreal;

pub const TRANSFERS_TABLE: &str = "transfers";

/// Durable, queryable collection of transfer records.
///
/// Every backend assigns `id` and `created_at` at insert time and returns
/// records for a session newest first.
#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Create tables and indexes if missing. Idempotent.
    async fn setup(&self) -> Result<()>;

    async fn insert(&self, record: NewTransferRecord) -> Result<TransferRecord>;

    /// Records whose session matches exactly, ordered by `created_at`
    /// descending. Unknown sessions yield an empty vector.
    async fn query_by_session(&self, session_id: &SessionId) -> Result<Vec<TransferRecord>>;

    /// Remove one record. The referenced blob, if any, is left in place.
    async fn delete(&self, id: &RecordId) -> Result<()>;
}

/// Connect the store named by `spec` and run its setup.
pub async fn connect(spec: &StoreSpec) -> Result<Arc<dyn TransferStore>> {
    let store: Arc<dyn TransferStore> = match spec {
        StoreSpec::Postgres(db) => Arc::new(postgres::PostgresTransferStore::connect(db).await?),
        StoreSpec::SurrealDB(db) => Arc::new(surreal::SurrealTransferStore::connect(db).await?),
        StoreSpec::Memory => Arc::new(memory::MemoryTransferStore::default()),
    };
    store.setup().await?;
    Ok(store)
}

/// Behavior every backend must share. Backend test modules call these
/// against a fresh, empty store.
#[cfg(test)]
pub(crate) mod conformance {
    use super::*;
    use crate::base::kind::TransferKind;
    use crate::base::record::BlobRef;

    fn text(session: &SessionId, content: &str) -> NewTransferRecord {
        NewTransferRecord::text(session.clone(), content.to_string(), "linux".to_string())
    }

    pub async fn insert_assigns_id_and_time(store: &dyn TransferStore) {
        let session = SessionId::generate();
        let before = Utc::now() - chrono::TimeDelta::seconds(5);
        let record = store
            .insert(NewTransferRecord::file(
                session.clone(),
                TransferKind::Photo,
                "cat.jpg".to_string(),
                2048,
                BlobRef("mem://transfers/cat.jpg".to_string()),
                "android".to_string(),
            ))
            .await
            .unwrap();
        assert!(!record.id.0.is_empty());
        assert!(record.created_at >= before);
        assert_eq!(record.session_id, session);
        assert_eq!(record.file_name(), Some("cat.jpg"));
        assert_eq!(record.file_size(), Some(2048));

        let listed = store.query_by_session(&session).await.unwrap();
        assert_eq!(listed, vec![record]);
    }

    pub async fn query_is_newest_first_and_scoped(store: &dyn TransferStore) {
        let session = SessionId::generate();
        let other = SessionId::generate();
        let first = store.insert(text(&session, "first")).await.unwrap();
        store.insert(text(&other, "elsewhere")).await.unwrap();
        let second = store.insert(text(&session, "second")).await.unwrap();

        let listed = store.query_by_session(&session).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(listed.iter().all(|r| r.session_id == session));
    }

    pub async fn unknown_session_is_empty(store: &dyn TransferStore) {
        let listed = store
            .query_by_session(&SessionId::parse("ZZZZZZ").unwrap())
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    pub async fn invalid_record_is_rejected(store: &dyn TransferStore) {
        let session = SessionId::generate();
        let mut bad = text(&session, "hi");
        bad.kind = TransferKind::Video;
        assert!(matches!(store.insert(bad).await, Err(Error::InvalidRecord(_))));
        assert!(store.query_by_session(&session).await.unwrap().is_empty());
    }

    pub async fn delete_removes_only_target(store: &dyn TransferStore) {
        let session = SessionId::generate();
        let keep = store.insert(text(&session, "keep")).await.unwrap();
        let gone = store.insert(text(&session, "gone")).await.unwrap();

        store.delete(&gone.id).await.unwrap();
        assert_eq!(store.query_by_session(&session).await.unwrap(), vec![keep]);
        assert!(matches!(store.delete(&gone.id).await, Err(Error::NotFound(_))));
    }

    pub async fn setup_is_idempotent(store: &dyn TransferStore) {
        store.setup().await.unwrap();
        store.setup().await.unwrap();
    }

    pub async fn run_all(store: &dyn TransferStore) {
        setup_is_idempotent(store).await;
        insert_assigns_id_and_time(store).await;
        query_is_newest_first_and_scoped(store).await;
        unknown_session_is_empty(store).await;
        invalid_record_is_rejected(store).await;
        delete_removes_only_target(store).await;
    }
}
