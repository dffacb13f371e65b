use crate::prelude::*;

use crate::base::record::{TransferPayload, TransferRecord};
use crate::base::session::SessionId;
use crate::blobs::BlobStore;
use crate::execution::format::{DateGroup, group_by_date};
use crate::persistence::TransferStore;
use crate::utils::slow_warn::warn_if_slow;

pub const DEFAULT_EXPIRY: chrono::TimeDelta = chrono::TimeDelta::hours(24);

/// Records of one session, decorated and grouped for display.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub session_id: SessionId,
    pub fetched_at: DateTime<Utc>,
    pub groups: Vec<DateGroup>,
}

impl FetchResult {
    /// All records, newest first.
    pub fn records(&self) -> impl Iterator<Item = &TransferRecord> {
        self.groups
            .iter()
            .flat_map(|g| g.records.iter().map(|d| &d.record))
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Soft expiry. Records are never deleted for age; callers that want to
/// hide stale records filter with this.
#[derive(Debug, Clone, Copy)]
pub struct ExpiryPolicy {
    pub window: chrono::TimeDelta,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_EXPIRY,
        }
    }
}

impl ExpiryPolicy {
    pub fn new(window: chrono::TimeDelta) -> Self {
        Self { window }
    }

    pub fn is_expired(&self, record: &TransferRecord, now: DateTime<Utc>) -> bool {
        now - record.created_at > self.window
    }

    pub fn retain_active(&self, records: &mut Vec<TransferRecord>, now: DateTime<Utc>) {
        records.retain(|r| !self.is_expired(r, now));
    }
}

pub struct RetrievalService {
    store: Arc<dyn TransferStore>,
    blobs: Arc<dyn BlobStore>,
    slow_call_threshold: Duration,
}

impl RetrievalService {
    pub fn new(store: Arc<dyn TransferStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            blobs,
            slow_call_threshold: Duration::from_secs(10),
        }
    }

    pub fn with_slow_call_threshold(mut self, threshold: Duration) -> Self {
        self.slow_call_threshold = threshold;
        self
    }

    /// Look up a typed or scanned code. Invalid codes fail before the store
    /// is touched; unknown sessions come back empty.
    pub async fn fetch(&self, code: &str) -> Result<FetchResult> {
        let session = SessionId::parse(code)?;
        self.fetch_session(&session, Utc::now()).await
    }

    #[instrument(skip_all, fields(session = %session))]
    pub async fn fetch_session(
        &self,
        session: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<FetchResult> {
        let records = self.query(session).await?;
        debug!(count = records.len(), "session fetched");
        Ok(FetchResult {
            session_id: session.clone(),
            fetched_at: now,
            groups: group_by_date(records, now),
        })
    }

    /// Raw records, newest first, without decoration.
    pub async fn query(&self, session: &SessionId) -> Result<Vec<TransferRecord>> {
        warn_if_slow(
            || format!("query session `{session}`"),
            self.slow_call_threshold,
            self.store.query_by_session(session),
        )
        .await
    }

    /// Content of a record: blob bytes for files, UTF-8 bytes for text.
    pub async fn download(&self, record: &TransferRecord) -> Result<Bytes> {
        match &record.payload {
            TransferPayload::Text { text_content } => Ok(Bytes::from(text_content.clone())),
            TransferPayload::File { blob_ref, .. } => {
                warn_if_slow(
                    || format!("blob get `{blob_ref}`"),
                    self.slow_call_threshold,
                    self.blobs.get(blob_ref),
                )
                .await
            }
        }
    }
}
