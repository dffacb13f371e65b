use crate::prelude::*;

use crate::base::record::{RecordId, TransferRecord};
use crate::base::session::{self, SessionId};
use crate::blobs::BlobStore;
use crate::blobs::local::LocalBlobStore;
use crate::blobs::memory::MemoryBlobStore;
use crate::blobs::s3::S3BlobStore;
use crate::execution::retrieval::{ExpiryPolicy, FetchResult, RetrievalService};
use crate::execution::stats::UploadStats;
use crate::execution::upload::{BatchReport, UploadCoordinator, UploadItem, UploadObserver};
use crate::persistence::{self, TransferStore};
use crate::settings::{BlobSpec, Settings};
use crate::utils::slow_warn::warn_if_slow;
use tokio_util::sync::CancellationToken;

/// Entry point for embedders: one relay per process, shared behind an `Arc`.
///
/// Holds no per-session state. Every call names its session explicitly.
pub struct Relay {
    store: Arc<dyn TransferStore>,
    uploads: UploadCoordinator,
    retrieval: RetrievalService,
    session_code_length: usize,
    share_base_url: Option<String>,
    expiry: ExpiryPolicy,
    slow_call_threshold: Duration,
}

impl Relay {
    /// Build a relay over already-constructed backends with default settings.
    pub fn new(store: Arc<dyn TransferStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_settings(store, blobs, &Settings::default())
    }

    pub fn with_settings(
        store: Arc<dyn TransferStore>,
        blobs: Arc<dyn BlobStore>,
        settings: &Settings,
    ) -> Self {
        let threshold = settings.slow_call_warn_threshold();
        Self {
            uploads: UploadCoordinator::new(store.clone(), blobs.clone(), &settings.device_name)
                .with_concurrency(settings.upload_concurrency)
                .with_slow_call_threshold(threshold),
            retrieval: RetrievalService::new(store.clone(), blobs)
                .with_slow_call_threshold(threshold),
            store,
            session_code_length: settings.session_code_length,
            share_base_url: settings.share_base_url.clone(),
            expiry: ExpiryPolicy::new(settings.expiry_window()),
            slow_call_threshold: threshold,
        }
    }

    /// Connect the configured backends, run store setup, and build a relay.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let store = persistence::connect(&settings.store).await?;
        let blobs: Arc<dyn BlobStore> = match &settings.blobs {
            BlobSpec::Local { root } => Arc::new(LocalBlobStore::new(root)?),
            BlobSpec::S3(spec) => Arc::new(S3BlobStore::connect(spec).await?),
            BlobSpec::Memory => Arc::new(MemoryBlobStore::default()),
        };
        info!(device_name = %settings.device_name, "relay ready");
        Ok(Self::with_settings(store, blobs, settings))
    }

    pub fn generate_session(&self) -> SessionId {
        SessionId::generate_with_len(self.session_code_length)
    }

    pub async fn send_files(
        &self,
        files: Vec<UploadItem>,
        session: &SessionId,
    ) -> Result<BatchReport> {
        self.send_files_with(files, session, &(), &CancellationToken::new())
            .await
    }

    /// [`Relay::send_files`] with progress reporting and cancellation.
    pub async fn send_files_with(
        &self,
        files: Vec<UploadItem>,
        session: &SessionId,
        observer: &dyn UploadObserver,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        self.uploads.send(session, files, observer, cancel).await
    }

    pub async fn send_text(&self, text: &str, session: &SessionId) -> Result<TransferRecord> {
        self.uploads.send_text(session, text).await
    }

    /// Fetch by code as typed, scanned, or pasted from a share link.
    pub async fn fetch_session(&self, code: &str) -> Result<FetchResult> {
        let session = SessionId::from_scanned(code)?;
        self.retrieval.fetch_session(&session, Utc::now()).await
    }

    /// Like [`Relay::fetch_session`] but drops records older than the
    /// configured expiry window.
    pub async fn fetch_active(&self, code: &str) -> Result<FetchResult> {
        let session = SessionId::from_scanned(code)?;
        let now = Utc::now();
        let mut records = self.retrieval.query(&session).await?;
        self.expiry.retain_active(&mut records, now);
        Ok(FetchResult {
            groups: crate::execution::format::group_by_date(records, now),
            session_id: session,
            fetched_at: now,
        })
    }

    /// Remove a record. The blob it references is not reclaimed.
    pub async fn delete_transfer(&self, id: &RecordId) -> Result<()> {
        warn_if_slow(
            || format!("delete record `{id}`"),
            self.slow_call_threshold,
            self.store.delete(id),
        )
        .await?;
        info!(record_id = %id, "transfer deleted");
        Ok(())
    }

    pub async fn download(&self, record: &TransferRecord) -> Result<Bytes> {
        self.retrieval.download(record).await
    }

    /// Link for a QR code or message. Returns `None` when no base URL is
    /// configured.
    pub fn share_link(&self, session: &SessionId) -> Option<String> {
        self.share_base_url
            .as_deref()
            .map(|base| session::share_link(base, session))
    }

    pub fn expiry(&self) -> &ExpiryPolicy {
        &self.expiry
    }

    pub fn upload_stats(&self) -> &Arc<UploadStats> {
        self.uploads.stats()
    }
}
