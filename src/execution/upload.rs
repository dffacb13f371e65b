use crate::prelude::*;

use crate::base::kind::classify;
use crate::base::record::{NewTransferRecord, TransferRecord};
use crate::base::session::SessionId;
use crate::blobs::BlobStore;
use crate::execution::stats::UploadStats;
use crate::persistence::TransferStore;
use crate::utils::keys::transfer_blob_key;
use crate::utils::slow_warn::warn_if_slow;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

/// One file handed to [`UploadCoordinator::send`].
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub data: Bytes,
    pub file_name: String,
    pub mime_type: Option<String>,
}

impl UploadItem {
    pub fn new(data: impl Into<Bytes>, file_name: impl Into<String>, mime_type: Option<&str>) -> Self {
        Self {
            data: data.into(),
            file_name: file_name.into(),
            mime_type: mime_type.map(str::to_owned),
        }
    }
}

#[derive(Debug)]
pub enum ItemOutcome {
    Stored(TransferRecord),
    Failed(Error),
    /// The batch was cancelled before this item was attempted.
    Cancelled,
}

impl ItemOutcome {
    pub fn record(&self) -> Option<&TransferRecord> {
        match self {
            ItemOutcome::Stored(record) => Some(record),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            ItemOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Receives per-item progress. Both methods default to doing nothing.
pub trait UploadObserver: Send + Sync {
    fn on_item_started(&self, _index: usize, _file_name: &str) {}

    fn on_item_finished(&self, _index: usize, _outcome: &ItemOutcome) {}
}

impl UploadObserver for () {}

#[derive(Debug)]
pub struct UploadReport {
    pub index: usize,
    pub file_name: String,
    pub outcome: ItemOutcome,
}

/// Outcome of a whole batch, one report per input item in input order.
#[derive(Debug)]
pub struct BatchReport {
    pub session_id: SessionId,
    pub items: Vec<UploadReport>,
}

impl BatchReport {
    pub fn num_succeeded(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Stored(_)))
    }

    pub fn num_failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed(_)))
    }

    pub fn num_cancelled(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Cancelled))
    }

    /// Every item was stored.
    pub fn is_complete(&self) -> bool {
        self.num_succeeded() == self.items.len()
    }

    /// Some items were stored and some were not.
    pub fn is_partial(&self) -> bool {
        let succeeded = self.num_succeeded();
        succeeded > 0 && succeeded < self.items.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &TransferRecord> {
        self.items.iter().filter_map(|item| item.outcome.record())
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.outcome)).count()
    }
}

/// Writes file bytes to the blob store and records to the transfer store.
pub struct UploadCoordinator {
    store: Arc<dyn TransferStore>,
    blobs: Arc<dyn BlobStore>,
    device_name: String,
    concurrency: usize,
    slow_call_threshold: Duration,
    stats: Arc<UploadStats>,
}

impl UploadCoordinator {
    pub fn new(
        store: Arc<dyn TransferStore>,
        blobs: Arc<dyn BlobStore>,
        device_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            blobs,
            device_name: device_name.into(),
            concurrency: 1,
            slow_call_threshold: Duration::from_secs(10),
            stats: Arc::new(UploadStats::default()),
        }
    }

    /// Number of items in flight at once. Values below 1 mean sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_slow_call_threshold(mut self, threshold: Duration) -> Self {
        self.slow_call_threshold = threshold;
        self
    }

    pub fn stats(&self) -> &Arc<UploadStats> {
        &self.stats
    }

    /// Upload `items` into `session`.
    ///
    /// Items are independent: a failure is reported for that item only and
    /// earlier successes stay stored. `cancel` is checked before each item
    /// starts; an item already underway always runs to completion.
    #[instrument(skip_all, fields(session = %session, items = items.len()))]
    pub async fn send(
        &self,
        session: &SessionId,
        items: Vec<UploadItem>,
        observer: &dyn UploadObserver,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        if items.is_empty() {
            input_bail!("no files selected");
        }
        let reports: Vec<UploadReport> = futures::stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| self.process_item(session, index, item, observer, cancel))
            .buffered(self.concurrency)
            .collect()
            .await;
        let report = BatchReport {
            session_id: session.clone(),
            items: reports,
        };
        info!(
            succeeded = report.num_succeeded(),
            failed = report.num_failed(),
            cancelled = report.num_cancelled(),
            "upload batch finished"
        );
        Ok(report)
    }

    async fn process_item(
        &self,
        session: &SessionId,
        index: usize,
        item: UploadItem,
        observer: &dyn UploadObserver,
        cancel: &CancellationToken,
    ) -> UploadReport {
        let outcome = if cancel.is_cancelled() {
            self.stats.num_cancelled.inc(1);
            ItemOutcome::Cancelled
        } else {
            observer.on_item_started(index, &item.file_name);
            self.stats.start_processing();
            let result = self.store_item(session, &item).await;
            self.stats.finish_processing();
            match result {
                Ok(record) => ItemOutcome::Stored(record),
                Err(err) => {
                    warn!(file_name = %item.file_name, error = %err, "upload item failed");
                    self.stats.num_failed.inc(1);
                    ItemOutcome::Failed(err)
                }
            }
        };
        observer.on_item_finished(index, &outcome);
        UploadReport {
            index,
            file_name: item.file_name,
            outcome,
        }
    }

    async fn store_item(&self, session: &SessionId, item: &UploadItem) -> Result<TransferRecord> {
        if item.file_name.is_empty() {
            input_bail!("file name is empty");
        }
        if item.data.is_empty() {
            input_bail!("file `{}` is empty", item.file_name);
        }
        let kind = classify(item.mime_type.as_deref());
        let key = transfer_blob_key(session, &item.file_name);
        let file_size = item.data.len() as u64;

        let blob_ref = warn_if_slow(
            || format!("blob put `{key}`"),
            self.slow_call_threshold,
            self.blobs
                .put(&key, item.data.clone(), item.mime_type.as_deref()),
        )
        .await?;

        // A failed insert leaves the blob unreferenced; nothing reclaims it.
        let record = warn_if_slow(
            || format!("insert record for `{}`", item.file_name),
            self.slow_call_threshold,
            self.store.insert(NewTransferRecord::file(
                session.clone(),
                kind,
                item.file_name.clone(),
                file_size,
                blob_ref,
                self.device_name.clone(),
            )),
        )
        .await?;

        self.stats.record_stored(file_size);
        info!(
            session = %session,
            file_name = %item.file_name,
            file_size,
            kind = %kind,
            record_id = %record.id,
            "file stored"
        );
        Ok(record)
    }

    /// Store a text snippet. Whitespace-only content is rejected; otherwise
    /// the content is kept verbatim.
    #[instrument(skip_all, fields(session = %session))]
    pub async fn send_text(&self, session: &SessionId, content: &str) -> Result<TransferRecord> {
        if content.trim().is_empty() {
            input_bail!("text is empty");
        }
        let record = warn_if_slow(
            || "insert text record".to_string(),
            self.slow_call_threshold,
            self.store.insert(NewTransferRecord::text(
                session.clone(),
                content.to_string(),
                self.device_name.clone(),
            )),
        )
        .await?;
        self.stats.num_texts.inc(1);
        info!(record_id = %record.id, len = content.len(), "text stored");
        Ok(record)
    }
}
