pub mod base;
pub mod blobs;
pub mod error;
pub mod execution;
pub mod persistence;
mod prelude;
pub mod relay;
pub mod settings;
pub mod utils;

pub use base::kind::{TransferKind, classify};
pub use base::record::{BlobRef, NewTransferRecord, RecordId, TransferPayload, TransferRecord};
pub use base::session::SessionId;
pub use blobs::BlobStore;
pub use error::{Error, Result};
pub use execution::format::{DateBucket, DateGroup, DecoratedRecord};
pub use execution::retrieval::{ExpiryPolicy, FetchResult};
pub use execution::upload::{BatchReport, ItemOutcome, UploadItem, UploadObserver, UploadReport};
pub use persistence::TransferStore;
pub use relay::Relay;
pub use settings::Settings;
pub use tokio_util::sync::CancellationToken;

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
