use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use carrier_pigeon::blobs::local::LocalBlobStore;
use carrier_pigeon::blobs::memory::MemoryBlobStore;
use carrier_pigeon::persistence::memory::MemoryTransferStore;
use carrier_pigeon::settings::{BlobSpec, StoreSpec};
use carrier_pigeon::{
    BlobRef, BlobStore, Error, ItemOutcome, Relay, Result, SessionId, Settings, TransferKind,
    UploadItem,
};

/// Fails exactly the second `put` it sees.
#[derive(Default)]
struct FailSecondPut {
    inner: MemoryBlobStore,
    calls: AtomicUsize,
}

#[async_trait]
impl BlobStore for FailSecondPut {
    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<BlobRef> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
            return Err(Error::blob("permission denied"));
        }
        self.inner.put(key, data, content_type).await
    }

    async fn get(&self, blob_ref: &BlobRef) -> Result<Bytes> {
        self.inner.get(blob_ref).await
    }
}

fn memory_relay() -> Relay {
    Relay::new(
        Arc::new(MemoryTransferStore::default()),
        Arc::new(MemoryBlobStore::default()),
    )
}

#[tokio::test]
async fn test_text_roundtrip() {
    let relay = memory_relay();
    let session = relay.generate_session();
    relay.send_text("hello", &session).await.unwrap();

    let result = relay.fetch_session(session.as_str()).await.unwrap();
    let records: Vec<_> = result.records().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, TransferKind::Text);
    assert_eq!(records[0].text_content(), Some("hello"));
    assert_eq!(records[0].file_name(), None);
    assert_eq!(result.groups[0].label, "Today");
}

#[tokio::test]
async fn test_partial_failure_batch() {
    let relay = Relay::new(
        Arc::new(MemoryTransferStore::default()),
        Arc::new(FailSecondPut::default()),
    );
    let session = relay.generate_session();
    let report = relay
        .send_files(
            vec![
                UploadItem::new(&b"one"[..], "one.png", Some("image/png")),
                UploadItem::new(&b"two"[..], "two.mov", Some("video/quicktime")),
                UploadItem::new(&b"three"[..], "three.zip", Some("application/zip")),
            ],
            &session,
        )
        .await
        .unwrap();

    assert!(matches!(report.items[0].outcome, ItemOutcome::Stored(_)));
    assert!(matches!(
        report.items[1].outcome,
        ItemOutcome::Failed(Error::BlobUnavailable(_))
    ));
    assert!(matches!(report.items[2].outcome, ItemOutcome::Stored(_)));
    assert!(report.is_partial());

    let fetched = relay.fetch_session(session.as_str()).await.unwrap();
    let names: Vec<_> = fetched.records().filter_map(|r| r.file_name()).collect();
    assert_eq!(names, vec!["three.zip", "one.png"]);

    let first = fetched
        .records()
        .find(|r| r.file_name() == Some("one.png"))
        .unwrap();
    assert_eq!(relay.download(first).await.unwrap(), Bytes::from_static(b"one"));
    assert_eq!(first.kind, TransferKind::Photo);
    assert_eq!(relay.upload_stats().num_failed.get(), 1);
}

#[tokio::test]
async fn test_code_boundary_and_case() {
    let relay = memory_relay();
    assert!(matches!(
        relay.fetch_session("ABCDE").await,
        Err(Error::InvalidInput(_))
    ));
    assert!(relay.fetch_session("ABCDE1").await.unwrap().is_empty());

    let session = SessionId::parse("QWERTY7").unwrap();
    relay.send_text("case test", &session).await.unwrap();
    let upper = relay.fetch_session("QWERTY7").await.unwrap();
    let lower = relay.fetch_session("qwerty7").await.unwrap();
    assert_eq!(upper.len(), 1);
    assert_eq!(
        upper.records().collect::<Vec<_>>(),
        lower.records().collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_sessions_are_isolated_and_newest_first() {
    let relay = memory_relay();
    let a = relay.generate_session();
    let b = relay.generate_session();
    relay.send_text("a1", &a).await.unwrap();
    relay.send_text("b1", &b).await.unwrap();
    relay.send_text("a2", &a).await.unwrap();

    let fetched = relay.fetch_session(a.as_str()).await.unwrap();
    let texts: Vec<_> = fetched.records().filter_map(|r| r.text_content()).collect();
    assert_eq!(texts, vec!["a2", "a1"]);
    let times: Vec<_> = fetched.records().map(|r| r.created_at).collect();
    assert!(times.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_delete_transfer() {
    let relay = memory_relay();
    let session = relay.generate_session();
    let keep = relay.send_text("keep", &session).await.unwrap();
    let drop = relay.send_text("drop", &session).await.unwrap();

    relay.delete_transfer(&drop.id).await.unwrap();
    let fetched = relay.fetch_session(session.as_str()).await.unwrap();
    assert_eq!(fetched.records().cloned().collect::<Vec<_>>(), vec![keep]);
    assert!(matches!(
        relay.delete_transfer(&drop.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_share_link_fetch() {
    let settings = Settings {
        share_base_url: Some("https://pigeon.example/receive".to_string()),
        ..Settings::default()
    };
    let relay = Relay::from_settings(&settings).await.unwrap();
    let session = relay.generate_session();
    relay.send_text("via link", &session).await.unwrap();

    let link = relay.share_link(&session).unwrap();
    assert!(link.starts_with("https://pigeon.example/receive?session="));
    let fetched = relay.fetch_session(&link).await.unwrap();
    assert_eq!(fetched.len(), 1);

    assert!(memory_relay().share_link(&session).is_none());
}

#[tokio::test]
async fn test_local_blobs_from_settings() {
    let tmp = tempfile::TempDir::new().unwrap();
    let settings = Settings {
        store: StoreSpec::Memory,
        blobs: BlobSpec::Local {
            root: tmp.path().join("blobs"),
        },
        session_code_length: 6,
        device_name: "desk".to_string(),
        ..Settings::default()
    };
    let relay = Relay::from_settings(&settings).await.unwrap();
    let session = relay.generate_session();
    assert_eq!(session.as_str().len(), 6);

    let payload = vec![7u8; 1500];
    let report = relay
        .send_files(
            vec![UploadItem::new(payload.clone(), "../../etc/report v2.pdf", Some("application/pdf"))],
            &session,
        )
        .await
        .unwrap();
    assert!(report.is_complete());

    let fetched = relay.fetch_session(session.as_str()).await.unwrap();
    let record = fetched.records().next().unwrap();
    assert_eq!(record.kind, TransferKind::Document);
    assert_eq!(record.device_name, "desk");
    assert_eq!(record.file_size(), Some(1500));
    assert_eq!(fetched.groups[0].records[0].size_label.as_deref(), Some("0.00 MB"));

    let blob_ref = record.blob_ref().unwrap().as_str();
    assert!(blob_ref.starts_with("file://"));
    assert!(blob_ref.contains(&format!("/transfers/{session}/")));
    assert!(!blob_ref.contains("/../"));
    assert_eq!(relay.download(record).await.unwrap().as_ref(), payload.as_slice());

    let store = LocalBlobStore::new(tmp.path().join("blobs")).unwrap();
    assert_eq!(store.get(record.blob_ref().unwrap()).await.unwrap().len(), 1500);
}

#[tokio::test]
async fn test_from_settings_rejects_invalid() {
    let settings = Settings {
        upload_concurrency: 0,
        ..Settings::default()
    };
    assert!(matches!(
        Relay::from_settings(&settings).await,
        Err(Error::Config(_))
    ));
}
