use crate::prelude::*;

use crate::base::kind::TransferKind;
use crate::base::session::SessionId;
use std::fmt;

/// Backend-assigned record identifier. Opaque to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque reference into a blob store, persisted inside a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(pub String);

impl BlobRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a record carries: a stored file or inline text, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransferPayload {
    File {
        file_name: String,
        file_size: u64,
        blob_ref: BlobRef,
    },
    Text {
        text_content: String,
    },
}

/// A record as handed to a store for insertion. The store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTransferRecord {
    pub session_id: SessionId,
    pub kind: TransferKind,
    #[serde(flatten)]
    pub payload: TransferPayload,
    pub device_name: String,
}

impl NewTransferRecord {
    pub fn text(session_id: SessionId, text_content: String, device_name: String) -> Self {
        Self {
            session_id,
            kind: TransferKind::Text,
            payload: TransferPayload::Text { text_content },
            device_name,
        }
    }

    pub fn file(
        session_id: SessionId,
        kind: TransferKind,
        file_name: String,
        file_size: u64,
        blob_ref: BlobRef,
        device_name: String,
    ) -> Self {
        Self {
            session_id,
            kind,
            payload: TransferPayload::File {
                file_name,
                file_size,
                blob_ref,
            },
            device_name,
        }
    }

    /// Check the file/text exclusivity invariant. Stores call this before
    /// any I/O.
    pub fn validate(&self) -> Result<()> {
        validate_payload(self.kind, &self.payload)
    }

    /// Flat, nullable view used to bind columns.
    pub(crate) fn columns(&self) -> PayloadColumns<'_> {
        match &self.payload {
            TransferPayload::File {
                file_name,
                file_size,
                blob_ref,
            } => PayloadColumns {
                file_name: Some(file_name.as_str()),
                file_size: Some(*file_size as i64),
                blob_ref: Some(blob_ref.as_str()),
                text_content: None,
            },
            TransferPayload::Text { text_content } => PayloadColumns {
                file_name: None,
                file_size: None,
                blob_ref: None,
                text_content: Some(text_content.as_str()),
            },
        }
    }
}

/// A persisted transfer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRecord {
    pub id: RecordId,
    pub session_id: SessionId,
    pub kind: TransferKind,
    #[serde(flatten)]
    pub payload: TransferPayload,
    pub device_name: String,
    pub created_at: DateTime<Utc>,
}

impl TransferRecord {
    pub fn file_name(&self) -> Option<&str> {
        match &self.payload {
            TransferPayload::File { file_name, .. } => Some(file_name.as_str()),
            TransferPayload::Text { .. } => None,
        }
    }

    pub fn file_size(&self) -> Option<u64> {
        match &self.payload {
            TransferPayload::File { file_size, .. } => Some(*file_size),
            TransferPayload::Text { .. } => None,
        }
    }

    pub fn blob_ref(&self) -> Option<&BlobRef> {
        match &self.payload {
            TransferPayload::File { blob_ref, .. } => Some(blob_ref),
            TransferPayload::Text { .. } => None,
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.payload {
            TransferPayload::Text { text_content } => Some(text_content.as_str()),
            TransferPayload::File { .. } => None,
        }
    }

    pub(crate) fn from_new(new: NewTransferRecord, id: RecordId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            session_id: new.session_id,
            kind: new.kind,
            payload: new.payload,
            device_name: new.device_name,
            created_at,
        }
    }
}

pub(crate) struct PayloadColumns<'a> {
    pub file_name: Option<&'a str>,
    pub file_size: Option<i64>,
    pub blob_ref: Option<&'a str>,
    pub text_content: Option<&'a str>,
}

/// A row as read back from a backend, before invariants are re-checked.
pub(crate) struct StoredColumns {
    pub id: String,
    pub session_id: String,
    pub kind: String,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub blob_ref: Option<String>,
    pub text_content: Option<String>,
    pub device_name: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<StoredColumns> for TransferRecord {
    type Error = Error;

    fn try_from(row: StoredColumns) -> Result<Self> {
        let kind: TransferKind = row.kind.parse()?;
        let session_id = SessionId::parse(&row.session_id)
            .map_err(|e| Error::invalid_record(format!("record {}: {e}", row.id)))?;
        let payload = match (row.file_name, row.file_size, row.blob_ref, row.text_content) {
            (Some(file_name), Some(file_size), Some(blob_ref), None) => TransferPayload::File {
                file_name,
                file_size: u64::try_from(file_size).map_err(|_| {
                    Error::invalid_record(format!("record {} has negative size", row.id))
                })?,
                blob_ref: BlobRef(blob_ref),
            },
            (None, None, None, Some(text_content)) => TransferPayload::Text { text_content },
            _ => record_bail!(
                "record {} must carry either file fields or text content",
                row.id
            ),
        };
        validate_payload(kind, &payload)?;
        Ok(Self {
            id: RecordId(row.id),
            session_id,
            kind,
            payload,
            device_name: row.device_name,
            created_at: row.created_at,
        })
    }
}

fn validate_payload(kind: TransferKind, payload: &TransferPayload) -> Result<()> {
    match payload {
        TransferPayload::Text { text_content } => {
            if kind != TransferKind::Text {
                record_bail!("kind `{kind}` cannot carry text content");
            }
            if text_content.is_empty() {
                record_bail!("text content is empty");
            }
        }
        TransferPayload::File {
            file_name,
            file_size,
            blob_ref,
        } => {
            if !kind.is_binary() {
                record_bail!("kind `{kind}` cannot carry file fields");
            }
            if file_name.is_empty() {
                record_bail!("file name is empty");
            }
            if *file_size == 0 {
                record_bail!("file `{file_name}` has zero size");
            }
            if *file_size > i64::MAX as u64 {
                record_bail!("file `{file_name}` is too large");
            }
            if blob_ref.as_str().is_empty() {
                record_bail!("file `{file_name}` has no blob reference");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionId {
        SessionId::parse("ABC123").unwrap()
    }

    fn columns(kind: &str) -> StoredColumns {
        StoredColumns {
            id: "r1".to_string(),
            session_id: "ABC123".to_string(),
            kind: kind.to_string(),
            file_name: None,
            file_size: None,
            blob_ref: None,
            text_content: None,
            device_name: "linux".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_records() {
        NewTransferRecord::text(session(), "hello".to_string(), "mac".to_string())
            .validate()
            .unwrap();
        NewTransferRecord::file(
            session(),
            TransferKind::Photo,
            "cat.jpg".to_string(),
            12,
            BlobRef("mem://transfers/ABC123/cat.jpg".to_string()),
            "mac".to_string(),
        )
        .validate()
        .unwrap();
    }

    #[test]
    fn test_validate_rejects_kind_payload_mismatch() {
        let mut record = NewTransferRecord::text(session(), "hi".to_string(), "mac".to_string());
        record.kind = TransferKind::Document;
        assert!(matches!(record.validate(), Err(Error::InvalidRecord(_))));

        let record = NewTransferRecord::file(
            session(),
            TransferKind::Text,
            "a.txt".to_string(),
            1,
            BlobRef("mem://a".to_string()),
            "mac".to_string(),
        );
        assert!(matches!(record.validate(), Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let empty_text = NewTransferRecord::text(session(), String::new(), "mac".to_string());
        assert!(empty_text.validate().is_err());

        let zero_size = NewTransferRecord::file(
            session(),
            TransferKind::Document,
            "a.pdf".to_string(),
            0,
            BlobRef("mem://a".to_string()),
            "mac".to_string(),
        );
        assert!(zero_size.validate().is_err());
    }

    #[test]
    fn test_columns_are_exclusive() {
        let text = NewTransferRecord::text(session(), "hi".to_string(), "mac".to_string());
        let cols = text.columns();
        assert!(cols.file_name.is_none() && cols.file_size.is_none() && cols.blob_ref.is_none());
        assert_eq!(cols.text_content, Some("hi"));
    }

    #[test]
    fn test_stored_columns_text_roundtrip() {
        let mut row = columns("text");
        row.text_content = Some("hello".to_string());
        let record = TransferRecord::try_from(row).unwrap();
        assert_eq!(record.kind, TransferKind::Text);
        assert_eq!(record.text_content(), Some("hello"));
        assert_eq!(record.file_name(), None);
        assert_eq!(record.file_size(), None);
        assert_eq!(record.blob_ref(), None);
    }

    #[test]
    fn test_stored_columns_mixed_fields_rejected() {
        let mut row = columns("document");
        row.file_name = Some("a.pdf".to_string());
        row.file_size = Some(10);
        row.blob_ref = Some("mem://a".to_string());
        row.text_content = Some("oops".to_string());
        assert!(matches!(
            TransferRecord::try_from(row),
            Err(Error::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_stored_columns_negative_size_rejected() {
        let mut row = columns("video");
        row.file_name = Some("clip.mp4".to_string());
        row.file_size = Some(-4);
        row.blob_ref = Some("mem://clip".to_string());
        assert!(matches!(
            TransferRecord::try_from(row),
            Err(Error::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_record_serializes_to_flat_shape() {
        let record = TransferRecord::from_new(
            NewTransferRecord::text(session(), "hello".to_string(), "ios".to_string()),
            RecordId("r9".to_string()),
            Utc::now(),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "r9");
        assert_eq!(json["session_id"], "ABC123");
        assert_eq!(json["kind"], "text");
        assert_eq!(json["text_content"], "hello");
        assert!(json.get("file_name").is_none());
    }
}
