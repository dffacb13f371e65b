use crate::prelude::*;

use std::fmt;
use std::str::FromStr;

/// Semantic kind of a shared item. Assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Photo,
    Video,
    Document,
    Text,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Photo => "photo",
            TransferKind::Video => "video",
            TransferKind::Document => "document",
            TransferKind::Text => "text",
        }
    }

    /// Kinds whose content lives in the blob store.
    pub fn is_binary(&self) -> bool {
        !matches!(self, TransferKind::Text)
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "photo" => Ok(TransferKind::Photo),
            "video" => Ok(TransferKind::Video),
            "document" => Ok(TransferKind::Document),
            "text" => Ok(TransferKind::Text),
            other => record_bail!("unknown transfer kind `{other}`"),
        }
    }
}

/// Classify a file payload by its mime type.
///
/// Total: every input, including a missing mime type, maps to exactly one
/// binary kind. Text never comes through here.
pub fn classify(mime_type: Option<&str>) -> TransferKind {
    let Some(mime) = mime_type.map(str::trim_start) else {
        return TransferKind::Document;
    };
    if has_prefix_ignore_case(mime, "image/") {
        TransferKind::Photo
    } else if has_prefix_ignore_case(mime, "video/") {
        TransferKind::Video
    } else {
        TransferKind::Document
    }
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_prefix() {
        assert_eq!(classify(Some("image/png")), TransferKind::Photo);
        assert_eq!(classify(Some("image/heic")), TransferKind::Photo);
        assert_eq!(classify(Some("video/mp4")), TransferKind::Video);
        assert_eq!(classify(Some("application/pdf")), TransferKind::Document);
        assert_eq!(classify(Some("text/plain")), TransferKind::Document);
    }

    #[test]
    fn test_classify_missing_or_odd_mime() {
        assert_eq!(classify(None), TransferKind::Document);
        assert_eq!(classify(Some("")), TransferKind::Document);
        assert_eq!(classify(Some("image")), TransferKind::Document);
        assert_eq!(classify(Some("videos/mp4")), TransferKind::Document);
        assert_eq!(classify(Some("é/ü")), TransferKind::Document);
    }

    #[test]
    fn test_classify_ignores_case_and_leading_space() {
        assert_eq!(classify(Some("IMAGE/JPEG")), TransferKind::Photo);
        assert_eq!(classify(Some("  Video/webm")), TransferKind::Video);
    }

    #[test]
    fn test_classify_is_deterministic() {
        for mime in [None, Some("image/gif"), Some("video/ogg"), Some("font/woff")] {
            let first = classify(mime);
            for _ in 0..10 {
                assert_eq!(classify(mime), first);
            }
            assert!(first.is_binary());
        }
    }

    #[test]
    fn test_kind_string_roundtrip() {
        for kind in [
            TransferKind::Photo,
            TransferKind::Video,
            TransferKind::Document,
            TransferKind::Text,
        ] {
            assert_eq!(kind.as_str().parse::<TransferKind>().unwrap(), kind);
            assert_eq!(
                serde_json::to_string(&kind).unwrap(),
                format!("\"{}\"", kind.as_str())
            );
        }
        assert!(matches!(
            "audio".parse::<TransferKind>(),
            Err(Error::InvalidRecord(_))
        ));
    }
}
