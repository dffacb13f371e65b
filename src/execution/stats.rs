use crate::prelude::*;

use std::sync::atomic::{AtomicI64, Ordering::Relaxed};

#[derive(Default, Serialize)]
pub struct Counter(pub AtomicI64);

impl Counter {
    pub fn inc(&self, by: i64) {
        self.0.fetch_add(by, Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.0.load(Relaxed)
    }

    pub fn delta(&self, base: &Self) -> Counter {
        Counter(AtomicI64::new(self.get() - base.get()))
    }
}

impl Clone for Counter {
    fn clone(&self) -> Self {
        Self(AtomicI64::new(self.get()))
    }
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl std::fmt::Debug for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Running totals across every upload a coordinator has handled.
#[derive(Debug, Serialize, Default, Clone)]
pub struct UploadStats {
    pub num_stored: Counter,
    pub num_failed: Counter,
    pub num_cancelled: Counter,
    pub num_texts: Counter,
    pub bytes_stored: Counter,
    /// Items currently between blob write and record insert.
    pub num_in_process: Counter,
}

impl UploadStats {
    pub fn delta(&self, base: &Self) -> Self {
        UploadStats {
            num_stored: self.num_stored.delta(&base.num_stored),
            num_failed: self.num_failed.delta(&base.num_failed),
            num_cancelled: self.num_cancelled.delta(&base.num_cancelled),
            num_texts: self.num_texts.delta(&base.num_texts),
            bytes_stored: self.bytes_stored.delta(&base.bytes_stored),
            num_in_process: self.num_in_process.delta(&base.num_in_process),
        }
    }

    pub fn start_processing(&self) {
        self.num_in_process.inc(1);
    }

    pub fn finish_processing(&self) {
        self.num_in_process.inc(-1);
    }

    pub(crate) fn record_stored(&self, size: u64) {
        self.num_stored.inc(1);
        self.bytes_stored.inc(i64::try_from(size).unwrap_or(i64::MAX));
    }
}

impl std::fmt::Display for UploadStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut messages = Vec::new();
        let num_stored = self.num_stored.get();
        if num_stored > 0 {
            messages.push(format!(
                "{num_stored} files STORED ({} bytes)",
                self.bytes_stored.get()
            ));
        }
        let num_texts = self.num_texts.get();
        if num_texts > 0 {
            messages.push(format!("{num_texts} texts STORED"));
        }
        let num_failed = self.num_failed.get();
        if num_failed > 0 {
            messages.push(format!("{num_failed} items FAILED"));
        }
        let num_cancelled = self.num_cancelled.get();
        if num_cancelled > 0 {
            messages.push(format!("{num_cancelled} items CANCELLED"));
        }
        let num_in_process = self.num_in_process.get();
        if num_in_process > 0 {
            messages.push(format!("{num_in_process} items IN PROCESS"));
        }

        if messages.is_empty() {
            write!(f, "No uploads")
        } else {
            write!(f, "{}", messages.join("; "))
        }
    }
}
