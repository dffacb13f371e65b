use crate::prelude::*;

use crate::base::record::{NewTransferRecord, RecordId, TransferRecord};
use crate::base::session::SessionId;
use crate::persistence::TransferStore;

#[derive(Default)]
struct MemoryState {
    records: Vec<TransferRecord>,
    last_created_at: Option<DateTime<Utc>>,
}

/// Process-local store for tests and single-device demos. Nothing survives
/// a restart.
#[derive(Default)]
pub struct MemoryTransferStore {
    state: Mutex<MemoryState>,
}

impl MemoryTransferStore {
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TransferStore for MemoryTransferStore {
    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, record: NewTransferRecord) -> Result<TransferRecord> {
        record.validate()?;
        let mut state = self.state.lock().unwrap();
        // Keep timestamps strictly increasing so newest-first is unambiguous.
        let now = Utc::now();
        let created_at = match state.last_created_at {
            Some(last) if now <= last => last + chrono::TimeDelta::microseconds(1),
            _ => now,
        };
        state.last_created_at = Some(created_at);
        let record = TransferRecord::from_new(
            record,
            RecordId(uuid::Uuid::new_v4().to_string()),
            created_at,
        );
        state.records.push(record.clone());
        trace!(id = %record.id, session = %record.session_id, "record inserted");
        Ok(record)
    }

    async fn query_by_session(&self, session_id: &SessionId) -> Result<Vec<TransferRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .rev()
            .filter(|r| &r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let Some(pos) = state.records.iter().position(|r| &r.id == id) else {
            return Err(Error::NotFound(id.to_string()));
        };
        state.records.remove(pos);
        Ok(())
    }
}
