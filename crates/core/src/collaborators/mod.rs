//! Entity collaborators: the business-entity stores that hold asset references.
//!
//! The media core never owns these records. It asks each collaborator for the reference
//! values it currently holds and, as a repair action, asks it to clear one.
//!
//! Two implementations ship with the crate:
//!
//! - [`JsonRecordCollaborator`] reads and rewrites a JSON array of records on disk
//! - [`InMemoryCollaborator`] keeps records in memory, for embedding and tests

mod json;

pub use json::{
    build_registry, default_specs, load_collaborator_specs, CollaboratorSpec,
    JsonRecordCollaborator,
};

use crate::CollaboratorError;
use std::sync::Mutex;

/// One record's reference field as reported by a collaborator.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRecord {
    pub record_id: String,
    /// Human-readable label (record name or title)
    pub label: String,
    /// Raw field value; `None` for null or missing
    pub value: Option<String>,
}

impl ReferenceRecord {
    pub fn new(
        record_id: impl Into<String>,
        label: impl Into<String>,
        value: Option<impl Into<String>>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            label: label.into(),
            value: value.map(Into::into),
        }
    }
}

/// A business-entity type known to hold asset references.
///
/// Implementations are called synchronously from maintenance operations and must be safe to
/// share between threads.
pub trait EntityCollaborator: Send + Sync {
    /// Stable name used in reports and logs, e.g. `banks`.
    fn name(&self) -> &str;

    /// Enumerates every record with its current reference value.
    fn list_reference_values(&self) -> Result<Vec<ReferenceRecord>, CollaboratorError>;

    /// Sets the reference field of `record_id` to null.
    fn clear_reference(&self, record_id: &str) -> Result<(), CollaboratorError>;
}

/// Collaborator backed by an in-memory record list.
#[derive(Debug)]
pub struct InMemoryCollaborator {
    name: String,
    records: Mutex<Vec<ReferenceRecord>>,
}

impl InMemoryCollaborator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn with_records(name: impl Into<String>, records: Vec<ReferenceRecord>) -> Self {
        Self {
            name: name.into(),
            records: Mutex::new(records),
        }
    }

    /// Adds a record, replacing any record with the same id.
    pub fn upsert(&self, record: ReferenceRecord) {
        let mut records = self.lock();
        match records.iter_mut().find(|r| r.record_id == record.record_id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Snapshot of the current records.
    pub fn records(&self) -> Vec<ReferenceRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ReferenceRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EntityCollaborator for InMemoryCollaborator {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_reference_values(&self) -> Result<Vec<ReferenceRecord>, CollaboratorError> {
        Ok(self.records())
    }

    fn clear_reference(&self, record_id: &str) -> Result<(), CollaboratorError> {
        let mut records = self.lock();
        let record = records
            .iter_mut()
            .find(|r| r.record_id == record_id)
            .ok_or_else(|| CollaboratorError::RecordNotFound(record_id.to_string()))?;
        record.value = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_clear_reference() {
        let banks = InMemoryCollaborator::with_records(
            "banks",
            vec![
                ReferenceRecord::new("1", "First Bank", Some("banks/a.webp")),
                ReferenceRecord::new("2", "Second Bank", Some("banks/b.webp")),
            ],
        );

        banks.clear_reference("2").unwrap();

        let records = banks.list_reference_values().unwrap();
        assert_eq!(records[0].value.as_deref(), Some("banks/a.webp"));
        assert_eq!(records[1].value, None);
    }

    #[test]
    fn test_in_memory_clear_unknown_record() {
        let banks = InMemoryCollaborator::new("banks");
        assert!(matches!(
            banks.clear_reference("42"),
            Err(CollaboratorError::RecordNotFound(id)) if id == "42"
        ));
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let gallery = InMemoryCollaborator::new("gallery");
        gallery.upsert(ReferenceRecord::new("1", "Old", Some("gallery/a.webp")));
        gallery.upsert(ReferenceRecord::new("1", "New", None::<String>));

        let records = gallery.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "New");
        assert_eq!(records[0].value, None);
    }
}
