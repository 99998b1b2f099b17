//! Reference registry.
//!
//! Holds the registered entity collaborators in declaration order and turns their raw field
//! values into classified [`AssetReference`]s. A collaborator that fails to answer is logged and
//! contributes nothing; the scan carries on with the next one.

use crate::collaborators::EntityCollaborator;
use crate::{MediaError, MediaResult};
use media_types::AssetReference;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A record's classified reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannedRecord {
    pub record_id: String,
    pub label: String,
    pub reference: AssetReference,
}

/// Outcome of querying one collaborator.
#[derive(Clone, Debug)]
pub struct CollaboratorScan {
    pub collaborator: String,
    pub records: Vec<ScannedRecord>,
    /// Set when the query failed; `records` is then empty
    pub error: Option<String>,
}

impl CollaboratorScan {
    /// Local relative paths referenced by this collaborator.
    pub fn local_paths(&self) -> impl Iterator<Item = &str> {
        self.records.iter().filter_map(|r| r.reference.local_path())
    }
}

/// Union of local paths across scans.
pub fn local_paths(scans: &[CollaboratorScan]) -> BTreeSet<String> {
    scans
        .iter()
        .flat_map(CollaboratorScan::local_paths)
        .map(str::to_owned)
        .collect()
}

pub struct ReferenceRegistry {
    collaborators: Vec<Arc<dyn EntityCollaborator>>,
    public_prefix: String,
}

impl ReferenceRegistry {
    /// Creates an empty registry. `public_prefix` is stripped from URL-form references.
    pub fn new(public_prefix: impl Into<String>) -> Self {
        Self {
            collaborators: Vec::new(),
            public_prefix: public_prefix.into(),
        }
    }

    /// Appends a collaborator. Report order follows registration order.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::InvalidInput` if a collaborator with the same name is registered.
    pub fn register(&mut self, collaborator: Arc<dyn EntityCollaborator>) -> MediaResult<()> {
        if self.get(collaborator.name()).is_some() {
            return Err(MediaError::InvalidInput(format!(
                "collaborator '{}' is already registered",
                collaborator.name()
            )));
        }
        self.collaborators.push(collaborator);
        Ok(())
    }

    pub fn collaborators(&self) -> &[Arc<dyn EntityCollaborator>] {
        &self.collaborators
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn EntityCollaborator>> {
        self.collaborators.iter().find(|c| c.name() == name)
    }

    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Queries every collaborator in order, one at a time.
    pub fn scan(&self) -> Vec<CollaboratorScan> {
        self.collaborators
            .iter()
            .map(|collaborator| self.scan_one(collaborator.as_ref()))
            .collect()
    }

    /// The set of local relative paths referenced by any collaborator.
    ///
    /// External URLs and empty values are excluded.
    pub fn valid_references(&self) -> BTreeSet<String> {
        local_paths(&self.scan())
    }

    fn scan_one(&self, collaborator: &dyn EntityCollaborator) -> CollaboratorScan {
        let name = collaborator.name().to_string();
        match collaborator.list_reference_values() {
            Ok(records) => {
                let records = records
                    .into_iter()
                    .map(|r| ScannedRecord {
                        reference: AssetReference::classify(
                            r.value.as_deref(),
                            &self.public_prefix,
                        ),
                        record_id: r.record_id,
                        label: r.label,
                    })
                    .collect::<Vec<_>>();
                tracing::debug!(collaborator = %name, records = records.len(), "scanned collaborator");
                CollaboratorScan {
                    collaborator: name,
                    records,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(collaborator = %name, error = %e, "collaborator query failed; contributing no references");
                CollaboratorScan {
                    collaborator: name,
                    records: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

impl std::fmt::Debug for ReferenceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.collaborators.iter().map(|c| c.name()).collect();
        f.debug_struct("ReferenceRegistry")
            .field("collaborators", &names)
            .field("public_prefix", &self.public_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{InMemoryCollaborator, ReferenceRecord};
    use crate::CollaboratorError;

    struct Unavailable;

    impl EntityCollaborator for Unavailable {
        fn name(&self) -> &str {
            "sponsors"
        }

        fn list_reference_values(&self) -> Result<Vec<ReferenceRecord>, CollaboratorError> {
            Err(CollaboratorError::Query("connection refused".into()))
        }

        fn clear_reference(&self, _record_id: &str) -> Result<(), CollaboratorError> {
            Err(CollaboratorError::Query("connection refused".into()))
        }
    }

    fn banks() -> Arc<InMemoryCollaborator> {
        Arc::new(InMemoryCollaborator::with_records(
            "banks",
            vec![
                ReferenceRecord::new("1", "First", Some("banks/a.webp")),
                ReferenceRecord::new("2", "Second", Some("/uploads/banks/b.webp")),
                ReferenceRecord::new("3", "Third", Some("https://cdn.example.org/c.png")),
                ReferenceRecord::new("4", "Fourth", None::<String>),
            ],
        ))
    }

    #[test]
    fn test_valid_references_union() {
        let mut registry = ReferenceRegistry::new("/uploads");
        registry.register(banks()).unwrap();
        registry
            .register(Arc::new(InMemoryCollaborator::with_records(
                "gallery",
                vec![
                    ReferenceRecord::new("9", "Photo", Some("gallery/p.webp")),
                    ReferenceRecord::new("10", "Dup", Some("banks/a.webp")),
                ],
            )))
            .unwrap();

        let valid = registry.valid_references();

        let expected: BTreeSet<String> = ["banks/a.webp", "banks/b.webp", "gallery/p.webp"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(valid, expected);
    }

    #[test]
    fn test_failing_collaborator_is_isolated() {
        let mut registry = ReferenceRegistry::new("/uploads");
        registry.register(Arc::new(Unavailable)).unwrap();
        registry.register(banks()).unwrap();

        let scans = registry.scan();

        assert_eq!(scans[0].collaborator, "sponsors");
        assert!(scans[0].error.is_some());
        assert!(scans[0].records.is_empty());
        assert_eq!(scans[1].records.len(), 4);
        assert_eq!(local_paths(&scans).len(), 2);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = ReferenceRegistry::new("/uploads");
        registry.register(banks()).unwrap();

        let result = registry.register(banks());

        assert!(matches!(result, Err(MediaError::InvalidInput(_))));
        assert_eq!(registry.collaborators().len(), 1);
    }

    #[test]
    fn test_scan_preserves_declared_order() {
        let mut registry = ReferenceRegistry::new("/uploads");
        for name in ["alerts", "banks", "gallery"] {
            registry
                .register(Arc::new(InMemoryCollaborator::new(name)))
                .unwrap();
        }

        let names: Vec<String> = registry.scan().into_iter().map(|s| s.collaborator).collect();
        assert_eq!(names, ["alerts", "banks", "gallery"]);
    }
}
