//! Reconciliation engine.
//!
//! Compares the set of files under the upload root with the set of references held by the
//! registered collaborators:
//!
//! - **orphans**: files on disk that no collaborator references
//! - **broken references**: local references whose file does not exist
//!
//! Every operation recomputes both sets from scratch, so running any of them again converges
//! on the same state. Nothing is cached between calls.
//!
//! Collaborators that fail to answer contribute no references. During cleanup this means their
//! files look orphaned; the summary lists failed collaborators so the caller can tell.

use crate::registry::{local_paths, CollaboratorScan, ReferenceRegistry};
use crate::MediaResult;
use chrono::Utc;
use media_files::AssetStore;
use media_types::AssetReference;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// A record whose reference field points at a local asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordReference {
    pub record_id: String,
    pub label: String,
    pub path: String,
}

/// Valid and broken references of one collaborator.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorReport {
    pub collaborator: String,
    pub valid: Vec<RecordReference>,
    pub broken: Vec<RecordReference>,
    /// References to external URLs, exempt from existence checks
    pub external_count: usize,
    /// Query failure, if the collaborator could not be scanned
    pub error: Option<String>,
}

/// Per-collaborator report in declaration order.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub collaborators: Vec<CollaboratorReport>,
}

impl ValidationReport {
    pub fn broken_count(&self) -> usize {
        self.collaborators.iter().map(|c| c.broken.len()).sum()
    }

    pub fn valid_count(&self) -> usize {
        self.collaborators.iter().map(|c| c.valid.len()).sum()
    }
}

/// Result of `validate_references`: the report plus a dry-run orphan list.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceValidation {
    pub per_collaborator: Vec<CollaboratorReport>,
    pub orphaned: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSummary {
    pub deleted_count: usize,
    pub valid_paths_count: usize,
    pub failed_count: usize,
    pub skipped_recent_count: usize,
    pub failed_collaborators: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairSummary {
    pub fixed_count: usize,
    /// Broken references found
    pub orphaned_count: usize,
    pub failed_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_images: usize,
    pub total_size: u64,
    pub total_size_formatted: String,
    pub average_size: u64,
}

/// Formats a byte count with 1024-based units, e.g. `1536` as `1.5 KB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut exponent = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && exponent < UNITS.len() - 1 {
        scaled /= 1024;
        exponent += 1;
    }
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');

    format!("{} {}", trimmed, UNITS[exponent])
}

#[derive(Clone, Debug)]
pub struct ReconciliationEngine {
    store: AssetStore,
    registry: Arc<ReferenceRegistry>,
    orphan_grace: Duration,
}

impl ReconciliationEngine {
    /// `orphan_grace` is the minimum file age before cleanup deletes an orphan; zero disables it.
    pub fn new(store: AssetStore, registry: Arc<ReferenceRegistry>, orphan_grace: Duration) -> Self {
        Self {
            store,
            registry,
            orphan_grace,
        }
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    /// Splits every collaborator's local references into valid and broken.
    pub fn validation_report(&self) -> ValidationReport {
        let scans = self.registry.scan();
        ValidationReport {
            collaborators: scans.iter().map(|scan| self.report_for(scan)).collect(),
        }
    }

    /// Files on disk that no collaborator references, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload root cannot be listed.
    pub fn orphaned_files(&self) -> MediaResult<Vec<String>> {
        let valid = self.registry.valid_references();
        self.orphans_against(&valid)
    }

    /// Validation report plus the orphan list, without changing anything.
    pub fn validate_references(&self) -> MediaResult<ReferenceValidation> {
        let scans = self.registry.scan();
        let per_collaborator = scans.iter().map(|scan| self.report_for(scan)).collect();
        let orphaned = self.orphans_against(&local_paths(&scans))?;

        Ok(ReferenceValidation {
            per_collaborator,
            orphaned,
        })
    }

    /// Deletes orphaned files older than the grace period.
    ///
    /// Deletion failures are logged and counted, never raised.
    ///
    /// # Errors
    ///
    /// Returns an error only if the upload root cannot be listed.
    pub fn cleanup_orphans(&self) -> MediaResult<CleanupSummary> {
        let scans = self.registry.scan();
        let failed_collaborators: Vec<String> = scans
            .iter()
            .filter(|s| s.error.is_some())
            .map(|s| s.collaborator.clone())
            .collect();
        if !failed_collaborators.is_empty() {
            tracing::warn!(
                collaborators = ?failed_collaborators,
                "running orphan cleanup with failed collaborators; their files count as orphans"
            );
        }

        let valid = local_paths(&scans);
        let orphans = self.orphans_against(&valid)?;

        let mut summary = CleanupSummary {
            valid_paths_count: valid.len(),
            failed_collaborators,
            ..CleanupSummary::default()
        };

        for path in &orphans {
            if self.is_recent(path) {
                tracing::debug!(path = %path, "orphan younger than grace period, skipping");
                summary.skipped_recent_count += 1;
                continue;
            }

            if self.store.delete(path) {
                tracing::debug!(path = %path, "deleted orphaned file");
                summary.deleted_count += 1;
            } else {
                tracing::warn!(path = %path, "failed to delete orphaned file");
                summary.failed_count += 1;
            }
        }

        tracing::info!(
            deleted = summary.deleted_count,
            failed = summary.failed_count,
            skipped_recent = summary.skipped_recent_count,
            valid_paths = summary.valid_paths_count,
            "orphan cleanup completed"
        );

        Ok(summary)
    }

    /// Clears every broken reference through its owning collaborator.
    ///
    /// This loses the broken value; records end up with a null reference.
    pub fn repair_broken_references(&self) -> RepairSummary {
        let report = self.validation_report();
        let mut summary = RepairSummary {
            orphaned_count: report.broken_count(),
            ..RepairSummary::default()
        };

        for collaborator_report in &report.collaborators {
            if collaborator_report.broken.is_empty() {
                continue;
            }

            let Some(collaborator) = self.registry.get(&collaborator_report.collaborator) else {
                summary.failed_count += collaborator_report.broken.len();
                continue;
            };

            for broken in &collaborator_report.broken {
                match collaborator.clear_reference(&broken.record_id) {
                    Ok(()) => {
                        tracing::info!(
                            collaborator = %collaborator_report.collaborator,
                            record_id = %broken.record_id,
                            path = %broken.path,
                            "cleared broken reference"
                        );
                        summary.fixed_count += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            collaborator = %collaborator_report.collaborator,
                            record_id = %broken.record_id,
                            error = %e,
                            "failed to clear broken reference"
                        );
                        summary.failed_count += 1;
                    }
                }
            }
        }

        tracing::info!(
            found = summary.orphaned_count,
            fixed = summary.fixed_count,
            failed = summary.failed_count,
            "broken reference repair completed"
        );

        summary
    }

    /// Count and size of the files behind valid references.
    ///
    /// Each distinct path counts once; references to missing files are skipped.
    pub fn storage_stats(&self) -> StorageStats {
        let valid = self.registry.valid_references();

        let sizes: Vec<u64> = valid
            .iter()
            .filter_map(|path| self.store.stat(path))
            .map(|info| info.size_bytes)
            .collect();

        let total_images = sizes.len();
        let total_size: u64 = sizes.iter().sum();
        let average_size = if total_images == 0 {
            0
        } else {
            (total_size as f64 / total_images as f64).round() as u64
        };

        StorageStats {
            total_images,
            total_size,
            total_size_formatted: format_bytes(total_size),
            average_size,
        }
    }

    fn report_for(&self, scan: &CollaboratorScan) -> CollaboratorReport {
        let mut report = CollaboratorReport {
            collaborator: scan.collaborator.clone(),
            valid: Vec::new(),
            broken: Vec::new(),
            external_count: 0,
            error: scan.error.clone(),
        };

        for record in &scan.records {
            match &record.reference {
                AssetReference::Empty => {}
                AssetReference::External(_) => report.external_count += 1,
                AssetReference::Local(path) => {
                    let entry = RecordReference {
                        record_id: record.record_id.clone(),
                        label: record.label.clone(),
                        path: path.clone(),
                    };
                    if self.store.exists(path) {
                        report.valid.push(entry);
                    } else {
                        report.broken.push(entry);
                    }
                }
            }
        }

        report
    }

    fn orphans_against(&self, valid: &BTreeSet<String>) -> MediaResult<Vec<String>> {
        let on_disk = self.store.list_all()?;
        Ok(on_disk
            .into_iter()
            .filter(|path| !valid.contains(path))
            .collect())
    }

    fn is_recent(&self, path: &str) -> bool {
        if self.orphan_grace.is_zero() {
            return false;
        }
        let Some(modified) = self.store.modified_at(path) else {
            return false;
        };
        let age = (Utc::now() - modified).to_std().unwrap_or(Duration::ZERO);
        age < self.orphan_grace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{EntityCollaborator, InMemoryCollaborator, ReferenceRecord};
    use crate::CollaboratorError;
    use tempfile::TempDir;

    struct Unavailable(&'static str);

    impl EntityCollaborator for Unavailable {
        fn name(&self) -> &str {
            self.0
        }

        fn list_reference_values(&self) -> Result<Vec<ReferenceRecord>, CollaboratorError> {
            Err(CollaboratorError::Query("timeout".into()))
        }

        fn clear_reference(&self, _record_id: &str) -> Result<(), CollaboratorError> {
            Err(CollaboratorError::Query("timeout".into()))
        }
    }

    struct Fixture {
        _temp: TempDir,
        store: AssetStore,
        banks: Arc<InMemoryCollaborator>,
        gallery: Arc<InMemoryCollaborator>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let store = AssetStore::new(&temp.path().join("uploads")).unwrap();
            Self {
                _temp: temp,
                store,
                banks: Arc::new(InMemoryCollaborator::new("banks")),
                gallery: Arc::new(InMemoryCollaborator::new("gallery")),
            }
        }

        fn engine(&self, grace: Duration) -> ReconciliationEngine {
            let mut registry = ReferenceRegistry::new("/uploads");
            registry.register(self.banks.clone()).unwrap();
            registry.register(self.gallery.clone()).unwrap();
            ReconciliationEngine::new(self.store.clone(), Arc::new(registry), grace)
        }

        fn write(&self, relative: &str, bytes: &[u8]) {
            let (dir, name) = relative.rsplit_once('/').unwrap();
            self.store.save(bytes, name, dir).unwrap();
        }
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(500), "500 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_048_576), "1 MB");
        assert_eq!(format_bytes(1_234_567), "1.18 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5 GB");
    }

    #[test]
    fn test_broken_bank_reference_is_repaired() {
        let fx = Fixture::new();
        fx.banks.upsert(ReferenceRecord::new(
            "1",
            "First Bank",
            Some("banks/logo-123.webp"),
        ));
        let engine = fx.engine(Duration::ZERO);

        let report = engine.validation_report();
        assert_eq!(report.broken_count(), 1);
        assert_eq!(report.collaborators[0].broken[0].path, "banks/logo-123.webp");

        let summary = engine.repair_broken_references();
        assert_eq!(summary.fixed_count, 1);
        assert_eq!(summary.orphaned_count, 1);
        assert_eq!(fx.banks.records()[0].value, None);
        assert_eq!(engine.validation_report().broken_count(), 0);
    }

    #[test]
    fn test_stray_gallery_file_is_cleaned_up() {
        let fx = Fixture::new();
        fx.write("gallery/kept.webp", b"kept");
        fx.write("gallery/stray.webp", b"stray");
        fx.gallery.upsert(ReferenceRecord::new(
            "1",
            "Kept",
            Some("/uploads/gallery/kept.webp"),
        ));
        let engine = fx.engine(Duration::ZERO);

        let summary = engine.cleanup_orphans().unwrap();

        assert_eq!(summary.deleted_count, 1);
        assert_eq!(summary.valid_paths_count, 1);
        assert!(fx.store.exists("gallery/kept.webp"));
        assert!(!fx.store.exists("gallery/stray.webp"));
    }

    #[test]
    fn test_non_canonical_reference_keeps_its_file() {
        let fx = Fixture::new();
        fx.write("banks/a.webp", b"a");
        fx.banks
            .upsert(ReferenceRecord::new("1", "A", Some("banks//a.webp")));
        fx.gallery
            .upsert(ReferenceRecord::new("2", "B", Some("/uploads/banks/a.webp/")));
        let engine = fx.engine(Duration::ZERO);

        let report = engine.validation_report();
        assert_eq!(report.valid_count(), 2);
        assert_eq!(report.broken_count(), 0);
        assert!(engine.orphaned_files().unwrap().is_empty());

        let summary = engine.cleanup_orphans().unwrap();
        assert_eq!(summary.deleted_count, 0);
        assert!(fx.store.exists("banks/a.webp"));

        let repair = engine.repair_broken_references();
        assert_eq!(repair.orphaned_count, 0);
        assert_eq!(fx.banks.records()[0].value.as_deref(), Some("banks//a.webp"));
    }

    #[test]
    fn test_cleanup_is_idempotent_and_complete() {
        let fx = Fixture::new();
        fx.store.ensure_categories(["banks", "gallery"]).unwrap();
        fx.write("banks/a.webp", b"a");
        fx.write("banks/b.webp", b"b");
        fx.write("gallery/c.webp", b"c");
        fx.banks
            .upsert(ReferenceRecord::new("1", "A", Some("banks/a.webp")));
        let engine = fx.engine(Duration::ZERO);

        let first = engine.cleanup_orphans().unwrap();
        let second = engine.cleanup_orphans().unwrap();

        assert_eq!(first.deleted_count, 2);
        assert_eq!(second.deleted_count, 0);
        let valid = engine.registry().valid_references();
        assert!(fx.store.list_all().unwrap().iter().all(|p| valid.contains(p)));
        assert!(fx.store.upload_root().join("banks/.gitkeep").exists());
    }

    #[test]
    fn test_grace_period_skips_recent_orphans() {
        let fx = Fixture::new();
        fx.write("alerts/fresh.webp", b"fresh");
        let engine = fx.engine(Duration::from_secs(3600));

        let summary = engine.cleanup_orphans().unwrap();

        assert_eq!(summary.deleted_count, 0);
        assert_eq!(summary.skipped_recent_count, 1);
        assert!(fx.store.exists("alerts/fresh.webp"));
    }

    #[test]
    fn test_failing_collaborator_reported() {
        let fx = Fixture::new();
        fx.write("sponsors/s.webp", b"s");
        let mut registry = ReferenceRegistry::new("/uploads");
        registry.register(Arc::new(Unavailable("sponsors"))).unwrap();
        registry.register(fx.banks.clone()).unwrap();
        let engine = ReconciliationEngine::new(fx.store.clone(), Arc::new(registry), Duration::ZERO);

        let validation = engine.validate_references().unwrap();
        assert!(validation.per_collaborator[0].error.is_some());
        assert_eq!(validation.orphaned, ["sponsors/s.webp"]);

        let summary = engine.cleanup_orphans().unwrap();
        assert_eq!(summary.failed_collaborators, ["sponsors"]);
    }

    #[test]
    fn test_external_urls_are_exempt() {
        let fx = Fixture::new();
        fx.banks.upsert(ReferenceRecord::new(
            "1",
            "Legacy",
            Some("https://cdn.example.org/logo.png"),
        ));
        let engine = fx.engine(Duration::ZERO);

        let report = engine.validation_report();

        assert_eq!(report.broken_count(), 0);
        assert_eq!(report.collaborators[0].external_count, 1);
        assert_eq!(engine.repair_broken_references().fixed_count, 0);
    }

    #[test]
    fn test_repair_counts_clear_failures() {
        struct ReadOnly;

        impl EntityCollaborator for ReadOnly {
            fn name(&self) -> &str {
                "schools"
            }

            fn list_reference_values(&self) -> Result<Vec<ReferenceRecord>, CollaboratorError> {
                Ok(vec![ReferenceRecord::new("5", "School", Some("schools/gone.webp"))])
            }

            fn clear_reference(&self, record_id: &str) -> Result<(), CollaboratorError> {
                Err(CollaboratorError::RecordNotFound(record_id.into()))
            }
        }

        let fx = Fixture::new();
        let mut registry = ReferenceRegistry::new("/uploads");
        registry.register(Arc::new(ReadOnly)).unwrap();
        let engine = ReconciliationEngine::new(fx.store.clone(), Arc::new(registry), Duration::ZERO);

        let summary = engine.repair_broken_references();

        assert_eq!(summary.orphaned_count, 1);
        assert_eq!(summary.fixed_count, 0);
        assert_eq!(summary.failed_count, 1);
    }

    #[test]
    fn test_storage_stats_over_valid_references() {
        let fx = Fixture::new();
        fx.write("banks/a.webp", &[0u8; 1000]);
        fx.write("gallery/b.webp", &[0u8; 2000]);
        fx.write("gallery/orphan.webp", &[0u8; 5000]);
        fx.banks
            .upsert(ReferenceRecord::new("1", "A", Some("banks/a.webp")));
        fx.banks
            .upsert(ReferenceRecord::new("2", "Missing", Some("banks/missing.webp")));
        fx.gallery
            .upsert(ReferenceRecord::new("1", "B", Some("gallery/b.webp")));
        fx.gallery
            .upsert(ReferenceRecord::new("2", "B again", Some("gallery/b.webp")));
        let engine = fx.engine(Duration::ZERO);

        let stats = engine.storage_stats();

        assert_eq!(stats.total_images, 2);
        assert_eq!(stats.total_size, 3000);
        assert_eq!(stats.average_size, 1500);
        assert_eq!(stats.total_size_formatted, "2.93 KB");
    }

    #[test]
    fn test_storage_stats_empty() {
        let fx = Fixture::new();
        let stats = fx.engine(Duration::ZERO).storage_stats();

        assert_eq!(stats.total_images, 0);
        assert_eq!(stats.average_size, 0);
        assert_eq!(stats.total_size_formatted, "0 Bytes");
    }
}
