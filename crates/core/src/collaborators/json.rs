//! File-backed collaborators.
//!
//! Each collaborator reads one JSON file holding an array of record objects, for example
//! `records/banks.json`:
//!
//! ```json
//! [
//!   { "id": 1, "name": "First Bank", "logo": "banks/logo-1760601234567-0a1b2c3d.webp" },
//!   { "id": 2, "name": "Second Bank", "logo": null }
//! ]
//! ```
//!
//! A missing file means the entity has no records yet. Clearing a reference rewrites the whole
//! file through a temporary sibling and a rename.
//!
//! Records without a usable id are reported as `#<position>` so their references still count.
//! Clearing such a record targets whatever sits at that position when the file is rewritten.
//!
//! The collaborator set is either the built-in default list or a YAML file:
//!
//! ```yaml
//! collaborators:
//!   - name: banks
//!     records_file: banks.json
//!     reference_field: logo
//!   - name: testimonials
//!     records_file: testimonials.json
//!     label_field: author
//!     reference_field: photo
//! ```

use super::{EntityCollaborator, ReferenceRecord};
use crate::config::MediaConfig;
use crate::registry::ReferenceRegistry;
use crate::{CollaboratorError, MediaError, MediaResult};
use media_types::NonEmptyText;
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Marks ids derived from a record's array position.
const POSITIONAL_ID_PREFIX: &str = "#";

fn default_id_field() -> String {
    "id".into()
}

fn default_label_field() -> String {
    "name".into()
}

/// Declaration of one file-backed collaborator.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct CollaboratorSpec {
    pub name: NonEmptyText,
    /// Record file, relative to the records directory unless absolute
    pub records_file: PathBuf,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_label_field")]
    pub label_field: String,
    pub reference_field: String,
}

#[derive(serde::Deserialize)]
struct CollaboratorsFile {
    collaborators: Vec<CollaboratorSpec>,
}

/// The built-in collaborator set, in report order.
pub fn default_specs() -> Vec<CollaboratorSpec> {
    [
        ("banks", "name", "logo"),
        ("sponsors", "name", "logo"),
        ("schools", "name", "image"),
        ("gallery", "title", "path"),
        ("alerts", "title", "image"),
    ]
    .into_iter()
    .filter_map(|(name, label_field, reference_field)| {
        Some(CollaboratorSpec {
            name: NonEmptyText::new(name).ok()?,
            records_file: PathBuf::from(format!("{name}.json")),
            id_field: default_id_field(),
            label_field: label_field.into(),
            reference_field: reference_field.into(),
        })
    })
    .collect()
}

/// Returns the collaborator declarations for `cfg`.
///
/// # Errors
///
/// - `MediaError::ConfigRead` if the configured YAML file cannot be read
/// - `MediaError::YamlDeserialization` if it is malformed
pub fn load_collaborator_specs(cfg: &MediaConfig) -> MediaResult<Vec<CollaboratorSpec>> {
    let Some(path) = cfg.collaborators_file() else {
        return Ok(default_specs());
    };

    let text = fs::read_to_string(path).map_err(MediaError::ConfigRead)?;
    let file: CollaboratorsFile =
        serde_yaml::from_str(&text).map_err(MediaError::YamlDeserialization)?;
    Ok(file.collaborators)
}

/// Builds a registry of [`JsonRecordCollaborator`]s for `cfg`.
///
/// # Errors
///
/// Returns an error if the collaborator declarations cannot be loaded or two declarations
/// share a name.
pub fn build_registry(cfg: &MediaConfig) -> MediaResult<ReferenceRegistry> {
    let mut registry = ReferenceRegistry::new(cfg.public_prefix());
    for spec in load_collaborator_specs(cfg)? {
        let collaborator = JsonRecordCollaborator::new(spec, cfg.records_dir());
        registry.register(Arc::new(collaborator))?;
    }
    Ok(registry)
}

/// Collaborator backed by a JSON array of record objects.
#[derive(Debug)]
pub struct JsonRecordCollaborator {
    spec: CollaboratorSpec,
    path: PathBuf,
    // Serialises read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonRecordCollaborator {
    pub fn new(spec: CollaboratorSpec, records_dir: &Path) -> Self {
        let path = if spec.records_file.is_absolute() {
            spec.records_file.clone()
        } else {
            records_dir.join(&spec.records_file)
        };
        Self {
            spec,
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spec(&self) -> &CollaboratorSpec {
        &self.spec
    }

    /// Reads the record array; `None` when the file does not exist.
    fn read_records(&self) -> Result<Option<Vec<Value>>, CollaboratorError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn write_records(&self, records: &[Value]) -> Result<(), CollaboratorError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(records)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn record_id(&self, record: &Map<String, Value>) -> Option<String> {
        match record.get(&self.spec.id_field)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Id used in reports: the record's own id, or `#<position>` in the array when it has none.
    fn record_key(&self, position: usize, record: &Map<String, Value>) -> String {
        self.record_id(record)
            .unwrap_or_else(|| format!("{POSITIONAL_ID_PREFIX}{position}"))
    }
}

impl EntityCollaborator for JsonRecordCollaborator {
    fn name(&self) -> &str {
        self.spec.name.as_str()
    }

    fn list_reference_values(&self) -> Result<Vec<ReferenceRecord>, CollaboratorError> {
        let Some(records) = self.read_records()? else {
            tracing::debug!(
                collaborator = %self.spec.name,
                path = %self.path.display(),
                "record file missing, no references"
            );
            return Ok(Vec::new());
        };

        let mut out = Vec::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            let Some(record) = record.as_object() else {
                tracing::debug!(
                    collaborator = %self.spec.name,
                    position,
                    "skipping non-object record"
                );
                continue;
            };
            let record_id = self.record_key(position, record);

            let label = record
                .get(&self.spec.label_field)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| record_id.clone());

            let value = match record.get(&self.spec.reference_field) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => {
                    tracing::debug!(
                        collaborator = %self.spec.name,
                        record_id = %record_id,
                        field = %self.spec.reference_field,
                        value = %other,
                        "reference field is not a string, treating as null"
                    );
                    None
                }
            };

            out.push(ReferenceRecord {
                record_id,
                label,
                value,
            });
        }
        Ok(out)
    }

    fn clear_reference(&self, record_id: &str) -> Result<(), CollaboratorError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut records = self
            .read_records()?
            .ok_or_else(|| CollaboratorError::RecordNotFound(record_id.to_string()))?;

        let mut cleared = false;
        for (position, record) in records.iter_mut().enumerate() {
            let Some(record) = record.as_object_mut() else {
                continue;
            };
            if self.record_key(position, record) == record_id {
                record.insert(self.spec.reference_field.clone(), Value::Null);
                cleared = true;
            }
        }

        if !cleared {
            return Err(CollaboratorError::RecordNotFound(record_id.to_string()));
        }

        self.write_records(&records)
    }
}
