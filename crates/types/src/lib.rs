//! Shared value types for the media workspace.
//!
//! - [`NonEmptyText`]: trimmed text guaranteed to contain at least one character.
//! - [`AssetReference`]: the classified form of a record field that should point at an asset.
//! - [`canonical_relative`]: the single relative-path form used for comparing references with
//!   stored files.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, returning `TextError::Empty` when the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// URL schemes that mark a reference as a legacy external link.
const EXTERNAL_PREFIXES: [&str; 3] = ["http://", "https://", "//"];

/// Joins the non-empty `/` segments of `path`.
///
/// `banks//a.webp`, `/banks/a.webp` and `banks/a.webp/` all become `banks/a.webp`, the form
/// the upload store lists files in. `.` and `..` segments are kept so unsafe paths stay
/// distinguishable.
pub fn canonical_relative(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// A record field value classified by what it points at.
///
/// Only [`AssetReference::Local`] values take part in reconciliation. External URLs are legacy
/// links kept in some records and are never checked against the upload root.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AssetReference {
    /// Null, missing or blank field
    Empty,
    /// Absolute external URL (exempt from existence checks)
    External(String),
    /// Path relative to the upload root, e.g. `banks/logo-1700000000000-0a1b2c3d.webp`
    Local(String),
}

impl AssetReference {
    /// Classifies a raw field value.
    ///
    /// Values stored in URL form (`{public_prefix}/banks/x.webp`) or with a leading `/` are
    /// normalised to the relative path so they compare equal to directory listings.
    ///
    /// # Arguments
    ///
    /// * `value` - The raw field value, `None` for SQL-style nulls
    /// * `public_prefix` - URL prefix under which the upload root is served (e.g. `/uploads`)
    pub fn classify(value: Option<&str>, public_prefix: &str) -> Self {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::Empty;
        };

        let lowered = raw.to_ascii_lowercase();
        if EXTERNAL_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
            return Self::External(raw.to_owned());
        }

        let prefix = public_prefix.trim_end_matches('/');
        let without_prefix = if !prefix.is_empty() {
            raw.strip_prefix(prefix)
                .filter(|rest| rest.starts_with('/'))
                .unwrap_or(raw)
        } else {
            raw
        };

        let local = canonical_relative(without_prefix);
        if local.is_empty() {
            return Self::Empty;
        }

        Self::Local(local)
    }

    /// Returns the relative path for local references.
    pub fn local_path(&self) -> Option<&str> {
        match self {
            Self::Local(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }
}
