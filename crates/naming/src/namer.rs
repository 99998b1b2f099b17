//! Implementation of the asset namer and name parsing.

use crate::{NamingError, NamingResult};
use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// Maximum accepted prefix length.
const MAX_PREFIX_LEN: usize = 64;

/// Issues asset filenames with strictly increasing millisecond timestamps.
///
/// The namer remembers the last timestamp it handed out. When the wall clock has not moved past
/// it (two uploads in the same millisecond, or a clock step backwards), the next name uses the
/// previous timestamp plus one millisecond instead. This removes same-process collisions while
/// keeping the timestamp close to real upload time.
///
/// Share one namer per upload root (for example inside an `Arc`).
#[derive(Debug, Default)]
pub struct AssetNamer {
    last_millis: Mutex<i64>,
}

impl AssetNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a filename for an upload.
    ///
    /// # Arguments
    ///
    /// * `original_filename` - Client-supplied filename; only its extension is kept (lowercased)
    /// * `prefix` - Category prefix such as `logo` or `gallery`
    ///
    /// # Errors
    ///
    /// Returns [`NamingError::InvalidPrefix`] if the prefix is empty, too long, or contains
    /// characters other than ASCII letters, digits, `-` and `_`.
    pub fn name(&self, original_filename: &str, prefix: &str) -> NamingResult<String> {
        let prefix = normalise_prefix(prefix)?;
        let millis = self.next_millis(Utc::now().timestamp_millis());
        let suffix: u32 = rand::thread_rng().gen();

        Ok(format!(
            "{}-{}-{:08x}{}",
            prefix,
            millis,
            suffix,
            extension_of(original_filename)
        ))
    }

    fn next_millis(&self, now: i64) -> i64 {
        let mut last = self
            .last_millis
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = if now <= *last { *last + 1 } else { now };
        *last = next;
        next
    }
}

/// Lowercases a prefix and checks it is safe to embed in a filename.
pub fn normalise_prefix(prefix: &str) -> NamingResult<String> {
    let prefix = prefix.trim().to_ascii_lowercase();

    if prefix.is_empty() {
        return Err(NamingError::InvalidPrefix("prefix cannot be empty".into()));
    }

    if prefix.len() > MAX_PREFIX_LEN {
        return Err(NamingError::InvalidPrefix(format!(
            "prefix exceeds maximum length of {} characters",
            MAX_PREFIX_LEN
        )));
    }

    let ok = prefix
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'-' | b'_'));
    if !ok {
        return Err(NamingError::InvalidPrefix(format!(
            "prefix '{}' contains invalid characters (only alphanumeric, '-', '_' allowed)",
            prefix
        )));
    }

    Ok(prefix)
}

/// Returns the lowercased extension of `filename` including the dot, or an empty string.
///
/// Extensions containing anything but ASCII alphanumerics are dropped.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// A parsed asset filename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetName {
    prefix: String,
    timestamp: DateTime<Utc>,
    suffix: String,
    extension: String,
}

impl AssetName {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Upload time encoded in the name.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Extension including the dot, empty when the name has none.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl FromStr for AssetName {
    type Err = NamingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NamingError::InvalidName(s.to_string());

        let (stem, extension) = match s.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{}", ext)),
            _ => (s, String::new()),
        };

        let mut parts = stem.rsplitn(3, '-');
        let suffix = parts.next().ok_or_else(invalid)?;
        let millis = parts.next().ok_or_else(invalid)?;
        let prefix = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;

        if suffix.len() != 8 || !suffix.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(invalid());
        }

        let millis: i64 = millis.parse().map_err(|_| invalid())?;
        let timestamp = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(invalid)?;

        Ok(Self {
            prefix: prefix.to_string(),
            timestamp,
            suffix: suffix.to_string(),
            extension,
        })
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}{}",
            self.prefix,
            self.timestamp.timestamp_millis(),
            self.suffix,
            self.extension
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_name_layout() {
        let namer = AssetNamer::new();
        let name = namer.name("Bank Logo.PNG", "logo").unwrap();

        assert!(name.starts_with("logo-"));
        assert!(name.ends_with(".png"));

        let parsed: AssetName = name.parse().unwrap();
        assert_eq!(parsed.prefix(), "logo");
        assert_eq!(parsed.suffix().len(), 8);
        assert_eq!(parsed.extension(), ".png");
    }

    #[test]
    fn test_name_without_extension() {
        let namer = AssetNamer::new();
        let name = namer.name("README", "doc").unwrap();
        let parsed: AssetName = name.parse().unwrap();

        assert_eq!(parsed.extension(), "");
    }

    #[test]
    fn test_name_rejects_bad_prefix() {
        let namer = AssetNamer::new();

        assert!(matches!(
            namer.name("a.png", ""),
            Err(NamingError::InvalidPrefix(_))
        ));
        assert!(matches!(
            namer.name("a.png", "../etc"),
            Err(NamingError::InvalidPrefix(_))
        ));
        assert!(matches!(
            namer.name("a.png", "bank logo"),
            Err(NamingError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_prefix_is_lowercased() {
        assert_eq!(normalise_prefix(" Gallery ").unwrap(), "gallery");
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let namer = AssetNamer::new();

        assert_eq!(namer.next_millis(1_000), 1_000);
        assert_eq!(namer.next_millis(1_000), 1_001);
        assert_eq!(namer.next_millis(999), 1_002);
        assert_eq!(namer.next_millis(5_000), 5_000);
    }

    #[test]
    fn test_many_names_are_unique() {
        let namer = AssetNamer::new();
        let names: HashSet<String> = (0..1_000)
            .map(|_| namer.name("photo.jpg", "gallery").unwrap())
            .collect();

        assert_eq!(names.len(), 1_000);
    }

    #[test]
    fn test_names_sort_by_issue_order() {
        let namer = AssetNamer::new();
        let first: AssetName = namer.name("a.webp", "logo").unwrap().parse().unwrap();
        let second: AssetName = namer.name("b.webp", "logo").unwrap().parse().unwrap();

        assert!(second.timestamp() > first.timestamp());
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.JPEG"), ".jpeg");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of("weird.p g"), "");
    }

    #[test]
    fn test_parse_prefix_with_hyphen() {
        let parsed: AssetName = "bank-logo-1700000000000-0a1b2c3d.webp".parse().unwrap();

        assert_eq!(parsed.prefix(), "bank-logo");
        assert_eq!(parsed.timestamp().timestamp_millis(), 1_700_000_000_000);
        assert_eq!(parsed.to_string(), "bank-logo-1700000000000-0a1b2c3d.webp");
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert!("stray.webp".parse::<AssetName>().is_err());
        assert!("logo-abc-0a1b2c3d.webp".parse::<AssetName>().is_err());
        assert!("logo-1700000000000-XYZ.webp".parse::<AssetName>().is_err());
    }
}
