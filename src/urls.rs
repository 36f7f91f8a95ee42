//! URL list parsing and cache key normalization.
//!
//! The list of resources to precache arrives as configuration: either a
//! TOML array or a plain-text manifest with one entry per line (blank
//! lines and `#` comments ignored). Entries are absolute `http(s)` URLs
//! or root-relative paths like `/assets/app.js`.

use std::collections::HashSet;

use crate::error::{Error, Result};

/// Normalizes a resource identifier into its cache key.
///
/// Requests are keyed GET-only by URL: fragments never reach the server,
/// so they are stripped; queries are part of request identity and kept.
#[must_use]
pub fn cache_key(url: &str) -> String {
    let trimmed = url.trim();
    let without_fragment = match trimmed.split_once('#') {
        Some((before, _fragment)) => before,
        None => trimmed,
    };
    // Stripping a fragment can expose trailing whitespace.
    without_fragment.trim_end().to_string()
}

/// Validates a single list entry, returning its normalized form.
fn normalize_entry(entry: &str) -> Result<String> {
    let key = cache_key(entry);
    if key.is_empty() {
        return Err(Error::Config("empty URL list entry".to_string()));
    }
    if key.starts_with('/') || key.starts_with("http://") || key.starts_with("https://") {
        Ok(key)
    } else {
        Err(Error::Config(format!(
            "URL list entry must be absolute or root-relative: {entry}"
        )))
    }
}

/// Ordered, de-duplicated list of resources to precache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlList {
    entries: Vec<String>,
}

impl UrlList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builds a list from raw entries, validating and de-duplicating.
    ///
    /// First occurrence wins; order is otherwise preserved.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry is empty or not absolute/root-relative.
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut list = Vec::new();
        for entry in entries {
            let normalized = normalize_entry(entry.as_ref())?;
            if seen.insert(normalized.clone()) {
                list.push(normalized);
            }
        }
        Ok(Self { entries: list })
    }

    /// Parses a plain-text manifest: one entry per line, `#` starts a
    /// comment, blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if any surviving line fails entry validation.
    pub fn parse_manifest(text: &str) -> Result<Self> {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));
        Self::from_entries(entries)
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails to parse.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_manifest(&text)
    }

    /// Normalized entries, in list order.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `url` normalizes to an entry of this list.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        let key = cache_key(url);
        self.entries.iter().any(|e| *e == key)
    }

    /// Iterates over the normalized entries.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a UrlList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
