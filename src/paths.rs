//! Path model: absolute s3 locations and listing-result entries
//!
//! An object store has no real directories; keys sharing a leading
//! `prefix/` substring are presented here as if the prefix were one.

use chrono::{DateTime, Utc};
use std::fmt;

pub const PROTOCOL: &str = "s3://";

/// A bucket plus a slash-delimited key prefix within it, normalized so that
/// `.` and `..` are resolved as if the bucket root were the filesystem root.
///
/// Tracks a location being visited or checked, as opposed to
/// [`ListingEntry`], which wraps a single result row of a listing query.
#[derive(Debug, Clone)]
pub struct S3Path {
    pub bucket: Option<String>,
    pub key: Option<String>,
}

/// Resolve `.` / `..` / empty segments as if rooted at `/`.
///
/// `..` at the root is dropped rather than escaping above it, the same
/// clamping a chroot-style normalization applies.
fn normalize_segments(raw: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = Vec::new();
    for seg in raw.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts
}

impl S3Path {
    /// Build a path from already-split components, re-normalizing the key.
    pub fn new(bucket: Option<&str>, key: Option<&str>) -> Self {
        let bucket = bucket.filter(|b| !b.is_empty()).map(str::to_string);
        let key = match (&bucket, key) {
            (Some(_), Some(k)) => {
                let parts = normalize_segments(k);
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("/"))
                }
            }
            _ => None,
        };
        S3Path { bucket, key }
    }

    /// Parse any string into a path: strip an optional `s3://` prefix,
    /// normalize, then split bucket from key. Permissive by design; bad
    /// bucket names are only rejected later by the backend.
    pub fn from_path(raw: &str) -> Self {
        let raw = raw.strip_prefix(PROTOCOL).unwrap_or(raw);
        let parts = normalize_segments(raw);

        match parts.split_first() {
            None => S3Path { bucket: None, key: None },
            Some((bucket, rest)) => {
                let key = if rest.is_empty() {
                    None
                } else {
                    Some(rest.join("/"))
                };
                S3Path {
                    bucket: Some((*bucket).to_string()),
                    key,
                }
            }
        }
    }

    /// Final key segment, if any.
    pub fn name(&self) -> Option<&str> {
        self.key.as_deref().and_then(|k| k.rsplit('/').next())
    }

    /// The containing location: drops the last key segment, or the bucket
    /// itself once the key is exhausted. The root is its own parent.
    pub fn parent(&self) -> S3Path {
        match &self.key {
            Some(k) => match k.rsplit_once('/') {
                Some((rest, _)) => S3Path {
                    bucket: self.bucket.clone(),
                    key: Some(rest.to_string()),
                },
                None => S3Path {
                    bucket: self.bucket.clone(),
                    key: None,
                },
            },
            None => S3Path {
                bucket: None,
                key: None,
            },
        }
    }

    /// Full path as accepted by the cli, with the protocol prefix. Used for
    /// display and as the cache key.
    pub fn canonical(&self) -> String {
        match &self.bucket {
            None => PROTOCOL.to_string(),
            Some(b) => format!("{}{}/{}", PROTOCOL, b, self.key.as_deref().unwrap_or("")),
        }
    }

    /// Protocol-less absolute rendering, used for bookmark comparison.
    pub fn path_string(&self) -> String {
        match &self.bucket {
            None => "/".to_string(),
            Some(b) => format!("/{}/{}", b, self.key.as_deref().unwrap_or("")),
        }
    }

    /// Concise rendering for prompts: deep keys elide the middle segments.
    pub fn short_format(&self) -> String {
        let Some(bucket) = &self.bucket else {
            return "/".to_string();
        };

        match &self.key {
            Some(k) if k.contains('/') => {
                format!("{}/…/{}", bucket, self.name().unwrap_or(""))
            }
            _ => format!("{}/{}", bucket, self.key.as_deref().unwrap_or("")),
        }
    }
}

impl PartialEq for S3Path {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for S3Path {}

impl fmt::Display for S3Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_string())
    }
}

/// One row of a listing: a bucket, a synthesized prefix, or a real key.
///
/// Prefix and key names are relative to the query that produced them and
/// only meaningful in that context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingEntry {
    Bucket { name: String },
    Prefix { name: String },
    Key {
        name: String,
        updated_on: Option<DateTime<Utc>>,
    },
}

impl ListingEntry {
    pub fn bucket(name: impl Into<String>) -> Self {
        ListingEntry::Bucket { name: name.into() }
    }

    pub fn prefix(name: impl Into<String>) -> Self {
        ListingEntry::Prefix { name: name.into() }
    }

    pub fn key(name: impl Into<String>, updated_on: Option<DateTime<Utc>>) -> Self {
        ListingEntry::Key {
            name: name.into(),
            updated_on,
        }
    }

    /// True only for keys; buckets and prefixes can be descended into.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ListingEntry::Key { .. })
    }

    /// The completion/navigation spelling: buckets are absolute, prefixes
    /// and keys stay relative to the query that produced them.
    pub fn display_name(&self) -> String {
        match self {
            ListingEntry::Bucket { name } => format!("/{}/", name),
            ListingEntry::Prefix { name } => name.clone(),
            ListingEntry::Key { name, .. } => name.clone(),
        }
    }

    /// Long-listing line: a 19-wide detail column (type label or modified
    /// time) followed by the name. The bookmark annotation is transient
    /// presentation state, passed in rather than stored.
    pub fn detail_line(&self, bookmark: Option<&str>) -> String {
        match self {
            ListingEntry::Bucket { name } => {
                format!("{: >19} {}", annotate_bookmark("BUCKET", bookmark), name)
            }
            ListingEntry::Prefix { name } => {
                format!("{: >19} {}", annotate_bookmark("PREFIX", bookmark), name)
            }
            ListingEntry::Key { name, updated_on } => {
                let ts = updated_on
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                format!("{: >19} {}", ts, name)
            }
        }
    }
}

impl fmt::Display for ListingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

fn annotate_bookmark(label: &str, bookmark: Option<&str>) -> String {
    match bookmark {
        Some(b) => format!("\x1b[33m${}\x1b[0m {}", b, label),
        None => label.to_string(),
    }
}
