//! Bookmark persistence
//!
//! Named aliases for absolute paths, kept in a small JSON document
//! (`{"bookmarks": {name: {path, created_on}}}`). The core only ever sees
//! these as a name -> path-string mapping fed to the tokeniser.

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BookmarkFile {
    #[serde(default)]
    bookmarks: BTreeMap<String, Bookmark>,
}

pub struct BookmarkManager {
    file: PathBuf,
    // None when the file exists but could not be read; bookmarking is
    // disabled for the session rather than clobbering the file on save
    bookmarks: Option<BTreeMap<String, Bookmark>>,
}

impl BookmarkManager {
    pub fn open(file: &Path) -> Self {
        let bookmarks = match std::fs::read_to_string(file) {
            // A missing file is fine; an initial copy is saved when the
            // first bookmark is added
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no bookmark file {}, starting empty", file.display());
                Some(BTreeMap::new())
            }
            Err(e) => {
                warn!("error reading bookmark file {}: {}", file.display(), e);
                None
            }
            Ok(raw) => match serde_json::from_str::<BookmarkFile>(&raw) {
                Ok(data) => {
                    debug!("read {} bookmarks", data.bookmarks.len());
                    Some(data.bookmarks)
                }
                Err(e) => {
                    warn!("bad bookmark file format {}: {}", file.display(), e);
                    None
                }
            },
        };

        BookmarkManager {
            file: file.to_path_buf(),
            bookmarks,
        }
    }

    /// False when the bookmark file was unreadable at startup.
    pub fn available(&self) -> bool {
        self.bookmarks.is_some()
    }

    /// Bookmark names: start with alphanumeric or underscore, then up to
    /// 15 more of the same plus hyphens.
    pub fn validate_key(name: &str) -> bool {
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        if !(first.is_ascii_alphanumeric() || first == '_') {
            return false;
        }
        name.len() <= 16
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    pub fn add(&mut self, name: &str, path: &str) -> Result<()> {
        let bookmarks = self
            .bookmarks
            .as_mut()
            .context("bookmarks are unavailable")?;

        bookmarks.insert(
            name.to_string(),
            Bookmark {
                path: path.to_string(),
                created_on: Some(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()),
            },
        );
        self.save()
    }

    /// Remove the named bookmark; false if it didn't exist.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        let bookmarks = self
            .bookmarks
            .as_mut()
            .context("bookmarks are unavailable")?;

        if bookmarks.remove(name).is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Bookmark)> {
        self.bookmarks.iter().flatten()
    }

    /// The tokeniser render context: name -> stored path string.
    pub fn context(&self) -> HashMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.clone(), v.path.clone()))
            .collect()
    }

    fn save(&self) -> Result<()> {
        let data = BookmarkFile {
            bookmarks: self.bookmarks.clone().unwrap_or_default(),
        };
        let raw = serde_json::to_string(&data)?;
        std::fs::write(&self.file, raw)
            .with_context(|| format!("writing bookmark file {}", self.file.display()))?;
        Ok(())
    }
}
