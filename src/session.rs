//! Navigation session
//!
//! Owns the current location, the listing cache, the bookmark set, and the
//! storage client; everything the command dispatcher and the completion
//! engine need is reached through a session handle rather than ambient
//! state.

use crate::bookmarks::BookmarkManager;
use crate::cache::ListingCache;
use crate::client::{HeadMeta, ObjectBody, ObjectStore};
use crate::error::Result;
use crate::paths::{ListingEntry, S3Path, PROTOCOL};
use crate::tokeniser;
use log::debug;
use std::collections::HashMap;
use std::path::Path;

pub struct Session {
    pub current_path: S3Path,
    pub cache: ListingCache,
    pub bookmarks: Option<BookmarkManager>,
    client: Box<dyn ObjectStore>,
}

impl Session {
    pub fn new(
        client: Box<dyn ObjectStore>,
        working_dir: &str,
        bookmarks: Option<BookmarkManager>,
    ) -> Self {
        Session {
            current_path: S3Path::from_path(working_dir),
            cache: ListingCache::new(),
            bookmarks,
            client,
        }
    }

    /// Bookmark name -> stored path string, the render context for
    /// variable expansion inside typed paths.
    pub fn bookmark_context(&self) -> HashMap<String, String> {
        self.bookmarks
            .as_ref()
            .map(|b| b.context())
            .unwrap_or_default()
    }

    /// Resolve a typed, possibly relative path against the current
    /// location: expand bookmark variables, strip the protocol prefix,
    /// special-case `~` as the current bucket root, then join and
    /// normalize. Idempotent on already-canonical paths.
    pub fn normalise_path(&self, partial: &str) -> Result<S3Path> {
        let context = self.bookmark_context();
        let rendered = tokeniser::render(&tokeniser::tokenise(partial)?, &context)?;

        // a protocol prefix makes the path absolute even without a
        // leading slash
        let (rendered, had_protocol) = match rendered.strip_prefix(PROTOCOL) {
            Some(rest) => (rest.to_string(), true),
            None => (rendered, false),
        };

        if rendered == "~" || rendered == "~/" {
            return Ok(S3Path::new(self.current_path.bucket.as_deref(), None));
        }

        let joined = if had_protocol || rendered.starts_with('/') {
            rendered
        } else {
            format!("{}/{}", self.current_path.path_string(), rendered)
        };

        Ok(S3Path::from_path(&joined))
    }

    /// Cached listing of direct children.
    pub fn ls(&mut self, path: &S3Path, fragment: bool) -> Result<Vec<ListingEntry>> {
        let client = &self.client;
        self.cache
            .get_or_fetch(path, fragment, || client.list_children(path, fragment))
    }

    /// Whether a path can be navigated into. Bucket roots (and the
    /// namespace root) always exist; anything deeper exists iff listing
    /// it yields children.
    pub fn exists(&mut self, path: &S3Path) -> Result<bool> {
        if path.key.is_none() {
            return Ok(true);
        }
        Ok(!self.ls(path, false)?.is_empty())
    }

    /// Change the current location; returns false (leaving the location
    /// unchanged) if the target is not a listable directory.
    pub fn cd(&mut self, raw: &str) -> Result<bool> {
        let target = self.normalise_path(raw)?;

        if self.exists(&target)? {
            debug!("cd {} -> {}", self.current_path, target);
            self.current_path = target;
            return Ok(true);
        }

        Ok(false)
    }

    pub fn head(&self, path: &S3Path) -> Result<HeadMeta> {
        self.client.head(path)
    }

    pub fn read(&self, path: &S3Path) -> Result<ObjectBody> {
        self.client.read(path)
    }

    /// Upload a local file; ancestor listings may now be stale.
    pub fn put(&mut self, local: &Path, path: &S3Path) -> Result<()> {
        self.client.write(local, path)?;
        self.on_write(path);
        Ok(())
    }

    pub fn get(&self, path: &S3Path, local: &Path) -> Result<()> {
        self.client.download(path, local)
    }

    /// Delete a key; the prefix chain above it may have vanished.
    pub fn rm(&mut self, path: &S3Path) -> Result<()> {
        self.client.delete(path)?;
        self.on_delete(path);
        Ok(())
    }

    pub fn on_write(&mut self, path: &S3Path) {
        self.cache.invalidate_prefix_chain(path);
    }

    pub fn on_delete(&mut self, path: &S3Path) {
        self.cache.invalidate_prefix_chain(path);
    }

    /// Bookmark names annotated onto listing entries for the long format.
    /// Entries that fail to normalise (e.g. a key whose literal name looks
    /// like an unknown variable) are simply left unannotated.
    pub fn annotate_bookmarks(&self, entries: &[ListingEntry]) -> Vec<Option<String>> {
        let Some(bookmarks) = &self.bookmarks else {
            return vec![None; entries.len()];
        };

        let by_path: HashMap<String, String> = bookmarks
            .context()
            .into_iter()
            .map(|(name, path)| (path, name))
            .collect();

        entries
            .iter()
            .map(|e| {
                self.normalise_path(&e.display_name())
                    .ok()
                    .and_then(|p| by_path.get(&p.path_string()).cloned())
            })
            .collect()
    }
}
