//! End-to-end navigation tests over an in-memory object store.
//!
//! The store reproduces the backend's prefix/delimiter listing arithmetic
//! so session, cache, bookmarks, and completion are exercised together
//! without a network.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::Path;
use std::rc::Rc;

use s3nav::bookmarks::BookmarkManager;
use s3nav::client::{HeadMeta, ObjectBody, ObjectStore};
use s3nav::completion::{Candidate, CompletionEngine};
use s3nav::error::{Error, Result};
use s3nav::paths::{ListingEntry, S3Path};
use s3nav::session::Session;

struct MemoryStore {
    objects: RefCell<BTreeSet<(String, String)>>,
}

impl MemoryStore {
    fn new(objects: &[(&str, &str)]) -> Self {
        MemoryStore {
            objects: RefCell::new(
                objects
                    .iter()
                    .map(|(b, k)| (b.to_string(), k.to_string()))
                    .collect(),
            ),
        }
    }

    fn buckets(&self, filter: Option<&str>) -> Vec<ListingEntry> {
        let names: BTreeSet<String> = self
            .objects
            .borrow()
            .iter()
            .map(|(b, _)| b.clone())
            .filter(|b| filter.map_or(true, |f| b.starts_with(f)))
            .collect();
        names.into_iter().map(ListingEntry::bucket).collect()
    }

    fn coordinates(path: &S3Path) -> Result<(String, String)> {
        match (&path.bucket, &path.key) {
            (Some(b), Some(k)) => Ok((b.clone(), k.clone())),
            _ => Err(Error::BackendUnavailable(format!(
                "'{}' does not name a key",
                path.canonical()
            ))),
        }
    }
}

impl ObjectStore for MemoryStore {
    fn list_children(&self, path: &S3Path, fragment: bool) -> Result<Vec<ListingEntry>> {
        let Some(bucket) = &path.bucket else {
            return Ok(self.buckets(None));
        };
        if path.key.is_none() && fragment {
            return Ok(self.buckets(Some(bucket)));
        }

        let search_path = match (&path.key, fragment) {
            (Some(k), false) => format!("{}/", k),
            (Some(k), true) => k.clone(),
            (None, _) => String::new(),
        };
        let search_len = search_path.rfind('/').map_or(0, |i| i + 1);

        let objects = self.objects.borrow();
        let mut prefixes = BTreeSet::new();
        let mut keys = Vec::new();
        for (b, k) in objects.iter() {
            if b != bucket || !k.starts_with(&search_path) || *k == search_path {
                continue;
            }
            match k[search_path.len()..].find('/') {
                Some(i) => {
                    prefixes.insert(k[search_len..search_path.len() + i + 1].to_string());
                }
                None => keys.push(k[search_len..].to_string()),
            }
        }

        let mut res: Vec<ListingEntry> =
            prefixes.into_iter().map(ListingEntry::prefix).collect();
        res.extend(keys.into_iter().map(|k| ListingEntry::key(k, None)));
        Ok(res)
    }

    fn head(&self, _path: &S3Path) -> Result<HeadMeta> {
        Ok(HeadMeta::default())
    }

    fn read(&self, path: &S3Path) -> Result<ObjectBody> {
        let coords = Self::coordinates(path)?;
        if !self.objects.borrow().contains(&coords) {
            return Err(Error::BackendUnavailable(format!(
                "no such key: {}",
                path.canonical()
            )));
        }
        Ok(ObjectBody {
            content_type: Some("text/plain".to_string()),
            bytes: format!("contents of {}", coords.1).into_bytes(),
        })
    }

    fn write(&self, _local: &Path, path: &S3Path) -> Result<()> {
        let coords = Self::coordinates(path)?;
        self.objects.borrow_mut().insert(coords);
        Ok(())
    }

    fn download(&self, path: &S3Path, _local: &Path) -> Result<()> {
        self.read(path).map(|_| ())
    }

    fn delete(&self, path: &S3Path) -> Result<()> {
        let coords = Self::coordinates(path)?;
        self.objects.borrow_mut().remove(&coords);
        Ok(())
    }
}

fn store() -> MemoryStore {
    MemoryStore::new(&[
        ("data", "logs/2024/a.txt"),
        ("data", "logs/2024/b.txt"),
        ("data", "logs/readme.md"),
        ("data", "top.txt"),
        ("media", "img.png"),
    ])
}

fn names(entries: &[ListingEntry]) -> Vec<String> {
    entries.iter().map(|e| e.display_name()).collect()
}

#[test]
fn test_walks_the_namespace_like_a_filesystem() {
    let mut session = Session::new(Box::new(store()), "/", None);

    let root = session.normalise_path("").unwrap();
    assert_eq!(
        names(&session.ls(&root, false).unwrap()),
        vec!["/data/", "/media/"]
    );

    assert!(session.cd("data").unwrap());
    assert_eq!(session.current_path.canonical(), "s3://data/");

    let here = session.normalise_path(".").unwrap();
    assert_eq!(
        names(&session.ls(&here, false).unwrap()),
        vec!["logs/", "top.txt"]
    );

    assert!(session.cd("logs/2024").unwrap());
    assert_eq!(session.current_path.canonical(), "s3://data/logs/2024");

    assert!(session.cd("..").unwrap());
    assert_eq!(session.current_path.canonical(), "s3://data/logs");

    // a target with no children is not a directory; location is unchanged
    assert!(!session.cd("nope").unwrap());
    assert_eq!(session.current_path.canonical(), "s3://data/logs");
}

#[test]
fn test_completion_against_the_store() {
    let session = Rc::new(RefCell::new(Session::new(Box::new(store()), "/data", None)));
    let engine = CompletionEngine::new(session);

    // cd only offers navigable targets
    let buffer = "cd lo";
    assert_eq!(
        engine.complete(buffer, buffer.len()).unwrap(),
        vec![Candidate {
            replacement: "logs/".to_string(),
            start: 3,
        }]
    );

    // cat offers keys, replacing only the final segment
    let buffer = "cat logs/re";
    assert_eq!(
        engine.complete(buffer, buffer.len()).unwrap(),
        vec![Candidate {
            replacement: "readme.md".to_string(),
            start: 9,
        }]
    );

    // descending into a complete prefix lists everything under it
    let buffer = "ls logs/2024/";
    let res = engine.complete(buffer, buffer.len()).unwrap();
    let replacements: Vec<&str> = res.iter().map(|c| c.replacement.as_str()).collect();
    assert!(replacements.is_empty(), "ls must not offer keys: {replacements:?}");

    let buffer = "cat logs/2024/";
    let res = engine.complete(buffer, buffer.len()).unwrap();
    let replacements: Vec<&str> = res.iter().map(|c| c.replacement.as_str()).collect();
    assert_eq!(replacements, vec!["a.txt", "b.txt"]);
}

#[test]
fn test_mutations_are_visible_without_a_refresh() {
    let mut session = Session::new(Box::new(store()), "/data", None);
    let logs = session.normalise_path("logs").unwrap();

    assert_eq!(
        names(&session.ls(&logs, false).unwrap()),
        vec!["2024/", "readme.md"]
    );

    let target = session.normalise_path("logs/readme.md").unwrap();
    session.rm(&target).unwrap();
    assert_eq!(names(&session.ls(&logs, false).unwrap()), vec!["2024/"]);

    let dest = session.normalise_path("logs/new.txt").unwrap();
    session.put(Path::new("ignored.txt"), &dest).unwrap();
    assert_eq!(
        names(&session.ls(&logs, false).unwrap()),
        vec!["2024/", "new.txt"]
    );
}

#[test]
fn test_reads_and_missing_keys() {
    let session = Session::new(Box::new(store()), "/data", None);

    let body = session
        .read(&session.normalise_path("top.txt").unwrap())
        .unwrap();
    assert_eq!(body.bytes, b"contents of top.txt");

    assert!(matches!(
        session.read(&session.normalise_path("absent.txt").unwrap()),
        Err(Error::BackendUnavailable(_))
    ));
}

#[test]
fn test_bookmarks_expand_in_navigation() {
    let dir = tempfile::tempdir().unwrap();
    let mut bookmarks = BookmarkManager::open(&dir.path().join("bookmarks.json"));
    bookmarks.add("logs", "/data/logs").unwrap();

    let mut session = Session::new(Box::new(store()), "/", Some(bookmarks));

    assert!(session.cd("$logs/2024").unwrap());
    assert_eq!(session.current_path.canonical(), "s3://data/logs/2024");

    assert!(matches!(
        session.cd("$missing"),
        Err(Error::UnknownVariable(_))
    ));
}
