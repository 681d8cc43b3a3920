//! Storage backend
//!
//! `ObjectStore` is the seam between the navigation core and the remote
//! service; `S3Client` is the real implementation over the AWS SDK. The
//! shell is single-threaded and synchronous, so the async SDK is driven by
//! a current-thread runtime and `block_on` per call.

use crate::error::{Error, Result};
use crate::paths::{ListingEntry, S3Path};
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

/// Head metadata stripped down to the fields the shell displays.
#[derive(Debug, Clone, Default)]
pub struct HeadMeta {
    pub content_length: Option<i64>,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub metadata: BTreeMap<String, String>,
}

/// A fetched object body plus the content type needed to decide whether
/// it is safe to print.
#[derive(Debug, Clone)]
pub struct ObjectBody {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// The four-and-a-half primitives the navigation core needs from a remote
/// object store. Implementations map their own failures onto
/// [`Error::BackendUnavailable`].
pub trait ObjectStore {
    /// List direct children of `path`. In fragment mode the final key
    /// segment is an in-progress partial name to match against, rather
    /// than a complete segment to descend into.
    fn list_children(&self, path: &S3Path, fragment: bool) -> Result<Vec<ListingEntry>>;

    fn head(&self, path: &S3Path) -> Result<HeadMeta>;

    fn read(&self, path: &S3Path) -> Result<ObjectBody>;

    fn write(&self, local: &Path, path: &S3Path) -> Result<()>;

    fn download(&self, path: &S3Path, local: &Path) -> Result<()>;

    fn delete(&self, path: &S3Path) -> Result<()>;
}

pub struct S3Client {
    client: aws_sdk_s3::Client,
    runtime: tokio::runtime::Runtime,
}

fn backend_err(e: impl std::fmt::Display) -> Error {
    Error::BackendUnavailable(e.to_string())
}

fn to_chrono(d: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(d.secs(), d.subsec_nanos())
}

impl S3Client {
    /// Connect using the default AWS credential chain, optionally against
    /// a custom endpoint (path-style addressing, for S3-compatible stores).
    pub fn new(endpoint: Option<&str>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(backend_err)?;

        let config =
            runtime.block_on(aws_config::load_defaults(aws_config::BehaviorVersion::latest()));
        let mut builder = aws_sdk_s3::config::Builder::from(&config);
        if let Some(url) = endpoint {
            builder = builder.endpoint_url(url).force_path_style(true);
        }
        let client = aws_sdk_s3::Client::from_conf(builder.build());

        Ok(S3Client { client, runtime })
    }

    fn list_buckets(&self, filter: Option<&str>) -> Result<Vec<ListingEntry>> {
        debug!("listing buckets, filter: {:?}", filter);
        let out = self
            .runtime
            .block_on(self.client.list_buckets().send())
            .map_err(backend_err)?;

        let res = out
            .buckets()
            .iter()
            .filter_map(|b| b.name())
            .filter(|name| filter.map_or(true, |f| name.starts_with(f)))
            .map(ListingEntry::bucket)
            .collect();

        Ok(res)
    }
}

impl ObjectStore for S3Client {
    fn list_children(&self, path: &S3Path, fragment: bool) -> Result<Vec<ListingEntry>> {
        // At the root (or typing a bucket name) the children are buckets
        let Some(bucket) = &path.bucket else {
            return self.list_buckets(None);
        };
        if path.key.is_none() && fragment {
            return self.list_buckets(Some(bucket));
        }

        // A complete segment descends into the prefix; a fragment matches
        // siblings sharing the partial final segment
        let search_path = match (&path.key, fragment) {
            (Some(k), false) => format!("{}/", k),
            (Some(k), true) => k.clone(),
            (None, _) => String::new(),
        };
        let search_len = search_path.rfind('/').map_or(0, |i| i + 1);

        debug!(
            "listing objects: path={} search_path={:?} fragment={}",
            path, search_path, fragment
        );

        // TODO: paginate listings past the first 1000 results
        let out = self
            .runtime
            .block_on(
                self.client
                    .list_objects_v2()
                    .bucket(bucket)
                    .prefix(&search_path)
                    .delimiter("/")
                    .send(),
            )
            .map_err(backend_err)?;

        let mut res: Vec<ListingEntry> = out
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix())
            .map(|p| ListingEntry::prefix(&p[search_len.min(p.len())..]))
            .collect();

        res.extend(
            out.contents()
                .iter()
                .filter_map(|o| o.key().map(|k| (k, o.last_modified())))
                .filter(|(k, _)| *k != search_path)
                .map(|(k, ts)| {
                    ListingEntry::key(&k[search_len.min(k.len())..], ts.and_then(to_chrono))
                }),
        );

        Ok(res)
    }

    fn head(&self, path: &S3Path) -> Result<HeadMeta> {
        let Some(bucket) = &path.bucket else {
            return Ok(HeadMeta::default());
        };

        match &path.key {
            None => {
                self.runtime
                    .block_on(self.client.head_bucket().bucket(bucket).send())
                    .map_err(backend_err)?;
                Ok(HeadMeta::default())
            }
            Some(key) => {
                let out = self
                    .runtime
                    .block_on(self.client.head_object().bucket(bucket).key(key).send())
                    .map_err(backend_err)?;

                Ok(HeadMeta {
                    content_length: out.content_length(),
                    content_type: out.content_type().map(str::to_string),
                    last_modified: out.last_modified().and_then(to_chrono),
                    metadata: out
                        .metadata()
                        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                        .unwrap_or_default(),
                })
            }
        }
    }

    fn read(&self, path: &S3Path) -> Result<ObjectBody> {
        let (bucket, key) = require_key(path)?;

        self.runtime.block_on(async {
            let out = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(backend_err)?;

            let content_type = out.content_type().map(str::to_string);
            let bytes = out
                .body
                .collect()
                .await
                .map_err(backend_err)?
                .into_bytes()
                .to_vec();

            Ok(ObjectBody {
                content_type,
                bytes,
            })
        })
    }

    fn write(&self, local: &Path, path: &S3Path) -> Result<()> {
        let (bucket, key) = require_key(path)?;

        self.runtime.block_on(async {
            let body = aws_sdk_s3::primitives::ByteStream::from_path(local)
                .await
                .map_err(backend_err)?;

            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(backend_err)?;

            Ok(())
        })
    }

    fn download(&self, path: &S3Path, local: &Path) -> Result<()> {
        let body = self.read(path)?;
        std::fs::write(local, body.bytes).map_err(backend_err)
    }

    fn delete(&self, path: &S3Path) -> Result<()> {
        let (bucket, key) = require_key(path)?;

        self.runtime
            .block_on(self.client.delete_object().bucket(bucket).key(key).send())
            .map_err(backend_err)?;

        Ok(())
    }
}

fn require_key(path: &S3Path) -> Result<(&str, &str)> {
    match (&path.bucket, &path.key) {
        (Some(b), Some(k)) => Ok((b.as_str(), k.as_str())),
        _ => Err(Error::BackendUnavailable(format!(
            "'{}' does not name a key",
            path.canonical()
        ))),
    }
}
