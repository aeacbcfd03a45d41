//! Filesystem backend
//!
//! Keys map to files under `<root>/objects`, content types live in a
//! parallel `<root>/meta` sidecar tree. Enumeration is lexicographic;
//! page tokens are URL-safe base64 of the prefix plus the last key
//! returned, so continuation carries its own filter state.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;
use walkdir::WalkDir;

use super::{ObjectMeta, ObjectStore, RawListing, RawObject, StoreError, StoredObject};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
}

#[derive(Serialize, Deserialize)]
struct PageToken {
    prefix: String,
    after: String,
}

fn encode_token(token: &PageToken) -> Result<String, StoreError> {
    let raw = serde_json::to_vec(token).map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(raw))
}

fn decode_token(token: &str) -> Result<PageToken, StoreError> {
    let raw = URL_SAFE_NO_PAD
        .decode(token.as_bytes())
        .map_err(|_| StoreError::BadToken)?;
    serde_json::from_slice(&raw).map_err(|_| StoreError::BadToken)
}

/// Keys map to filesystem paths, so this backend is stricter than S3:
/// empty segments (leading, trailing, or doubled slashes) and `..`
/// components have no file representation and are rejected.
fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty()
        || key.contains('\0')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "..")
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

pub struct LocalStore {
    objects: PathBuf,
    meta: PathBuf,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref();
        let objects = root.join("objects");
        let meta = root.join("meta");
        std::fs::create_dir_all(&objects)?;
        std::fs::create_dir_all(&meta)?;
        Ok(Self { objects, meta })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.objects.join(key))
    }

    fn meta_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.meta.join(format!("{key}.json")))
    }

    async fn read_content_type(&self, key: &str) -> Result<String, StoreError> {
        match tokio::fs::read(self.meta_path(key)?).await {
            Ok(raw) => {
                let sidecar: Sidecar = serde_json::from_slice(&raw)
                    .map_err(|e| StoreError::Backend(format!("sidecar for {key}: {e}")))?;
                Ok(sidecar.content_type)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DEFAULT_CONTENT_TYPE.to_string()),
            Err(e) => Err(e.into()),
        }
    }

    /// All keys, relative to the objects root, sorted lexicographically.
    fn all_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.objects) {
            let entry = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&self.objects) {
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn page(&self, prefix: &str, after: Option<&str>, max_keys: i32) -> Result<RawListing, StoreError> {
        let max = usize::try_from(max_keys.max(0)).unwrap_or(0);
        let keys = self.all_keys()?;
        let mut matching = keys
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .filter(|k| after.map_or(true, |a| k.as_str() > a));

        let mut items = Vec::with_capacity(max);
        for key in matching.by_ref().take(max) {
            let md = std::fs::metadata(self.objects.join(&key))?;
            items.push(RawObject {
                key,
                last_modified: DateTime::<Utc>::from(md.modified()?),
                size: md.len() as i64,
            });
        }

        let next_token = if matching.next().is_some() {
            items
                .last()
                .map(|last| {
                    encode_token(&PageToken {
                        prefix: prefix.to_string(),
                        after: last.key.clone(),
                    })
                })
                .transpose()?
        } else {
            None
        };

        Ok(RawListing { items, next_token })
    }

    /// Metadata for the object file at `key`. A directory materialized as
    /// the parent of other keys is not an object and reports as absent.
    async fn object_metadata(&self, key: &str) -> Result<std::fs::Metadata, StoreError> {
        let md = tokio::fs::metadata(self.object_path(key)?).await?;
        if !md.is_file() {
            return Err(StoreError::Io(std::io::Error::new(
                ErrorKind::NotFound,
                format!("no object at key {key}"),
            )));
        }
        Ok(md)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match tokio::fs::metadata(self.object_path(key)?).await {
            // Only a regular file counts; a prefix directory (e.g. `some`
            // after a put of `some/nested/file.txt`) is not an object.
            Ok(md) => Ok(md.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn head(&self, key: &str) -> Result<ObjectMeta, StoreError> {
        let md = self.object_metadata(key).await?;
        Ok(ObjectMeta {
            content_type: self.read_content_type(key).await?,
            content_length: md.len() as i64,
            last_modified: DateTime::<Utc>::from(md.modified()?),
        })
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StoreError> {
        let meta = self.head(key).await?;
        let file = tokio::fs::File::open(self.object_path(key)?).await?;
        Ok(StoredObject {
            meta,
            body: ReaderStream::new(file).boxed(),
        })
    }

    async fn put(&self, key: &str, content: Bytes, content_type: &str) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &content).await?;

        let meta_path = self.meta_path(key)?;
        if let Some(parent) = meta_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let sidecar = Sidecar {
            content_type: content_type.to_string(),
        };
        let raw = serde_json::to_vec(&sidecar).map_err(|e| StoreError::Backend(e.to_string()))?;
        tokio::fs::write(&meta_path, raw).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.object_metadata(key).await?;
        tokio::fs::remove_file(self.object_path(key)?).await?;
        // The sidecar may legitimately be absent (object written out-of-band).
        match tokio::fs::remove_file(self.meta_path(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str, max_keys: i32) -> Result<RawListing, StoreError> {
        self.page(prefix, None, max_keys)
    }

    async fn list_from(&self, token: &str, max_keys: i32) -> Result<RawListing, StoreError> {
        let token = decode_token(token)?;
        self.page(&token.prefix, Some(&token.after), max_keys)
    }
}
