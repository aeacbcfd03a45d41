//! Object store abstraction
//!
//! One trait, two backends: S3 for production, a filesystem tree for
//! development and tests. Handlers only ever see the trait.

pub mod local;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use thiserror::Error;

pub use local::LocalStore;
pub use s3::S3Store;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("invalid page token")]
    BadToken,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Forward-only body stream, handed to the transport without buffering.
pub type ObjectByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Metadata snapshot of a stored object at observation time.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectMeta {
    pub content_type: String,
    pub content_length: i64,
    pub last_modified: DateTime<Utc>,
}

pub struct StoredObject {
    pub meta: ObjectMeta,
    pub body: ObjectByteStream,
}

/// One item of a raw listing, verbatim from the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct RawObject {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size: i64,
}

/// Raw listing page. `next_token` is set only when the backend signals
/// that more results remain.
#[derive(Debug, Default)]
pub struct RawListing {
    pub items: Vec<RawObject>,
    pub next_token: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read-only existence probe, no side effects.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    async fn head(&self, key: &str) -> Result<ObjectMeta, StoreError>;

    async fn get(&self, key: &str) -> Result<StoredObject, StoreError>;

    /// Unconditional write; overwrites any existing object at `key`.
    async fn put(&self, key: &str, content: Bytes, content_type: &str) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Fresh enumeration filtered by key prefix, at most `max_keys` items.
    async fn list(&self, prefix: &str, max_keys: i32) -> Result<RawListing, StoreError>;

    /// Resume enumeration from a token returned by a prior listing. The
    /// token carries position and filter state; no prefix is passed.
    async fn list_from(&self, token: &str, max_keys: i32) -> Result<RawListing, StoreError>;
}
