//! S3 backend
//!
//! Thin translation from the `ObjectStore` trait to aws-sdk-s3 calls.
//! No retries here; the SDK's own retry/timeout configuration applies.

use async_trait::async_trait;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::primitives::{ByteStream, DateTime as AwsDateTime};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio_util::io::ReaderStream;

use super::{ObjectMeta, ObjectStore, RawListing, RawObject, StoreError, StoredObject};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the ambient AWS environment (credentials chain,
    /// region, endpoint overrides).
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&sdk_config), bucket)
    }
}

fn to_utc(dt: Option<&AwsDateTime>) -> DateTime<Utc> {
    dt.and_then(|d| DateTime::from_timestamp(d.secs(), d.subsec_nanos()))
        .unwrap_or_default()
}

fn raw_listing(out: ListObjectsV2Output) -> RawListing {
    let items = out
        .contents()
        .iter()
        .map(|obj| RawObject {
            key: obj.key().unwrap_or_default().to_string(),
            last_modified: to_utc(obj.last_modified()),
            size: obj.size().unwrap_or(0),
        })
        .collect();

    // NextContinuationToken is only meaningful when the page was truncated.
    let next_token = if out.is_truncated().unwrap_or(false) {
        out.next_continuation_token().map(str::to_string)
    } else {
        None
    };

    RawListing { items, next_token }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    Ok(false)
                } else {
                    Err(StoreError::Backend(format!("head {key}: {err}")))
                }
            }
        }
    }

    async fn head(&self, key: &str) -> Result<ObjectMeta, StoreError> {
        let out = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| StoreError::Backend(format!("head {key}: {err}")))?;

        Ok(ObjectMeta {
            content_type: out.content_type().unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
            content_length: out.content_length().unwrap_or(0),
            last_modified: to_utc(out.last_modified()),
        })
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StoreError> {
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| StoreError::Backend(format!("get {key}: {err}")))?;

        let meta = ObjectMeta {
            content_type: out.content_type().unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
            content_length: out.content_length().unwrap_or(0),
            last_modified: to_utc(out.last_modified()),
        };

        let body = ReaderStream::new(out.body.into_async_read()).boxed();

        Ok(StoredObject { meta, body })
    }

    async fn put(&self, key: &str, content: Bytes, content_type: &str) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|err| StoreError::Backend(format!("put {key}: {err}")))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| StoreError::Backend(format!("delete {key}: {err}")))?;
        Ok(())
    }

    async fn list(&self, prefix: &str, max_keys: i32) -> Result<RawListing, StoreError> {
        let mut req = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .max_keys(max_keys);
        if !prefix.is_empty() {
            req = req.prefix(prefix);
        }
        let out = req
            .send()
            .await
            .map_err(|err| StoreError::Backend(format!("list: {err}")))?;
        Ok(raw_listing(out))
    }

    async fn list_from(&self, token: &str, max_keys: i32) -> Result<RawListing, StoreError> {
        let out = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .continuation_token(token)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|err| StoreError::Backend(format!("list continue: {err}")))?;
        Ok(raw_listing(out))
    }
}
