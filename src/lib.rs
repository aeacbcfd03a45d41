//! files-api: a thin REST facade over an object-storage bucket.
//!
//! Upload, metadata lookup, streamed download, paginated listing, and
//! deletion of objects, exposed under `/v1/files`. Durability and
//! consistency are entirely the backing store's concern.

pub mod api;
pub mod config;
pub mod store;
