//! Request/response schemas for the files API
//!
//! Includes listing-query validation. The raw query keeps every field
//! optional so "explicitly provided" can be told apart from "defaulted";
//! a caller may legally pass the default value explicitly.

use super::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i32 = 10;
pub const MIN_PAGE_SIZE: i32 = 10;
pub const MAX_PAGE_SIZE: i32 = 100;

// ============================================================================
// RESPONSE SCHEMAS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_path: String,
    pub last_modified: DateTime<Utc>,
    pub size_bytes: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListFilesResponse {
    pub files: Vec<FileMetadata>,
    /// Serialized as `null` (never an empty string) when no more results
    /// remain, so a caller can't replay a blank token.
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PutFileResponse {
    pub file_path: String,
    pub message: String,
}

// ============================================================================
// LISTING QUERY VALIDATION
// ============================================================================

/// Query parameters as the caller sent them, presence preserved.
#[derive(Debug, Default, Deserialize)]
pub struct RawListQuery {
    pub page_size: Option<i32>,
    pub directory: Option<String>,
    pub page_token: Option<String>,
}

/// Validated listing query with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page_size: i32,
    pub directory: String,
    pub page_token: Option<String>,
}

impl RawListQuery {
    pub fn validate(self) -> Result<ListQuery, ApiError> {
        // Range of an explicitly supplied page_size is checked first, so
        // an out-of-range value reports as such even when a page_token is
        // also present.
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ApiError::Validation(format!(
                "page_size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }

        // An empty token is treated as absent.
        let page_token = self.page_token.filter(|t| !t.is_empty());

        if page_token.is_some() && (self.page_size.is_some() || self.directory.is_some()) {
            return Err(ApiError::Validation(
                "'page_token' is mutually exclusive with 'page_size' and 'directory'".to_string(),
            ));
        }

        Ok(ListQuery {
            page_size,
            directory: self.directory.unwrap_or_default(),
            page_token,
        })
    }
}
