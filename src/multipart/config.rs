//! Multipart limits handed to the parsing collaborator.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dispatch::error::{DispatchError, DispatchResult};

/// Size limits and spooling settings for multipart bodies.
///
/// `-1` means no limit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MultipartConfig {
    /// Maximum size of the whole request body in bytes.
    pub max_request_size: i64,

    /// Maximum size of a single uploaded file in bytes.
    pub max_file_size: i64,

    /// Files below this size stay in memory.
    pub max_in_memory_size: i64,

    /// Directory for files spooled to disk (system temp dir if unset).
    pub temp_dir: Option<PathBuf>,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_request_size: -1,
            max_file_size: -1,
            max_in_memory_size: 10 * 1024,
            temp_dir: None,
        }
    }
}

impl MultipartConfig {
    /// Directory to spool files into.
    pub fn upload_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Reject a declared body length above `max_request_size`.
    ///
    /// Unknown lengths (`-1`) pass; the parser enforces the limit while streaming.
    pub fn check_request_size(&self, declared: i64) -> DispatchResult<()> {
        if self.max_request_size >= 0 && declared > self.max_request_size {
            return Err(DispatchError::PayloadTooLarge {
                limit: self.max_request_size,
                actual: declared,
            });
        }
        Ok(())
    }
}
