//! Multipart upload exposure.
//!
//! The dispatcher detects multipart bodies, checks the declared length
//! against `MultipartConfig`, and hands handlers a `RequestUpload`. Parsing
//! the parts is left to whichever parser the handler brings.

pub mod config;
pub mod upload;

pub use config::MultipartConfig;
pub use upload::{is_multipart, RequestUpload};
