//! keyhop-core: Remote execution and upload operations
//!
//! Turns raw parameter sets into validated connection specs, then drives
//! `keyhop-exec` sessions to run command batches or push content to a host.

pub mod actions;
pub mod config;
pub mod params;

pub use actions::{UploadResponse, execute, execute_with, upload, upload_with};
pub use config::Defaults;
pub use params::{ExecuteParams, ExecuteRequest, UploadParams, UploadRequest};
