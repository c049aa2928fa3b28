//! API models for request payloads

use serde::Deserialize;

/// Request for creating a video record before its upload
#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    pub title: String,
    pub description: Option<String>,
}
