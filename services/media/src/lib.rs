//! Video ingestion for Tubely
//!
//! Takes an uploaded MP4 stream, stages it on disk, classifies its aspect
//! ratio with `ffprobe`, rewrites it for fast start with `ffmpeg`, uploads it
//! to S3 under an unguessable key and records the location on the video
//! record. Reads go through [`playback::PlaybackSigner`], which hands out
//! short-lived presigned URLs.

pub mod asset_key;
pub mod database;
pub mod error;
pub mod models;
pub mod object_store;
pub mod pipeline;
pub mod playback;
pub mod probe;
pub mod thumbnail;
pub mod tool;
pub mod transcoder;

pub use error::IngestError;
pub use pipeline::{IngestSettings, IngestionPipeline, UploadRequest};
pub use playback::PlaybackSigner;
