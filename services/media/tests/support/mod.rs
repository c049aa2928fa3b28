//! In-memory collaborators for pipeline tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use common::error::{DatabaseError, DatabaseResult};
use media::database::VideoStore;
use media::models::{Dimensions, StoredObject, VideoRecord};
use media::object_store::{ObjectStore, S3ObjectStore, SignError, UploadError};
use media::probe::{MediaProbe, ProbeError};
use media::transcoder::{TranscodeError, Transcoder, processed_path};
use tempfile::TempPath;
use uuid::Uuid;

pub const BUCKET: &str = "tubely-test-videos";

#[derive(Default)]
pub struct InMemoryVideos {
    records: Mutex<HashMap<Uuid, VideoRecord>>,
    fail_updates: AtomicBool,
}

impl InMemoryVideos {
    pub fn with(video: &VideoRecord) -> Self {
        let store = Self::default();
        store.insert(video.clone());
        store
    }

    pub fn insert(&self, video: VideoRecord) {
        self.records.lock().unwrap().insert(video.id, video);
    }

    pub fn snapshot(&self, id: Uuid) -> Option<VideoRecord> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    fn write(&self, id: Uuid, apply: impl FnOnce(&mut VideoRecord)) -> DatabaseResult<VideoRecord> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DatabaseError::Configuration("database is read-only".to_string()));
        }
        let mut records = self.records.lock().unwrap();
        let video = records
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(id.to_string()))?;
        apply(video);
        video.updated_at = Utc::now();
        Ok(video.clone())
    }
}

#[async_trait]
impl VideoStore for InMemoryVideos {
    async fn create(&self, video: &VideoRecord) -> DatabaseResult<()> {
        self.insert(video.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DatabaseResult<Option<VideoRecord>> {
        Ok(self.snapshot(id))
    }

    async fn set_video(&self, id: Uuid, object: &StoredObject) -> DatabaseResult<VideoRecord> {
        self.write(id, |video| video.video = Some(object.clone()))
    }

    async fn set_thumbnail(&self, id: Uuid, url: &str) -> DatabaseResult<VideoRecord> {
        self.write(id, |video| video.thumbnail_url = Some(url.to_string()))
    }
}

/// Probe returning fixed dimensions, recording the size of what it saw.
pub struct FixedProbe {
    dimensions: Option<Dimensions>,
    calls: AtomicUsize,
    seen_len: Mutex<Option<u64>>,
}

impl FixedProbe {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dimensions: Some(Dimensions::new(width, height)),
            calls: AtomicUsize::new(0),
            seen_len: Mutex::new(None),
        }
    }

    /// Probe that reports no streams.
    pub fn empty() -> Self {
        Self {
            dimensions: None,
            calls: AtomicUsize::new(0),
            seen_len: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_len(&self) -> Option<u64> {
        *self.seen_len.lock().unwrap()
    }
}

#[async_trait]
impl MediaProbe for FixedProbe {
    async fn dimensions(&self, path: &Path) -> Result<Dimensions, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let len = std::fs::metadata(path).map(|m| m.len()).ok();
        *self.seen_len.lock().unwrap() = len;
        self.dimensions.ok_or(ProbeError::NoStreams)
    }
}

/// Transcoder that copies the input to the processed path.
#[derive(Default)]
pub struct CopyTranscoder {
    fail: bool,
    outputs: Mutex<Vec<PathBuf>>,
}

impl CopyTranscoder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            outputs: Mutex::new(Vec::new()),
        }
    }

    pub fn outputs(&self) -> Vec<PathBuf> {
        self.outputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn rewrite(&self, input: &Path) -> Result<TempPath, TranscodeError> {
        let output = processed_path(input);
        self.outputs.lock().unwrap().push(output.clone());
        let output = TempPath::from_path(output);

        if self.fail {
            // Leave a partial file behind like a crashed ffmpeg would.
            std::fs::write(&output, b"partial").unwrap();
            return Err(TranscodeError::EmptyOutput(output.to_path_buf()));
        }

        std::fs::copy(input, &output).unwrap();
        Ok(output)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Object store that keeps uploads in memory and presigns offline.
pub struct RecordingStore {
    signer: S3ObjectStore,
    uploads: Mutex<Vec<RecordedUpload>>,
    fail_uploads: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new(
                "AKIDEXAMPLE",
                "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
                None,
                None,
                "test",
            ))
            .build();

        Self {
            signer: S3ObjectStore::new(aws_sdk_s3::Client::from_conf(config)),
            uploads: Mutex::new(Vec::new()),
            fail_uploads: AtomicBool::new(false),
        }
    }

    pub fn fail_uploads(&self) {
        self.fail_uploads.store(true, Ordering::SeqCst);
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        file: &Path,
        content_type: &str,
    ) -> Result<(), UploadError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(UploadError::Remote {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "service unavailable".to_string(),
            });
        }

        let body = tokio::fs::read(file).await.map_err(|e| UploadError::Source {
            path: file.display().to_string(),
            message: e.to_string(),
        })?;
        self.uploads.lock().unwrap().push(RecordedUpload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            body,
        });
        Ok(())
    }

    async fn sign(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, SignError> {
        self.signer.sign(bucket, key, ttl).await
    }
}

/// Number of entries left in a directory.
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
