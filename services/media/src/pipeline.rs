//! Video ingestion pipeline.
//!
//! One call to [`IngestionPipeline::ingest`] walks a single upload through
//! `Received → Validated → Staged → Classified → Transcoded → Uploaded →
//! Persisted`. Any failure ends the run with an [`IngestError`]. The staging
//! file and the processed file are RAII guards, so both are gone by the time
//! `ingest` returns, whichever stage failed.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{error, info};
use uuid::Uuid;

use crate::asset_key::{AssetKeyAllocator, essence, extension_for};
use crate::database::VideoStore;
use crate::error::IngestError;
use crate::models::{StoredObject, VideoRecord};
use crate::object_store::ObjectStore;
use crate::probe::MediaProbe;
use crate::transcoder::Transcoder;

/// 1 GiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1 << 30;

const STAGING_CHUNK_BYTES: usize = 64 * 1024;

/// Prefix of staging file names.
pub const STAGING_PREFIX: &str = "tubely-upload";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Validated,
    Staged,
    Classified,
    Transcoded,
    Uploaded,
    Persisted,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStage::Received => "received",
            IngestStage::Validated => "validated",
            IngestStage::Staged => "staged",
            IngestStage::Classified => "classified",
            IngestStage::Transcoded => "transcoded",
            IngestStage::Uploaded => "uploaded",
            IngestStage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Pipeline tuning.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Destination bucket for processed videos.
    pub bucket: String,
    /// Accepted media types, compared against the parameter-free essence.
    pub allowed_media_types: Vec<String>,
    /// Hard cap on the number of body bytes copied to disk.
    pub max_upload_bytes: u64,
    /// Where staging files go. `None` means the OS temp dir.
    pub staging_dir: Option<PathBuf>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            bucket: "tubely-videos".to_string(),
            allowed_media_types: vec!["video/mp4".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            staging_dir: None,
        }
    }
}

/// A single upload. `body` is read once, front to back.
pub struct UploadRequest<R> {
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub media_type: String,
    pub body: R,
}

/// Load a record and check that `user_id` owns it.
pub async fn load_owned(
    videos: &dyn VideoStore,
    video_id: Uuid,
    user_id: Uuid,
) -> Result<VideoRecord, IngestError> {
    let video = videos
        .get(video_id)
        .await?
        .ok_or(IngestError::NotFound(video_id))?;

    if !video.is_owned_by(user_id) {
        return Err(IngestError::Unauthorized(video_id));
    }

    Ok(video)
}

#[derive(Clone)]
pub struct IngestionPipeline {
    probe: Arc<dyn MediaProbe>,
    transcoder: Arc<dyn Transcoder>,
    objects: Arc<dyn ObjectStore>,
    videos: Arc<dyn VideoStore>,
    keys: AssetKeyAllocator,
    settings: IngestSettings,
}

impl IngestionPipeline {
    pub fn new(
        probe: Arc<dyn MediaProbe>,
        transcoder: Arc<dyn Transcoder>,
        objects: Arc<dyn ObjectStore>,
        videos: Arc<dyn VideoStore>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            probe,
            transcoder,
            objects,
            videos,
            keys: AssetKeyAllocator::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Run one upload to completion and return the updated record.
    pub async fn ingest<R>(&self, request: UploadRequest<R>) -> Result<VideoRecord, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let UploadRequest {
            video_id,
            user_id,
            media_type,
            body,
        } = request;

        info!(%video_id, %user_id, stage = %IngestStage::Received, "Uploading video");
        load_owned(self.videos.as_ref(), video_id, user_id).await?;

        let media_type = self.validate(&media_type)?;
        info!(%video_id, stage = %IngestStage::Validated, media_type = %media_type, "Media type accepted");

        let staging = self.stage(body, &media_type).await?;
        info!(%video_id, stage = %IngestStage::Staged, path = %staging.path().display(), "Upload staged");

        let class = self.probe.classify(staging.path()).await?;
        let key = self.keys.allocate(class.as_str(), &media_type);
        info!(%video_id, stage = %IngestStage::Classified, key = %key, "Storage key allocated");

        let processed = self.transcoder.rewrite(staging.path()).await?;
        info!(%video_id, stage = %IngestStage::Transcoded, path = %processed.display(), "Fast start applied");

        let object = StoredObject {
            bucket: self.settings.bucket.clone(),
            key: key.into_string(),
        };
        let uploaded = self
            .objects
            .upload(&object.bucket, &object.key, &processed, &media_type)
            .await;
        drop(processed);
        drop(staging);
        uploaded?;
        info!(%video_id, stage = %IngestStage::Uploaded, object = %object, "Upload complete");

        // Only the video columns are written.
        let video = match self.videos.set_video(video_id, &object).await {
            Ok(video) => video,
            Err(source) => {
                error!(
                    %video_id,
                    bucket = %object.bucket,
                    key = %object.key,
                    "Uploaded object has no matching record: {}",
                    source
                );
                return Err(IngestError::Persist { object, source });
            }
        };

        info!(%video_id, stage = %IngestStage::Persisted, "Video stored");
        Ok(video)
    }

    fn validate(&self, declared: &str) -> Result<String, IngestError> {
        let media_type = essence(declared);
        if self
            .settings
            .allowed_media_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&media_type))
        {
            Ok(media_type)
        } else {
            Err(IngestError::UnsupportedMediaType(declared.to_string()))
        }
    }

    /// Copy the body into a fresh staging file, rewound to the start.
    async fn stage<R>(&self, body: R, media_type: &str) -> Result<NamedTempFile, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let dir = self
            .settings
            .staging_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let suffix = format!(".{}", extension_for(media_type));
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(&suffix)
            .tempfile_in(dir)?;

        // The clone shares its cursor with the staging handle.
        let mut file = tokio::fs::File::from_std(staging.as_file().try_clone()?);

        let limit = self.settings.max_upload_bytes;
        let mut capped = body.take(limit.saturating_add(1));
        let mut chunk = vec![0u8; STAGING_CHUNK_BYTES];
        let mut written: u64 = 0;
        loop {
            // Read failures come from the client, write failures from local disk.
            let n = capped.read(&mut chunk).await.map_err(IngestError::Body)?;
            if n == 0 {
                break;
            }
            file.write_all(&chunk[..n]).await?;
            written += n as u64;
        }
        if written > limit {
            return Err(IngestError::PayloadTooLarge { limit });
        }

        file.flush().await?;
        file.rewind().await?;
        Ok(staging)
    }
}
