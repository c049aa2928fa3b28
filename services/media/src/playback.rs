//! Read path: turn a stored record into a playable view.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::error::IngestError;
use crate::models::{SignedVideo, VideoRecord};
use crate::object_store::ObjectStore;

/// Validity window of playback URLs.
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Mints a fresh presigned URL on every read. Signed URLs are never stored.
#[derive(Clone)]
pub struct PlaybackSigner {
    objects: Arc<dyn ObjectStore>,
    ttl: Duration,
}

impl PlaybackSigner {
    pub fn new(objects: Arc<dyn ObjectStore>, ttl: Duration) -> Self {
        Self { objects, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn sign(&self, video: VideoRecord) -> Result<SignedVideo, IngestError> {
        let (video_url, video_url_expires_at) = match &video.video {
            Some(object) => {
                let issued_at = Utc::now();
                let url = self
                    .objects
                    .sign(&object.bucket, &object.key, self.ttl)
                    .await?;
                debug!(video_id = %video.id, object = %object, "Signed playback URL");

                let expires_at = chrono::Duration::from_std(self.ttl)
                    .ok()
                    .and_then(|ttl| issued_at.checked_add_signed(ttl));
                (Some(url), expires_at)
            }
            None => (None, None),
        };

        Ok(SignedVideo {
            id: video.id,
            user_id: video.user_id,
            title: video.title,
            description: video.description,
            thumbnail_url: video.thumbnail_url,
            video_url,
            video_url_expires_at,
            created_at: video.created_at,
            updated_at: video.updated_at,
        })
    }
}
