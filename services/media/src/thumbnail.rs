//! Thumbnail uploads.
//!
//! Thumbnails are small, so they arrive fully buffered and are written
//! through an injected [`AssetStore`]. The video record keeps the public URL
//! of the asset.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use uuid::Uuid;

use crate::asset_key::{AssetKeyAllocator, StorageKey, essence};
use crate::database::VideoStore;
use crate::error::IngestError;
use crate::models::VideoRecord;
use crate::pipeline::load_owned;

/// 10 MiB
pub const DEFAULT_MAX_THUMBNAIL_BYTES: u64 = 10 << 20;

pub const THUMBNAIL_MEDIA_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// Storage for small public assets.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `data` under `key` and return its public URL.
    async fn put(&self, key: &StorageKey, data: &[u8]) -> io::Result<String>;

    async fn remove(&self, key: &StorageKey) -> io::Result<()>;
}

/// [`AssetStore`] writing into a local directory served under `/assets`.
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
    base_url: String,
}

impl LocalAssetStore {
    /// Create the store, making sure `root` exists.
    pub async fn init(root: impl Into<PathBuf>, base_url: impl Into<String>) -> io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!("Serving assets from {}", root.display());

        Ok(Self {
            root,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_for(&self, key: &StorageKey) -> String {
        format!("{}/assets/{}", self.base_url, key)
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn put(&self, key: &StorageKey, data: &[u8]) -> io::Result<String> {
        tokio::fs::write(self.root.join(key.as_str()), data).await?;
        Ok(self.url_for(key))
    }

    async fn remove(&self, key: &StorageKey) -> io::Result<()> {
        tokio::fs::remove_file(self.root.join(key.as_str())).await
    }
}

pub struct ThumbnailUpload<'a> {
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub media_type: String,
    pub data: &'a [u8],
}

#[derive(Clone)]
pub struct ThumbnailService {
    assets: Arc<dyn AssetStore>,
    videos: Arc<dyn VideoStore>,
    keys: AssetKeyAllocator,
    max_bytes: u64,
}

impl ThumbnailService {
    pub fn new(assets: Arc<dyn AssetStore>, videos: Arc<dyn VideoStore>, max_bytes: u64) -> Self {
        Self {
            assets,
            videos,
            keys: AssetKeyAllocator::new(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub async fn attach(&self, upload: ThumbnailUpload<'_>) -> Result<VideoRecord, IngestError> {
        info!(video_id = %upload.video_id, user_id = %upload.user_id, "Uploading thumbnail");
        load_owned(self.videos.as_ref(), upload.video_id, upload.user_id).await?;

        let media_type = essence(&upload.media_type);
        if !THUMBNAIL_MEDIA_TYPES.contains(&media_type.as_str()) {
            return Err(IngestError::UnsupportedMediaType(upload.media_type));
        }
        if upload.data.len() as u64 > self.max_bytes {
            return Err(IngestError::PayloadTooLarge {
                limit: self.max_bytes,
            });
        }

        let key = self.keys.allocate_flat(&media_type);
        let url = self.assets.put(&key, upload.data).await?;

        match self.videos.set_thumbnail(upload.video_id, &url).await {
            Ok(video) => Ok(video),
            Err(source) => {
                if let Err(e) = self.assets.remove(&key).await {
                    error!(
                        video_id = %upload.video_id,
                        key = %key,
                        "Failed to remove unreferenced thumbnail: {}",
                        e
                    );
                }
                Err(source.into())
            }
        }
    }
}
