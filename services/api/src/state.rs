//! Application state shared across handlers

use std::path::PathBuf;
use std::sync::Arc;

use media::database::VideoStore;
use media::thumbnail::ThumbnailService;
use media::{IngestionPipeline, PlaybackSigner};
use sqlx::PgPool;

use crate::middleware::JwtConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub videos: Arc<dyn VideoStore>,
    pub pipeline: IngestionPipeline,
    pub thumbnails: ThumbnailService,
    pub playback: PlaybackSigner,
    pub jwt: JwtConfig,
    pub assets_root: PathBuf,
}
