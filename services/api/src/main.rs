use std::sync::Arc;

use anyhow::Result;
use sqlx::migrate::Migrator;
use tracing::info;

mod config;
mod error;
mod middleware;
mod models;
mod routes;
mod state;

use common::database::{DatabaseConfig, init_pool, run_migrations};
use media::{
    IngestSettings, IngestionPipeline, PlaybackSigner,
    database::VideoRepository,
    object_store::S3ObjectStore,
    probe::FfprobeProbe,
    thumbnail::{LocalAssetStore, ThumbnailService},
    transcoder::FfmpegFastStart,
};
use tokio::net::TcpListener;

use crate::{config::Settings, middleware::JwtConfig, state::AppState};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[tokio::main]
async fn main() -> Result<()> {
    common::telemetry::init();

    info!("Starting API service");

    let settings = Settings::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool, &MIGRATOR).await?;

    let videos = Arc::new(VideoRepository::new(pool.clone()));
    let objects = Arc::new(
        S3ObjectStore::from_env(&settings.s3_region, settings.s3_endpoint.as_deref()).await,
    );

    let pipeline = IngestionPipeline::new(
        Arc::new(FfprobeProbe::new(
            &settings.ffprobe_path,
            settings.tool_timeout(),
        )),
        Arc::new(FfmpegFastStart::new(
            &settings.ffmpeg_path,
            settings.tool_timeout(),
        )),
        objects.clone(),
        videos.clone(),
        IngestSettings {
            bucket: settings.s3_bucket.clone(),
            max_upload_bytes: settings.max_upload_bytes,
            staging_dir: settings.staging_dir.clone(),
            ..IngestSettings::default()
        },
    );

    let assets = LocalAssetStore::init(&settings.assets_root, &settings.public_base_url).await?;
    let thumbnails =
        ThumbnailService::new(Arc::new(assets), videos.clone(), settings.max_thumbnail_bytes);

    let app_state = AppState {
        db_pool: pool,
        videos,
        pipeline,
        thumbnails,
        playback: PlaybackSigner::new(objects, settings.url_ttl()),
        jwt: JwtConfig::new(&settings.jwt_secret),
        assets_root: settings.assets_root.clone(),
    };

    info!(
        bucket = %settings.s3_bucket,
        max_upload_bytes = settings.max_upload_bytes,
        "API service initialized successfully"
    );

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(("0.0.0.0", settings.port)).await?;
    info!("API service listening on 0.0.0.0:{}", settings.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
