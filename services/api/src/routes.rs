//! API service routes

use std::io;

use axum::{
    Extension, Json, Router,
    extract::{
        DefaultBodyLimit, Path, State,
        multipart::{Multipart, MultipartError},
    },
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use futures::TryStreamExt;
use media::{
    UploadRequest, models::SignedVideo, models::VideoRecord, pipeline::load_owned,
    thumbnail::ThumbnailUpload,
};
use serde_json::json;
use tokio_util::io::StreamReader;
use tower_http::{services::ServeDir, trace::TraceLayer};
use uuid::Uuid;

use crate::{
    state::AppState,
    error::{ApiError, ApiResult},
    middleware::{AuthUser, auth_middleware},
    models::CreateVideoRequest,
};

/// Room for multipart framing on top of the video size cap.
const MULTIPART_OVERHEAD_BYTES: usize = 1 << 20;

/// Request body limit for a multipart upload carrying at most `max_bytes`.
fn body_limit(max_bytes: u64) -> usize {
    usize::try_from(max_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES)
}

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let max_video_body = body_limit(state.pipeline.settings().max_upload_bytes);
    let max_thumbnail_body = body_limit(state.thumbnails.max_bytes());

    let protected_routes = Router::new()
        .route("/api/videos", post(create_video))
        .route("/api/videos/:video_id", get(get_video))
        .route(
            "/api/video_upload/:video_id",
            post(upload_video).layer(DefaultBodyLimit::max(max_video_body)),
        )
        .route(
            "/api/thumbnail_upload/:video_id",
            post(upload_thumbnail).layer(DefaultBodyLimit::max(max_thumbnail_body)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest_service("/assets", ServeDir::new(&state.assets_root))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    common::database::health_check(&state.db_pool).await?;

    Ok(Json(json!({
        "status": "ok",
        "service": "api-service"
    })))
}

fn bad_multipart(err: MultipartError) -> ApiError {
    ApiError::BadRequest(err.body_text())
}

/// Create a video record owned by the caller
pub async fn create_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateVideoRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }

    let mut video = VideoRecord::new(user.id, payload.title);
    video.description = payload.description;
    state.videos.create(&video).await?;

    let signed = state.playback.sign(video).await?;
    Ok((StatusCode::CREATED, Json(signed)))
}

/// Get a video with a freshly signed playback URL
pub async fn get_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<Uuid>,
) -> ApiResult<Json<SignedVideo>> {
    let video = load_owned(state.videos.as_ref(), video_id, user.id).await?;

    Ok(Json(state.playback.sign(video).await?))
}

/// Upload the video file of an existing record
///
/// Expects a multipart field named `video`; its bytes are streamed to disk.
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Json<SignedVideo>> {
    let field = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(bad_multipart)?
            .ok_or_else(|| ApiError::BadRequest("missing form field \"video\"".to_string()))?;
        if field.name() == Some("video") {
            break field;
        }
    };

    let media_type = field.content_type().unwrap_or_default().to_string();
    let body = StreamReader::new(field.map_err(io::Error::other));

    let video = state
        .pipeline
        .ingest(UploadRequest {
            video_id,
            user_id: user.id,
            media_type,
            body: Box::pin(body),
        })
        .await?;

    Ok(Json(state.playback.sign(video).await?))
}

/// Upload a thumbnail image for an existing record
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Json<SignedVideo>> {
    let field = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(bad_multipart)?
            .ok_or_else(|| {
                ApiError::BadRequest("missing form field \"thumbnail\"".to_string())
            })?;
        if field.name() == Some("thumbnail") {
            break field;
        }
    };

    let media_type = field.content_type().unwrap_or_default().to_string();
    let data = field.bytes().await.map_err(bad_multipart)?;

    let video = state
        .thumbnails
        .attach(ThumbnailUpload {
            video_id,
            user_id: user.id,
            media_type,
            data: &data,
        })
        .await?;

    Ok(Json(state.playback.sign(video).await?))
}
