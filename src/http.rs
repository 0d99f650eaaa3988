//! HTTP front-end: one `axum::Router` dispatching all six wire-level
//! methods, the way the teacher's `create_streaming_router` wires its HLS
//! and FLV routes onto a single `Router`, plus `tower-http` tracing and a
//! 2-minute request timeout.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use nanoid::nanoid;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing as log;

use crate::derive::derive_thumbnail;
use crate::error::{Result, VithError};
use crate::hls;
use crate::model::{ItemType, Request as DeriveRequest, Source, SMALL_SIZE};
use crate::state::AppState;
use crate::tools;
use crate::worker::StreamWorker;

const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct HttpState {
    pub app: AppState,
    pub worker: Arc<StreamWorker>,
    pub shutdown: CancellationToken,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/", post(post_handler))
        .route(
            "/*input",
            get(get_handler)
                .head(head_handler)
                .put(put_handler)
                .patch(patch_handler)
                .delete(delete_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct TypeQuery {
    #[serde(rename = "type")]
    item_type: String,
}

#[derive(Debug, Deserialize)]
struct GetQuery {
    #[serde(rename = "type")]
    item_type: String,
    output: String,
    scale: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PostQuery {
    #[serde(rename = "type")]
    item_type: String,
    scale: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PutQuery {
    #[serde(rename = "type")]
    item_type: String,
    output: String,
}

#[derive(Debug, Deserialize)]
struct RenameQuery {
    #[serde(rename = "type")]
    item_type: String,
    to: String,
}

fn require_store(app: &AppState) -> Result<()> {
    if app.store_enabled() {
        Ok(())
    } else {
        Err(VithError::Unavailable("object store disabled".into()))
    }
}

fn require_video(item_type: ItemType) -> Result<()> {
    if item_type == ItemType::Video {
        Ok(())
    } else {
        Err(VithError::InputInvalid(format!("this operation requires type=video, got {}", item_type.as_str())))
    }
}

async fn head_handler(
    State(state): State<HttpState>,
    Path(input): Path<String>,
    Query(q): Query<TypeQuery>,
) -> Response {
    let result = head_impl(&state, input, q).await;
    match result {
        Ok((bitrate, duration)) => {
            let mut resp = StatusCode::NO_CONTENT.into_response();
            let headers = resp.headers_mut();
            headers.insert(
                "X-Vith-Bitrate",
                HeaderValue::from_str(&bitrate.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0")),
            );
            headers.insert(
                "X-Vith-Duration",
                HeaderValue::from_str(&format!("{duration:.3}")).unwrap_or_else(|_| HeaderValue::from_static("0.000")),
            );
            resp
        }
        Err(e) => error_response(e),
    }
}

async fn head_impl(state: &HttpState, input: String, q: TypeQuery) -> Result<(i64, f64)> {
    require_store(&state.app)?;
    let item_type = ItemType::parse(&q.item_type)?;
    require_video(item_type)?;
    crate::model::validate_name(&input)?;

    let staged = state.app.stage.stage_in(&state.app.store, &input).await?;
    let cancel = state.shutdown.child_token();
    let result = tools::probe(
        &state.app.config.tools.ffprobe_path,
        &staged.local_path,
        &state.app.pool,
        &cancel,
    )
    .await;
    staged.release().await;
    let probe = result?;
    Ok((probe.bitrate, probe.duration))
}

async fn get_handler(
    State(state): State<HttpState>,
    Path(input): Path<String>,
    Query(q): Query<GetQuery>,
) -> Response {
    match get_impl(&state, input, q).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_impl(state: &HttpState, input: String, q: GetQuery) -> Result<()> {
    require_store(&state.app)?;
    let item_type = ItemType::parse(&q.item_type)?;
    let req = DeriveRequest {
        input,
        output: q.output,
        item_type,
        scale: q.scale.unwrap_or(SMALL_SIZE),
    };
    let cancel = state.shutdown.child_token();
    derive_thumbnail(&state.app, Source::Http, &req, &cancel).await
}

async fn post_handler(State(state): State<HttpState>, Query(q): Query<PostQuery>, body: Bytes) -> Response {
    match post_impl(&state, q, body).await {
        Ok(bytes) => (StatusCode::OK, bytes).into_response(),
        Err(e) => error_response(e),
    }
}

/// Unlike the other handlers, POST never touches the store: the posted
/// bytes are the input and the tool's output bytes are the response body.
async fn post_impl(state: &HttpState, q: PostQuery, body: Bytes) -> Result<Bytes> {
    require_store(&state.app)?;
    let item_type = ItemType::parse(&q.item_type)?;
    let scale = q.scale.unwrap_or(SMALL_SIZE);

    if item_type == ItemType::Pdf {
        let image_cfg = &state.app.config.image_service;
        let basic_auth = image_cfg.basic_auth_user.as_deref().zip(image_cfg.basic_auth_pass.as_deref());
        let size = body.len() as u64;
        return tools::pdf_to_image(&state.app.http_client, &image_cfg.url, basic_auth, body, size, scale).await;
    }

    let tmp_folder = std::path::Path::new(&state.app.config.server.tmp_folder);
    tokio::fs::create_dir_all(tmp_folder).await?;
    let in_path = tmp_folder.join(format!("{}-in", nanoid!()));
    let out_path = tmp_folder.join(format!("{}-out.webp", nanoid!()));

    tokio::fs::write(&in_path, &body).await?;
    let cancel = state.shutdown.child_token();

    let tool_result = match item_type {
        ItemType::Image => {
            tools::thumbnail_image(&state.app.config.tools.ffmpeg_path, &in_path, &out_path, scale, &state.app.pool, &cancel).await
        }
        ItemType::Video => {
            tools::thumbnail_video(
                &state.app.config.tools.ffmpeg_path,
                &state.app.config.tools.ffprobe_path,
                &in_path,
                &out_path,
                scale,
                &state.app.pool,
                &cancel,
            )
            .await
        }
        ItemType::Pdf => unreachable!("pdf handled above"),
    };

    let result = match tool_result {
        Ok(()) => match tokio::fs::read(&out_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) => Err(e.into()),
        },
        Err(e) => Err(e),
    };

    let _ = tokio::fs::remove_file(&in_path).await;
    let _ = tokio::fs::remove_file(&out_path).await;
    result
}

async fn put_handler(
    State(state): State<HttpState>,
    Path(input): Path<String>,
    Query(q): Query<PutQuery>,
) -> Response {
    match put_impl(&state, input, q).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => error_response(e),
    }
}

async fn put_impl(state: &HttpState, input: String, q: PutQuery) -> Result<()> {
    require_store(&state.app)?;
    let item_type = ItemType::parse(&q.item_type)?;
    require_video(item_type)?;
    let req = DeriveRequest {
        input,
        output: q.output,
        item_type,
        scale: SMALL_SIZE,
    };
    req.validate()?;
    state.worker.enqueue(Source::Http, req).await
}

async fn patch_handler(
    State(state): State<HttpState>,
    Path(source): Path<String>,
    Query(q): Query<RenameQuery>,
) -> Response {
    match patch_impl(&state, source, q).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn patch_impl(state: &HttpState, source: String, q: RenameQuery) -> Result<()> {
    require_store(&state.app)?;
    require_video(ItemType::parse(&q.item_type)?)?;
    hls::rename(&state.app.store, &source, &q.to).await
}

async fn delete_handler(
    State(state): State<HttpState>,
    Path(manifest): Path<String>,
    Query(q): Query<TypeQuery>,
) -> Response {
    match delete_impl(&state, manifest, q).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn delete_impl(state: &HttpState, manifest: String, q: TypeQuery) -> Result<()> {
    require_store(&state.app)?;
    require_video(ItemType::parse(&q.item_type)?)?;
    hls::delete(&state.app.store, &manifest).await
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn metrics_handler() -> Response {
    match crate::metrics::encode() {
        Ok(body) => ([("Content-Type", "text/plain; version=0.0.4")], body).into_response(),
        Err(e) => {
            log::error!("failed to encode metrics: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn error_response(err: VithError) -> Response {
    let status = match &err {
        VithError::InputInvalid(_)
        | VithError::OutputInvalid(_)
        | VithError::Forbidden(_)
        | VithError::Conflict(_)
        | VithError::NotFound(_) => StatusCode::BAD_REQUEST,
        VithError::Unavailable(msg) if msg.contains("disabled") => StatusCode::METHOD_NOT_ALLOWED,
        VithError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        VithError::ToolError(_) | VithError::IoError(_) | VithError::Cancelled(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_video_rejects_image() {
        assert!(require_video(ItemType::Image).is_err());
        assert!(require_video(ItemType::Video).is_ok());
    }

    #[test]
    fn error_response_maps_disabled_store_to_405() {
        let resp = error_response(VithError::Unavailable("object store disabled".into()));
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn error_response_maps_worker_stop_to_503() {
        let resp = error_response(VithError::Unavailable("stream worker is stopping".into()));
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn error_response_maps_tool_error_to_500() {
        let resp = error_response(VithError::ToolError("boom".into()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
