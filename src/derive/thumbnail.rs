//! Derive-Thumbnail: `mkdir` the output's parent, then either runs the PDF
//! producer/consumer pipeline or stages the input/output through local disk
//! and invokes the image/video thumbnailer.

use tokio_util::sync::CancellationToken;
use tracing as log;

use crate::error::{context, Result, VithError};
use crate::model::{ItemType, Request, Source};
use crate::state::AppState;
use crate::{metrics, tools};

const KIND: &str = "thumbnail";
const PDF_PIPE_CAPACITY: usize = 32 * 1024;

pub async fn derive_thumbnail(state: &AppState, source: Source, req: &Request, cancel: &CancellationToken) -> Result<()> {
    let outcome = derive_thumbnail_inner(state, req, cancel).await;
    let item_label = req.item_type.as_str();
    let metric_state = outcome.as_ref().err().map(VithError::metric_state).unwrap_or("success");
    metrics::record(source.as_str(), KIND, item_label, metric_state);
    outcome
}

async fn derive_thumbnail_inner(state: &AppState, req: &Request, cancel: &CancellationToken) -> Result<()> {
    req.validate()?;

    let output_dir = parent_of(&req.output);
    context(state.store.mkdir(output_dir).await, "create directory for output")?;

    match req.item_type {
        ItemType::Pdf => derive_pdf_thumbnail(state, req).await,
        ItemType::Image | ItemType::Video => derive_tool_thumbnail(state, req, cancel).await,
    }
}

fn parent_of(name: &str) -> &str {
    match name.rfind('/') {
        Some(idx) => &name[..idx],
        None => "",
    }
}

async fn derive_pdf_thumbnail(state: &AppState, req: &Request) -> Result<()> {
    let size = state
        .store
        .stat(&req.input)
        .await?
        .ok_or_else(|| VithError::NotFound(format!("pdf input not found: {}", req.input)))?
        .size;
    let input_bytes = context(state.store.read(&req.input).await, "read pdf input")?;

    let image_cfg = &state.config.image_service;
    let basic_auth = image_cfg
        .basic_auth_user
        .as_deref()
        .zip(image_cfg.basic_auth_pass.as_deref());

    // Producer (image service response) and consumer (store write) are the
    // two ends of an in-memory pipe, run concurrently: a slow store write
    // backpressures the download instead of letting it buffer unbounded,
    // and both sides are always awaited so neither error is silently lost.
    let (writer, mut reader) = tokio::io::duplex(PDF_PIPE_CAPACITY);
    let produce = tools::pdf_to_image_into(&state.http_client, &image_cfg.url, basic_auth, input_bytes, size, req.scale, writer);
    let consume = state.store.write_stream(&req.output, &mut reader, None);

    let (produce_result, consume_result) = tokio::join!(produce, consume);
    let result = match (produce_result, consume_result) {
        (Err(e), _) => context(Err(e), "image service copy aborted"),
        (Ok(()), Err(e)) => context(Err(e), "write pdf thumbnail"),
        (Ok(()), Ok(())) => Ok(()),
    };

    if result.is_err() {
        if let Err(cleanup_err) = state.store.remove_all(&req.output).await {
            log::warn!(output = %req.output, "failed to clean up partial pdf output: {cleanup_err}");
        }
    }

    result
}

async fn derive_tool_thumbnail(state: &AppState, req: &Request, cancel: &CancellationToken) -> Result<()> {
    let staged_in = context(state.stage.stage_in(&state.store, &req.input).await, "stage input")?;
    let staged_out = state.stage.stage_out(&state.store, &req.output);

    let tool_result = match req.item_type {
        ItemType::Image => {
            tools::thumbnail_image(
                &state.config.tools.ffmpeg_path,
                &staged_in.local_path,
                &staged_out.local_path,
                req.scale,
                &state.pool,
                cancel,
            )
            .await
        }
        ItemType::Video => {
            tools::thumbnail_video(
                &state.config.tools.ffmpeg_path,
                &state.config.tools.ffprobe_path,
                &staged_in.local_path,
                &staged_out.local_path,
                req.scale,
                &state.pool,
                cancel,
            )
            .await
        }
        ItemType::Pdf => unreachable!("pdf handled by derive_pdf_thumbnail"),
    };

    let result = match tool_result {
        Ok(()) => context(staged_out.commit().await, "commit thumbnail output"),
        Err(e) => {
            staged_out.cleanup_local().await;
            Err(e)
        }
    };

    staged_in.release().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_of_handles_nested_and_flat_names() {
        assert_eq!(parent_of("thumbs/a.webp"), "thumbs");
        assert_eq!(parent_of("a.webp"), "");
    }
}
