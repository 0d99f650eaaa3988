//! Derive-Stream: stages the input locally, resolves an output path that
//! deliberately preserves the manifest's basename (so ffmpeg-derived
//! segment names collide with the store's expected naming), invokes
//! Transcode-to-HLS, then commits via S3-finalize when the store is remote.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing as log;

use crate::error::{context, Result, VithError};
use crate::model::{ItemType, Request, Source};
use crate::stage::basename;
use crate::state::AppState;
use crate::store::ObjectStore;
use crate::{metrics, tools};

const KIND: &str = "stream";

pub async fn derive_stream(state: &AppState, source: Source, req: &Request, cancel: &CancellationToken) -> Result<()> {
    let outcome = derive_stream_inner(state, req, cancel).await;
    let metric_state = outcome.as_ref().err().map(VithError::metric_state).unwrap_or("success");
    metrics::record(source.as_str(), KIND, req.item_type.as_str(), metric_state);
    outcome
}

async fn derive_stream_inner(state: &AppState, req: &Request, cancel: &CancellationToken) -> Result<()> {
    if req.item_type != ItemType::Video {
        return Err(VithError::Forbidden(format!(
            "stream generation only supports video, got {}",
            req.item_type.as_str()
        )));
    }
    req.validate()?;

    let staged_in = context(state.stage.stage_in(&state.store, &req.input).await, "stage input")?;
    let output = resolve_stream_output(state, &req.output);

    let tool_result = tools::transcode_to_hls(
        &state.config.tools.ffmpeg_path,
        &staged_in.local_path,
        &output.local_manifest,
        &state.pool,
        cancel,
    )
    .await;

    staged_in.release().await;

    match tool_result {
        Ok(()) => context(output.commit(&state.store).await, "generate stream"),
        Err(e) => {
            output.cleanup_local().await;
            Err(e)
        }
    }
}

/// Output resolver for stream generation: a local store yields its own
/// path directly (no commit needed); a remote store gets a local scratch
/// path whose basename matches the remote manifest's basename, so segment
/// files ffmpeg derives from it land under the name S3-finalize expects.
struct StreamOutput {
    local_manifest: PathBuf,
    remote_manifest: Option<String>,
}

fn resolve_stream_output(state: &AppState, remote_output: &str) -> StreamOutput {
    match state.store.path(remote_output) {
        Some(path) => StreamOutput {
            local_manifest: path,
            remote_manifest: None,
        },
        None => {
            let name = basename(Path::new(remote_output));
            StreamOutput {
                local_manifest: state.stage.tmp_path_for(remote_output).with_file_name(name),
                remote_manifest: Some(remote_output.to_string()),
            }
        }
    }
}

impl StreamOutput {
    async fn commit(&self, store: &Arc<dyn ObjectStore>) -> Result<()> {
        let Some(remote_manifest) = &self.remote_manifest else {
            return Ok(());
        };
        s3_finalize(store, &self.local_manifest, remote_manifest).await
    }

    async fn cleanup_local(&self) {
        if self.remote_manifest.is_some() {
            let _ = tokio::fs::remove_file(&self.local_manifest).await;
            if let Some(dir) = self.local_manifest.parent() {
                if let Some(stem) = self.local_manifest.file_stem().and_then(|s| s.to_str()) {
                    if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
                        while let Ok(Some(entry)) = entries.next_entry().await {
                            let name = entry.file_name();
                            let name = name.to_string_lossy();
                            if name.starts_with(stem) && name.ends_with(".ts") {
                                let _ = tokio::fs::remove_file(entry.path()).await;
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Copies the local manifest and its segments into the store, then deletes
/// the local copies. Surfaces the first error; still attempts cleanup.
async fn s3_finalize(store: &Arc<dyn ObjectStore>, local_manifest: &Path, remote_manifest: &str) -> Result<()> {
    let manifest_bytes = tokio::fs::read(local_manifest).await?;
    let mut first_error = None;

    if let Err(e) = store.write(remote_manifest, manifest_bytes.into(), None).await {
        first_error = Some(e);
    }

    let stem = local_manifest
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let remote_dir = match remote_manifest.rfind('/') {
        Some(idx) => &remote_manifest[..idx],
        None => "",
    };

    let mut local_segments = Vec::new();
    if let Some(dir) = local_manifest.parent() {
        if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let name = entry.file_name();
                let name = name.to_string_lossy().to_string();
                if name.starts_with(&stem) && name.ends_with(".ts") {
                    local_segments.push(entry.path());
                }
            }
        }
    }

    for local_seg in &local_segments {
        let seg_name = basename(local_seg);
        let remote_seg = if remote_dir.is_empty() {
            seg_name.clone()
        } else {
            format!("{remote_dir}/{seg_name}")
        };
        match tokio::fs::read(local_seg).await {
            Ok(data) => {
                if let Err(e) = store.write(&remote_seg, data.into(), None).await {
                    log::warn!(segment = %remote_seg, "failed to upload segment: {e}");
                    first_error.get_or_insert(e);
                }
            }
            Err(e) => {
                log::warn!(segment = %local_seg.display(), "failed to read local segment: {e}");
                first_error.get_or_insert(e.into());
            }
        }
    }

    let _ = tokio::fs::remove_file(local_manifest).await;
    for local_seg in &local_segments {
        let _ = tokio::fs::remove_file(local_seg).await;
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::state::AppState;
    use bytes::Bytes;

    async fn state_with_root(root: &std::path::Path) -> AppState {
        let mut config = AppConfig::default();
        config.store.local_root = root.to_string_lossy().to_string();
        config.server.tmp_folder = root.join("tmp").to_string_lossy().to_string();
        AppState::new(config).unwrap()
    }

    #[tokio::test]
    async fn forbids_non_video_item_types() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_root(dir.path()).await;
        let req = Request {
            input: "a.png".into(),
            output: "v/out.m3u8".into(),
            item_type: ItemType::Image,
            scale: 150,
        };
        let cancel = CancellationToken::new();
        let err = derive_stream(&state, Source::Http, &req, &cancel).await.unwrap_err();
        assert!(matches!(err, VithError::Forbidden(_)));
    }

    #[tokio::test]
    async fn local_store_output_resolves_to_store_path_with_noop_commit() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_root(dir.path()).await;
        state.store.write("in.mp4", Bytes::from_static(b"x"), None).await.unwrap();

        let output = resolve_stream_output(&state, "v/out.m3u8");
        assert!(output.remote_manifest.is_none());
        assert_eq!(output.local_manifest, dir.path().join("v/out.m3u8"));
    }
}
