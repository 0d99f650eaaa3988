//! External-Tool Port: wraps `ffmpeg`, `ffprobe`, and the remote image
//! service behind pure functions over strings, buffering combined
//! stdout+stderr from a process-wide pool the way the teacher buffers
//! `Bytes` for its relay/segment pipelines.

use bytes::BytesMut;
use futures::StreamExt;
use parking_lot::Mutex;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing as log;

use crate::error::{Result, VithError};
use crate::model::SMALL_SIZE;

const BUFFER_CAP: usize = 32 * 1024;
const MAX_CAPTURE: usize = 4 * 1024 * 1024;

/// Process-wide pool of reusable 32 KiB buffers for piping tool output.
/// Safe for concurrent get/put; every acquired buffer must be returned on
/// all exit paths, which `BufferGuard`'s `Drop` does automatically.
#[derive(Clone)]
pub struct BufferPool {
    free: Arc<Mutex<Vec<BytesMut>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self {
            free: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn acquire(&self) -> BufferGuard {
        let buf = self.free.lock().pop().unwrap_or_else(|| BytesMut::with_capacity(BUFFER_CAP));
        BufferGuard {
            buf: Some(buf),
            pool: self.free.clone(),
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

pub struct BufferGuard {
    buf: Option<BytesMut>,
    pool: Arc<Mutex<Vec<BytesMut>>>,
}

impl std::ops::Deref for BufferGuard {
    type Target = BytesMut;
    fn deref(&self) -> &BytesMut {
        self.buf.as_ref().expect("buffer taken")
    }
}

impl std::ops::DerefMut for BufferGuard {
    fn deref_mut(&mut self) -> &mut BytesMut {
        self.buf.as_mut().expect("buffer taken")
    }
}

impl Drop for BufferGuard {
    fn drop(&mut self) {
        if let Some(mut buf) = self.buf.take() {
            buf.clear();
            buf.truncate(0);
            if buf.capacity() <= BUFFER_CAP * 4 {
                self.pool.lock().push(buf);
            }
        }
    }
}

/// Runs `cmd`, capturing merged stdout+stderr up to `MAX_CAPTURE` bytes, and
/// killing the child if `cancel` fires before exit. Returns the captured
/// output only on non-zero exit; discards it on success.
async fn run_captured(mut cmd: Command, pool: &BufferPool, cancel: &CancellationToken) -> Result<()> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child: Child = cmd.spawn().map_err(|e| VithError::ToolError(format!("spawn failed: {e}")))?;

    let mut guard = pool.acquire();
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    // Drain stdout and stderr concurrently into separate buffers, then
    // merge in capture order: a pipe that fills while we read only the
    // other one would otherwise block the child indefinitely.
    let wait = async {
        let mut out_buf = Vec::new();
        let mut err_buf = Vec::new();
        let (out_res, err_res, status) = tokio::join!(
            async {
                if let Some(out) = stdout.as_mut() {
                    read_into_vec(out, &mut out_buf).await
                } else {
                    Ok(())
                }
            },
            async {
                if let Some(err) = stderr.as_mut() {
                    read_into_vec(err, &mut err_buf).await
                } else {
                    Ok(())
                }
            },
            child.wait(),
        );
        let _ = out_res;
        let _ = err_res;
        guard.extend_from_slice(&out_buf);
        guard.extend_from_slice(&err_buf);
        status
    };

    let status = tokio::select! {
        status = wait => status.map_err(|e| VithError::ToolError(format!("wait failed: {e}")))?,
        _ = cancel.cancelled() => {
            let _ = child.start_kill();
            return Err(VithError::Cancelled("tool invocation cancelled".into()));
        }
    };

    if status.success() {
        Ok(())
    } else {
        let captured = String::from_utf8_lossy(&guard).to_string();
        Err(VithError::ToolError(format!(
            "exit status {status}: {captured}"
        )))
    }
}

async fn read_into_vec(reader: &mut (impl tokio::io::AsyncRead + Unpin), buf: &mut Vec<u8>) -> std::io::Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        if buf.len() + n <= MAX_CAPTURE {
            buf.extend_from_slice(&chunk[..n]);
        }
    }
}

/// `ffmpeg -i <in> -codec:v libx264 ... -f hls ... <out>`
pub async fn transcode_to_hls(
    ffmpeg_path: &str,
    input: &std::path::Path,
    output: &std::path::Path,
    pool: &BufferPool,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut cmd = Command::new(ffmpeg_path);
    cmd.args([
        "-i",
        &input.to_string_lossy(),
        "-codec:v",
        "libx264",
        "-preset",
        "superfast",
        "-codec:a",
        "aac",
        "-b:a",
        "128k",
        "-ac",
        "2",
        "-y",
        "-f",
        "hls",
        "-hls_time",
        "4",
        "-hls_playlist_type",
        "event",
        "-hls_flags",
        "independent_segments",
        "-threads",
        "2",
        &output.to_string_lossy(),
    ]);
    log::info!(input = %input.display(), output = %output.display(), "transcoding to hls");
    run_captured(cmd, pool, cancel).await
}

fn quality_for_scale(scale: u64) -> u32 {
    if scale == SMALL_SIZE {
        66
    } else {
        80
    }
}

/// `ffmpeg -i <in> -vf "crop=...,scale=<s>:<s>" -vcodec libwebp ... <out>`
pub async fn thumbnail_image(
    ffmpeg_path: &str,
    input: &std::path::Path,
    output: &std::path::Path,
    scale: u64,
    pool: &BufferPool,
    cancel: &CancellationToken,
) -> Result<()> {
    let vf = format!("crop='min(iw,ih)':'min(iw,ih)',scale={scale}:{scale}");
    let q = quality_for_scale(scale).to_string();
    let mut cmd = Command::new(ffmpeg_path);
    cmd.args([
        "-i",
        &input.to_string_lossy(),
        "-map_metadata",
        "-1",
        "-vf",
        &vf,
        "-vcodec",
        "libwebp",
        "-lossless",
        "0",
        "-compression_level",
        "6",
        "-q:v",
        &q,
        "-an",
        "-preset",
        "picture",
        "-y",
        "-f",
        "webp",
        "-frames:v",
        "1",
        &output.to_string_lossy(),
    ]);
    log::info!(input = %input.display(), scale, "thumbnailing image");
    run_captured(cmd, pool, cancel).await
}

/// Seeks to the midpoint of the video (minus 2.5s once the video is longer
/// than 5s, clamped at 0) and emits either a 5s animated webp (scale==150)
/// or a single still frame.
pub async fn thumbnail_video(
    ffmpeg_path: &str,
    ffprobe_path: &str,
    input: &std::path::Path,
    output: &std::path::Path,
    scale: u64,
    pool: &BufferPool,
    cancel: &CancellationToken,
) -> Result<()> {
    let probe = probe(ffprobe_path, input, pool, cancel).await;
    let seek = match probe {
        Ok(p) if p.duration > 5.0 => (p.duration / 2.0 - 2.5).max(0.0),
        Ok(p) => p.duration / 2.0,
        Err(_) => 1.0,
    };

    let vf = format!("crop='min(iw,ih)':'min(iw,ih)',scale={scale}:{scale}");
    let q = quality_for_scale(scale).to_string();
    let seek_str = format!("{seek:.3}");

    let mut cmd = Command::new(ffmpeg_path);
    cmd.args([
        "-ss",
        &seek_str,
        "-i",
        &input.to_string_lossy(),
        "-map_metadata",
        "-1",
        "-vf",
        &vf,
        "-vcodec",
        "libwebp",
        "-lossless",
        "0",
        "-compression_level",
        "6",
        "-q:v",
        &q,
        "-an",
        "-preset",
        "picture",
        "-y",
        "-f",
        "webp",
    ]);
    if scale == SMALL_SIZE {
        cmd.args(["-t", "5", "-r", "8", "-loop", "0"]);
    } else {
        cmd.args(["-frames:v", "1"]);
    }
    cmd.arg(&output.to_string_lossy().to_string());

    log::info!(input = %input.display(), scale, seek = seek_str, "thumbnailing video");
    run_captured(cmd, pool, cancel).await
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeResult {
    pub bitrate: i64,
    pub duration: f64,
}

/// `ffprobe -v error -select_streams v:0 -show_entries stream=bit_rate:format=duration ... <in>`
/// parses two lines (bitrate then duration), tolerating either line being
/// absent as a parse hint rather than a hard failure.
pub async fn probe(
    ffprobe_path: &str,
    input: &std::path::Path,
    pool: &BufferPool,
    cancel: &CancellationToken,
) -> Result<ProbeResult> {
    let mut cmd = Command::new(ffprobe_path);
    cmd.args([
        "-v",
        "error",
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=bit_rate:format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
        &input.to_string_lossy(),
    ]);
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| VithError::ToolError(format!("spawn failed: {e}")))?;
    let _guard = pool.acquire(); // reserves pool headroom; this capture path keeps stdout/stderr separate
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();

    let wait = async {
        let (_, _, status) = tokio::join!(
            async {
                if let Some(out) = stdout.as_mut() {
                    read_into_vec(out, &mut out_buf).await
                } else {
                    Ok(())
                }
            },
            async {
                if let Some(err) = stderr.as_mut() {
                    read_into_vec(err, &mut err_buf).await
                } else {
                    Ok(())
                }
            },
            child.wait(),
        );
        status
    };

    let status = tokio::select! {
        status = wait => status.map_err(|e| VithError::ToolError(format!("wait failed: {e}")))?,
        _ = cancel.cancelled() => {
            let _ = child.start_kill();
            return Err(VithError::Cancelled("probe cancelled".into()));
        }
    };

    if !status.success() {
        return Err(VithError::ToolError(format!(
            "ffprobe exit status {status}: {}{}",
            String::from_utf8_lossy(&out_buf),
            String::from_utf8_lossy(&err_buf)
        )));
    }

    Ok(parse_probe_output(&String::from_utf8_lossy(&out_buf)))
}

/// Pure parser: `<int>\n<float>\n` -> both; `<int>\n` alone -> `(int, 0.0)`;
/// `<float>\n` alone -> `(0, float)`; empty/unparseable -> `(0, 0.0)`, never
/// an error.
pub fn parse_probe_output(raw: &str) -> ProbeResult {
    let lines: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    match lines.as_slice() {
        [bitrate_line, duration_line, ..] => ProbeResult {
            bitrate: bitrate_line.parse().unwrap_or(0),
            duration: duration_line.parse().unwrap_or(0.0),
        },
        [only_line] => match only_line.parse::<i64>() {
            Ok(bitrate) => ProbeResult { bitrate, duration: 0.0 },
            Err(_) => ProbeResult {
                bitrate: 0,
                duration: only_line.parse().unwrap_or(0.0),
            },
        },
        [] => ProbeResult { bitrate: 0, duration: 0.0 },
    }
}

async fn post_crop_request(
    client: &reqwest::Client,
    base_url: &str,
    basic_auth: Option<(&str, &str)>,
    body: bytes::Bytes,
    size: u64,
    scale: u64,
) -> Result<reqwest::Response> {
    let url = format!(
        "{base_url}/crop?width={scale}&height={scale}&stripmeta=true&noprofile=true&quality=80&type=webp"
    );
    let mut req = client.post(&url).header("Content-Length", size.to_string()).body(body);
    if let Some((user, pass)) = basic_auth {
        req = req.basic_auth(user, Some(pass));
    }
    let resp = req.send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(VithError::ToolError(format!("image service returned {status}: {text}")));
    }
    Ok(resp)
}

/// Posts a PDF byte stream to the image service's `/crop` endpoint and
/// returns the whole response body. Used only by the POST endpoint, which
/// never touches the store and just hands the bytes straight back.
pub async fn pdf_to_image(
    client: &reqwest::Client,
    base_url: &str,
    basic_auth: Option<(&str, &str)>,
    body: bytes::Bytes,
    size: u64,
    scale: u64,
) -> Result<bytes::Bytes> {
    let resp = post_crop_request(client, base_url, basic_auth, body, size, scale).await?;
    Ok(resp.bytes().await?)
}

/// Posts a PDF byte stream to the image service and streams the response
/// body into `sink` chunk by chunk as it arrives, instead of buffering the
/// whole thing, so the other end of the pipe can backpressure the download.
pub async fn pdf_to_image_into(
    client: &reqwest::Client,
    base_url: &str,
    basic_auth: Option<(&str, &str)>,
    body: bytes::Bytes,
    size: u64,
    scale: u64,
    mut sink: impl AsyncWrite + Unpin,
) -> Result<()> {
    let resp = post_crop_request(client, base_url, basic_auth, body, size, scale).await?;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        sink.write_all(&chunk)
            .await
            .map_err(|e| VithError::IoError(format!("image response pipe: {e}")))?;
    }
    let _ = sink.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_lines() {
        let r = parse_probe_output("1234567\n42.5\n");
        assert_eq!(r, ProbeResult { bitrate: 1234567, duration: 42.5 });
    }

    #[test]
    fn parses_bitrate_only() {
        let r = parse_probe_output("1234567\n");
        assert_eq!(r, ProbeResult { bitrate: 1234567, duration: 0.0 });
    }

    #[test]
    fn parses_duration_only_as_hint() {
        let r = parse_probe_output("42.5\n");
        assert_eq!(r, ProbeResult { bitrate: 0, duration: 42.5 });
    }

    #[test]
    fn empty_input_yields_zeroes_no_error() {
        assert_eq!(parse_probe_output(""), ProbeResult { bitrate: 0, duration: 0.0 });
        assert_eq!(parse_probe_output("\n\n"), ProbeResult { bitrate: 0, duration: 0.0 });
    }

    #[test]
    fn quality_switches_on_small_size() {
        assert_eq!(quality_for_scale(150), 66);
        assert_eq!(quality_for_scale(300), 80);
    }

    #[test]
    fn buffer_pool_reuses_returned_buffers() {
        let pool = BufferPool::new();
        {
            let mut g = pool.acquire();
            g.extend_from_slice(b"hello");
        }
        let g2 = pool.acquire();
        assert_eq!(g2.len(), 0);
    }
}
