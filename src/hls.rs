//! HLS Group Manager: operations on the (manifest, segments*) tuple. A
//! manifest and its segments are a logically atomic group; rename rewrites
//! segment basenames inside the manifest body the way a real HLS client
//! expects, delete tolerates missing files.

use bytes::Bytes;
use std::sync::Arc;
use tracing as log;

use crate::error::{Result, VithError};
use crate::store::ObjectStore;

const MANIFEST_EXT: &str = ".m3u8";
const SEGMENT_EXT: &str = ".ts";

fn strip_manifest_ext(name: &str) -> Option<&str> {
    name.strip_suffix(MANIFEST_EXT)
}

fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn dirname(name: &str) -> &str {
    match name.rfind('/') {
        Some(idx) => &name[..idx],
        None => "",
    }
}

/// `name` is non-empty, ends in `.m3u8`, and its existence matches
/// `must_exist` (absent/directory is an error when `must_exist`; present is
/// an error when `!must_exist`).
pub async fn validate_stream_name(store: &Arc<dyn ObjectStore>, name: &str, must_exist: bool) -> Result<()> {
    crate::model::validate_name(name)?;
    if !name.ends_with(MANIFEST_EXT) {
        return Err(VithError::InputInvalid(format!("manifest must end in {MANIFEST_EXT}: {name}")));
    }
    let meta = store.stat(name).await?;
    match (must_exist, meta) {
        (true, None) => Err(VithError::NotFound(format!("manifest not found: {name}"))),
        (true, Some(m)) if m.is_dir => Err(VithError::NotFound(format!("manifest is a directory: {name}"))),
        (false, Some(_)) => Err(VithError::Conflict(format!("manifest already exists: {name}"))),
        _ => Ok(()),
    }
}

async fn list_segments(store: &Arc<dyn ObjectStore>, manifest: &str, stem: &str) -> Result<Vec<String>> {
    let dir = dirname(manifest);
    let mut segments = Vec::new();
    store
        .walk(dir, &mut |entry| {
            let name = basename(entry);
            if name.starts_with(stem) && name.ends_with(SEGMENT_EXT) {
                segments.push(entry.to_string());
            }
            Ok(())
        })
        .await?;
    Ok(segments)
}

/// Renames an HLS group: writes the rewritten manifest to `dst` first,
/// renames each segment, then removes the `src` manifest last. A crash
/// mid-rename therefore leaves a valid, readable new manifest (possibly
/// still pointing at old segment names) rather than a dangling manifest
/// with no segments. Surfaces the first error; no rollback is attempted.
pub async fn rename(store: &Arc<dyn ObjectStore>, src: &str, dst: &str) -> Result<()> {
    let src_stem = strip_manifest_ext(src)
        .ok_or_else(|| VithError::InputInvalid(format!("manifest must end in {MANIFEST_EXT}: {src}")))?;
    let dst_stem = strip_manifest_ext(dst)
        .ok_or_else(|| VithError::InputInvalid(format!("manifest must end in {MANIFEST_EXT}: {dst}")))?;

    let manifest_bytes = store.read(src).await?;
    let segments = list_segments(store, src, basename(src_stem)).await?;

    let old_basename = basename(src_stem);
    let new_basename = basename(dst_stem);
    let manifest_text = String::from_utf8_lossy(&manifest_bytes).replace(old_basename, new_basename);

    store.write(dst, Bytes::from(manifest_text.into_bytes()), None).await?;

    for segment in &segments {
        let suffix = segment
            .strip_prefix(src_stem)
            .unwrap_or_else(|| segment.rsplit('/').next().unwrap_or(segment));
        let new_segment = format!("{dst_stem}{suffix}");
        store.rename(segment, &new_segment).await?;
    }

    store.remove(src).await?;
    log::info!(src, dst, segments = segments.len(), "renamed hls group");
    Ok(())
}

/// Deletes the manifest and every segment sharing its basename prefix.
/// Missing files are tolerated (the store's `remove` is already
/// idempotent on not-found).
pub async fn delete(store: &Arc<dyn ObjectStore>, manifest: &str) -> Result<()> {
    let stem = strip_manifest_ext(manifest)
        .ok_or_else(|| VithError::InputInvalid(format!("manifest must end in {MANIFEST_EXT}: {manifest}")))?;
    let segments = list_segments(store, manifest, basename(stem)).await?;

    store.remove(manifest).await?;
    for segment in &segments {
        store.remove(segment).await?;
    }
    log::info!(manifest, segments = segments.len(), "deleted hls group");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;

    async fn seeded_store() -> (tempfile::TempDir, Arc<dyn ObjectStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(dir.path()));
        store.mkdir("v").await.unwrap();
        store.write("v/a.m3u8", Bytes::from_static(b"a0.ts\na1.ts\n"), None).await.unwrap();
        store.write("v/a0.ts", Bytes::from_static(b"seg0"), None).await.unwrap();
        store.write("v/a1.ts", Bytes::from_static(b"seg1"), None).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn rename_rewrites_manifest_and_segments() {
        let (_dir, store) = seeded_store().await;
        rename(&store, "v/a.m3u8", "v/b.m3u8").await.unwrap();

        let manifest = store.read("v/b.m3u8").await.unwrap();
        assert_eq!(&manifest[..], b"b0.ts\nb1.ts\n");
        assert!(store.stat("v/b0.ts").await.unwrap().is_some());
        assert!(store.stat("v/b1.ts").await.unwrap().is_some());
        assert!(store.stat("v/a.m3u8").await.unwrap().is_none());
        assert!(store.stat("v/a0.ts").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rename_twice_fails_not_found_on_source() {
        let (_dir, store) = seeded_store().await;
        rename(&store, "v/a.m3u8", "v/b.m3u8").await.unwrap();
        let err = rename(&store, "v/a.m3u8", "v/b.m3u8").await.unwrap_err();
        assert!(matches!(err, VithError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_manifest_and_all_segments() {
        let (_dir, store) = seeded_store().await;
        delete(&store, "v/a.m3u8").await.unwrap();

        let mut remaining = Vec::new();
        store
            .walk("v", &mut |e| {
                remaining.push(e.to_string());
                Ok(())
            })
            .await
            .unwrap();
        assert!(remaining.iter().all(|e| !(e.contains("/a") || e.starts_with("a"))));
        assert!(store.stat("v/a.m3u8").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_tolerates_missing_segments() {
        let (_dir, store) = seeded_store().await;
        store.remove("v/a1.ts").await.unwrap();
        delete(&store, "v/a.m3u8").await.unwrap();
        assert!(store.stat("v/a.m3u8").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn validate_requires_m3u8_extension() {
        let (_dir, store) = seeded_store().await;
        let err = validate_stream_name(&store, "v/a.ts", true).await.unwrap_err();
        assert!(matches!(err, VithError::InputInvalid(_)));
    }

    #[tokio::test]
    async fn validate_must_exist_rejects_absent() {
        let (_dir, store) = seeded_store().await;
        let err = validate_stream_name(&store, "v/missing.m3u8", true).await.unwrap_err();
        assert!(matches!(err, VithError::NotFound(_)));
    }

    #[tokio::test]
    async fn validate_must_not_exist_rejects_present() {
        let (_dir, store) = seeded_store().await;
        let err = validate_stream_name(&store, "v/a.m3u8", false).await.unwrap_err();
        assert!(matches!(err, VithError::Conflict(_)));
    }
}
