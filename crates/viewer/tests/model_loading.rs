//! Model loading through the real loader, reading glTF files from a temp directory.

use std::path::PathBuf;
use std::sync::Arc;

use heartview_lib::assets::{AssetCache, HttpModelLoader};
use heartview_lib::error::AssetError;

/// Fresh directory under the system temp dir, unique per test
fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("heartview-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// One-triangle glTF with its buffer embedded as a data URI
fn triangle_gltf() -> String {
    let mut bin = Vec::new();
    for v in [[0.0f32, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 4.0, 0.0]] {
        for c in v {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    for i in [0u16, 1, 2] {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    bin.extend_from_slice(&[0, 0]);
    format!(
        r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [0]}}],
  "nodes": [{{"mesh": 0}}],
  "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1}}]}}],
  "buffers": [{{"byteLength": {}, "uri": "data:application/octet-stream;base64,{}"}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
    {{"buffer": 0, "byteOffset": 36, "byteLength": 6}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [2, 4, 0]}},
    {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}}
  ]
}}"#,
        bin.len(),
        base64(&bin)
    )
}

fn base64(bytes: &[u8]) -> String {
    const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::new();
    for chunk in bytes.chunks(3) {
        let b = [chunk[0], *chunk.get(1).unwrap_or(&0), *chunk.get(2).unwrap_or(&0)];
        let n = (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32;
        for i in 0..4 {
            if i <= chunk.len() {
                out.push(TABLE[(n >> (18 - 6 * i) & 63) as usize] as char);
            } else {
                out.push('=');
            }
        }
    }
    out
}

fn write_model(dir: &PathBuf, name: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, triangle_gltf()).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_loads_gltf_from_disk() {
    let dir = temp_dir("disk");
    let path = write_model(&dir, "tri.gltf");

    let cache = AssetCache::new(HttpModelLoader::new());
    let model = cache.load_url(&path).await.unwrap();
    assert_eq!(model.triangle_count(), 1);
    assert_eq!(model.source(), path);
    let bounds = model.bounds();
    assert_eq!(bounds.max.x, 2.0);
    assert_eq!(bounds.max.y, 4.0);

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_falls_back_to_second_candidate() {
    let dir = temp_dir("fallback");
    let good = write_model(&dir, "heart.gltf");
    let missing = format!("file://{}", dir.join("missing.gltf").display());

    let cache = AssetCache::new(HttpModelLoader::new());
    let model = cache.resolve(&[missing.clone(), good.clone()]).await.unwrap();
    assert_eq!(model.source(), good);

    // Only the good candidate is cached; the failure is retried next time
    assert_eq!(cache.cached_urls(), vec![good.clone()]);
    assert!(cache.cached(&missing).is_none());

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_second_resolve_is_served_from_cache() {
    let dir = temp_dir("cached");
    let path = write_model(&dir, "heart.gltf");

    let cache = AssetCache::new(HttpModelLoader::new());
    let first = cache.resolve(&[path.clone()]).await.unwrap();

    // Removing the file proves the second resolve never touches the disk
    std::fs::remove_file(&path).unwrap();
    let second = cache.resolve(&[path.clone()]).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_all_candidates_missing() {
    let dir = temp_dir("missing");
    let candidates = vec![
        dir.join("a.gltf").to_string_lossy().into_owned(),
        dir.join("b.gltf").to_string_lossy().into_owned(),
    ];

    let cache = AssetCache::new(HttpModelLoader::new());
    match cache.resolve(&candidates).await {
        Err(AssetError::Unavailable { tried, last }) => {
            assert_eq!(tried, 2);
            assert!(last.to_string().contains("b.gltf"));
        }
        other => panic!("expected Unavailable, got {:?}", other.map(|m| m.source().to_string())),
    }
    assert!(cache.cached_urls().is_empty());

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_garbage_file_is_parse_error() {
    let dir = temp_dir("garbage");
    let path = dir.join("bad.glb");
    std::fs::write(&path, b"definitely not a model").unwrap();
    let path = path.to_string_lossy().into_owned();

    let cache = AssetCache::new(HttpModelLoader::new());
    let err = cache.load_url(&path).await.unwrap_err();
    assert!(matches!(err, AssetError::Parse { .. }), "{err}");

    std::fs::remove_dir_all(dir).ok();
}
