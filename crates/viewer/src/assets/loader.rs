use std::future::Future;
use std::path::PathBuf;

use super::resolve::is_absolute_url;
use super::{gltf_import, LoadedModel, ModelLoader};
use crate::error::AssetError;

/// Loads models over HTTP(S) or from the local filesystem
#[derive(Debug, Clone, Default)]
pub struct HttpModelLoader {
    client: reqwest::Client,
}

impl HttpModelLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelLoader for HttpModelLoader {
    fn load(&self, url: &str) -> impl Future<Output = Result<LoadedModel, AssetError>> + Send {
        let client = self.client.clone();
        let url = url.to_string();
        async move {
            let (bytes, base) = if is_absolute_url(&url) {
                (fetch(&client, &url).await?, None)
            } else {
                let path = local_path(&url);
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| AssetError::fetch(&url, e))?;
                (bytes, path.parent().map(PathBuf::from))
            };

            // Parsing large meshes is CPU-bound
            let source = url.clone();
            tokio::task::spawn_blocking(move || gltf_import::parse(&source, &bytes, base.as_deref()))
                .await
                .map_err(|e| AssetError::parse(&url, format!("parse task failed: {}", e)))?
        }
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, AssetError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AssetError::fetch(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AssetError::fetch(url, format!("status {}", status.as_u16())));
    }

    let bytes = response.bytes().await.map_err(|e| AssetError::fetch(url, e))?;
    Ok(bytes.to_vec())
}

/// `file://` prefix stripped, anything else taken as a filesystem path
fn local_path(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
}
