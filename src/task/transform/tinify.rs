//! Lossy image recompression through the Tinify API.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use super::{Transform, TransformEnv};
use crate::debug;
use crate::task::{Asset, TransformError};

const TIMEOUT: Duration = Duration::from_secs(60);

/// Upload each image and replace it with the compressed result.
pub struct Recompress {
    key: String,
    url: String,
    client: OnceLock<Result<Client, String>>,
}

#[derive(Debug, Deserialize)]
struct Shrink {
    output: ShrinkOutput,
}

#[derive(Debug, Deserialize)]
struct ShrinkOutput {
    url: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
    #[serde(default)]
    message: String,
}

impl Recompress {
    pub fn new(key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&Client, TransformError> {
        self.client
            .get_or_init(|| {
                Client::builder()
                    .timeout(TIMEOUT)
                    .build()
                    .map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|e| TransformError::Remote(e.clone()))
    }

    fn shrink(&self, contents: &[u8]) -> Result<Vec<u8>, TransformError> {
        let client = self.client()?;
        let remote = |e: reqwest::Error| TransformError::Remote(e.to_string());

        let response = client
            .post(&self.url)
            .basic_auth("api", Some(&self.key))
            .body(contents.to_vec())
            .send()
            .map_err(remote)?;

        let status = response.status();
        if !status.is_success() {
            let reason = match response.json::<ApiError>() {
                Ok(api) if api.message.is_empty() => api.error,
                Ok(api) => format!("{}: {}", api.error, api.message),
                Err(_) => status.to_string(),
            };
            return Err(TransformError::Remote(reason));
        }

        let shrink: Shrink = response.json().map_err(remote)?;
        let compressed = client
            .get(&shrink.output.url)
            .basic_auth("api", Some(&self.key))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .map_err(remote)?;

        debug!("img"; "{} → {} bytes", contents.len(), shrink.output.size.max(compressed.len() as u64));
        Ok(compressed.to_vec())
    }
}

impl Transform for Recompress {
    fn name(&self) -> &'static str {
        "tinify"
    }

    fn apply(&self, asset: Asset, _env: &TransformEnv<'_>) -> Result<Vec<Asset>, TransformError> {
        let compressed = self.shrink(&asset.contents)?;
        Ok(vec![asset.with_contents(compressed)])
    }
}
