//! Block-asset fetching.
//!
//! Each key is fetched, encrypted through the caller's gateway and written to
//! `<block_modules>/<name>/block`. Keys are independent: one failing never stops
//! the others, and no failure reaches the caller.

use std::path::{Path, PathBuf};

use futures_util::future::join_all;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::core::encryption::EncryptionGateway;
use crate::core::models::ModuleRequest;
use crate::error::BlockError;

/// Block assets fetched for every module.
pub const BLOCK_KEYS: &[&str] = &["block"];

const BLOCK_FILE_NAME: &str = "block";

/// Per-key outcome of a block fetch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlockReport {
    pub written: Vec<String>,
    pub failed: Vec<String>,
}

pub struct BlockFetcher {
    client: Client,
    base_url: String,
    block_modules: PathBuf,
}

impl BlockFetcher {
    pub fn new(client: Client, base_url: impl Into<String>, block_modules: PathBuf) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            block_modules,
        }
    }

    /// URL of a block asset. Every key currently maps to the `block` path segment.
    pub fn block_url(&self, request: &ModuleRequest) -> String {
        format!(
            "{}/{}/files/block/{}",
            self.base_url.trim_end_matches('/'),
            request.name,
            request.version
        )
    }

    pub fn destination_dir(&self, request: &ModuleRequest) -> PathBuf {
        self.block_modules.join(&request.name)
    }

    /// Fetch every key concurrently. Failures are logged and recorded in the report.
    pub async fn fetch_blocks(
        &self,
        request: &ModuleRequest,
        keys: &[&str],
        encryption: &dyn EncryptionGateway,
    ) -> BlockReport {
        let results = join_all(
            keys.iter()
                .map(|key| async move { (*key, self.fetch_one(request, encryption).await) }),
        )
        .await;

        let mut report = BlockReport::default();
        for (key, result) in results {
            match result {
                Ok(path) => {
                    info!(key, path = %path.display(), "Block asset written");
                    report.written.push(key.to_string());
                }
                Err(e) => {
                    warn!(key, module = %request.name, error = %e, "Block asset fetch failed");
                    report.failed.push(key.to_string());
                }
            }
        }
        report
    }

    async fn fetch_one(
        &self,
        request: &ModuleRequest,
        encryption: &dyn EncryptionGateway,
    ) -> Result<PathBuf, BlockError> {
        let url = self.block_url(request);
        debug!(url = %url, "Requesting block asset");

        let response = self.client.get(&url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(BlockError::Status {
                url,
                status: response.status(),
            });
        }
        let body = response.text().await?;

        let dest_dir = self.destination_dir(request);
        tokio::fs::create_dir_all(&dest_dir)
            .await
            .map_err(|source| BlockError::Io {
                path: dest_dir.clone(),
                source,
            })?;

        let encrypted = encryption
            .request_encryption(&body)
            .await
            .map_err(BlockError::Encryption)?;

        let path = dest_dir.join(BLOCK_FILE_NAME);
        write_block(&path, &encrypted).await?;
        Ok(path)
    }
}

async fn write_block(path: &Path, bytes: &[u8]) -> Result<(), BlockError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| BlockError::Io {
            path: path.to_path_buf(),
            source,
        })
}
