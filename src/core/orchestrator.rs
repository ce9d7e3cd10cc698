//! Module acquisition: download, extract, read config, fetch blocks, relocate.
//!
//! Steps run strictly in that order except block fetching and relocation,
//! which run together once the config has been read. Only validation, the
//! archive request, extraction and the config read can fail an acquisition.
//!
//! Acquisitions of the same module name are not excluded from each other:
//! the last writer wins on the `block` file and directory creation may race.

use futures_util::TryStreamExt;
use reqwest::StatusCode;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::context::AppContext;
use crate::core::block::{BLOCK_KEYS, BlockFetcher};
use crate::core::encryption::EncryptionGateway;
use crate::core::extractor::extract_stream;
use crate::core::models::{HardwareConfig, ModuleRequest};
use crate::core::relocator::Relocator;
use crate::error::{AcquireError, Result};

pub struct Orchestrator {
    ctx: AppContext,
}

impl Orchestrator {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub fn module_url(&self, request: &ModuleRequest) -> String {
        format!(
            "{}/{}/files/module/{}",
            self.ctx.config.module_resource_url.trim_end_matches('/'),
            request.name,
            request.version
        )
    }

    /// Acquire a module and return its descriptor marked available.
    pub async fn acquire(
        &self,
        request: &ModuleRequest,
        encryption: &dyn EncryptionGateway,
    ) -> Result<HardwareConfig> {
        request.validate()?;

        let span = info_span!(
            "acquire",
            id = %Uuid::now_v7(),
            module = %request.name,
            version = %request.version
        );

        self.run(request, encryption).instrument(span).await
    }

    async fn run(
        &self,
        request: &ModuleRequest,
        encryption: &dyn EncryptionGateway,
    ) -> Result<HardwareConfig> {
        let url = self.module_url(request);
        info!(url = %url, "Downloading hardware module");

        let response = self.ctx.http.get(&url).send().await?;
        if response.status() != StatusCode::OK {
            warn!(url = %url, status = %response.status(), "Module request failed");
            return Err(AcquireError::Transport {
                url,
                status: response.status(),
            });
        }

        let modules_dir = self.ctx.directories.modules();
        debug!(target_dir = %modules_dir.display(), "Extracting module archive");
        let body = response.bytes_stream().map_err(std::io::Error::other);
        extract_stream(body, &modules_dir).await?;

        let config_path = modules_dir.join(format!("{}.json", request.name));
        info!(path = %config_path.display(), "Reading module config");
        let raw = tokio::fs::read(&config_path).await.map_err(|source| {
            warn!(
                kind = ?source.kind(),
                error = %source,
                "Module config read failed"
            );
            AcquireError::ConfigRead {
                path: config_path.clone(),
                source,
            }
        })?;
        let mut config = HardwareConfig::from_slice(&raw)?;

        let blocks = BlockFetcher::new(
            self.ctx.http.clone(),
            self.ctx.config.module_resource_url.clone(),
            self.ctx.directories.block_modules(),
        );
        let relocator = Relocator::new(self.ctx.directories.module_root());

        let (report, relocated) = tokio::join!(
            blocks.fetch_blocks(request, BLOCK_KEYS, encryption),
            relocator.relocate()
        );
        if !report.failed.is_empty() {
            warn!(failed = ?report.failed, "Module installed without some block assets");
        }

        config.mark_available();
        info!(
            relocated_files = relocated,
            config = %serde_json::to_string(&config).unwrap_or_default(),
            "Hardware module installed"
        );
        Ok(config)
    }
}
