use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::paths::{DirectoryResolver, ModuleDirectories};

/// Shared handles for an acquisition: configuration, HTTP client and directory layout.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub http: reqwest::Client,
    pub directories: Arc<dyn DirectoryResolver>,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        let directories = Arc::new(ModuleDirectories::new(config.module_root.clone()));
        Self::with_directories(config, directories)
    }

    pub fn with_directories(config: AppConfig, directories: Arc<dyn DirectoryResolver>) -> Self {
        Self {
            config: Arc::new(config),
            http: reqwest::Client::new(),
            directories,
        }
    }
}
