use std::path::PathBuf;

use anyhow::{Result, bail};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_FILE: &str = "hwmod.toml";
const CONFIG_PATH_ENV: &str = "HWMOD_CONFIG";
const ENV_PREFIX: &str = "HWMOD_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Base URL of the module resource host, e.g. `https://hw.example.com/modules`.
    pub module_resource_url: String,
    /// Install root. Archives extract into `<module_root>/modules`.
    pub module_root: PathBuf,
    /// Program and arguments used to encrypt block assets from the CLI.
    pub encryption_command: Vec<String>,
    pub verbose: bool,
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            module_resource_url: String::new(),
            module_root: PathBuf::from("./hwmod"),
            encryption_command: Vec::new(),
            verbose: false,
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the TOML file, `HWMOD_*` env vars and
    /// finally any CLI overrides, later layers winning.
    pub fn new<T: Serialize>(cli_overrides: Option<&T>) -> Result<Self> {
        let file = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Self::from_figment(Self::figment(&file, cli_overrides))
    }

    fn figment<T: Serialize>(file: &str, cli_overrides: Option<&T>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]));

        if let Some(overrides) = cli_overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        figment
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        Ok(figment.extract()?)
    }

    /// Check the settings an acquisition cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.module_resource_url.trim().is_empty() {
            bail!("module_resource_url is not configured");
        }
        Ok(())
    }
}
