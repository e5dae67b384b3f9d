use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::plugin::installer::{InstallOptions, DEFAULT_INSTALL_TIMEOUT};
use crate::plugin::package_manager::PackageManager;

/// Workspace config file name, looked up in the workspace root.
pub const CONFIG_FILE_NAME: &str = "apigen.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Install missing generator plugin packages without asking.
    #[serde(default)]
    pub auto_install: bool,

    /// Package manager to use for installs; detected when unset.
    #[serde(default)]
    pub package_manager: Option<String>,

    #[serde(default = "default_install_timeout_secs")]
    pub install_timeout_secs: u64,
}

fn default_install_timeout_secs() -> u64 {
    DEFAULT_INSTALL_TIMEOUT.as_secs()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_install: false,
            package_manager: None,
            install_timeout_secs: default_install_timeout_secs(),
        }
    }
}

impl Config {
    /// Load the config from `<root>/apigen.toml`, defaulting when the file
    /// does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// The configured package manager, when valid.
    pub fn package_manager(&self) -> Option<PackageManager> {
        self.package_manager
            .as_deref()
            .and_then(PackageManager::from_name)
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    /// Install options for loader escalation: always a dev dependency,
    /// never forced.
    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            dev: true,
            package_manager: self.package_manager(),
            timeout: self.install_timeout(),
            force: false,
        }
    }
}
