use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{FleetError, Result};
use crate::store::SortOrder;

const APP_DIR_NAME: &str = "fleetfolders";
const CONFIG_FILE_NAME: &str = "config.toml";
const FOLDERS_FILE_NAME: &str = "folders.json";

/// Loaded from defaults, then `~/.config/fleetfolders/config.toml`, then
/// `FLEETFOLDERS_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub launcher: LauncherConfig,
    pub picker: PickerConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub folders_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Program used to open folders; the platform file manager when unset.
    pub program: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    pub exit_on_open: bool,
    pub sort: SortOrder,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            exit_on_open: true,
            sort: SortOrder::File,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_config_path())
    }

    pub fn load_from(config_file: PathBuf) -> Result<Self> {
        tracing::debug!(path = %config_file.display(), "loading configuration");
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FLEETFOLDERS_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(program) = &self.launcher.program {
            if program.trim().is_empty() {
                return Err(FleetError::ConfigValidation(
                    "launcher.program 不能为空".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    pub fn folders_file(&self) -> PathBuf {
        self.storage.folders_file.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from(".local/share"))
                .join(APP_DIR_NAME)
                .join(FOLDERS_FILE_NAME)
        })
    }
}
