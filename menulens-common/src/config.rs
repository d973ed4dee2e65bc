//! Configuration loading and root folder resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (root folder only)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "MENULENS_CONFIG";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "menulens.db";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub scan: ScanSection,
    pub providers: ProviderKeys,
    pub cache: CacheSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[scan]` section: provider selection and batching
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    pub extraction_provider: Option<String>,
    pub enrichment_provider: Option<String>,
    pub lazy_enrichment: Option<bool>,
    pub batch_size: Option<usize>,
    pub stagger_ms: Option<u64>,
}

/// `[providers]` section: backend credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderKeys {
    pub openai_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub cloud_vision_api_key: Option<String>,
}

/// `[cache]` section: offline cuisine snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub snapshot_base_url: Option<String>,
    pub ttl_days: Option<u32>,
}

/// Resolve the root folder holding the database
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Path of the SQLite database inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// Locate the config file for this platform
///
/// `$MENULENS_CONFIG` wins; otherwise the per-user config directory, then
/// `/etc/menulens/config.toml` on Linux.
pub fn config_file_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("menulens").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/menulens/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the platform config file, falling back to defaults
///
/// A missing file is normal. An unreadable or malformed file is logged and
/// ignored so the service still starts on environment configuration.
pub fn load_default_toml_config() -> TomlConfig {
    let path = match config_file_path() {
        Ok(path) => path,
        Err(_) => return TomlConfig::default(),
    };

    match load_toml_config(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring config file {}: {}", path.display(), e);
            TomlConfig::default()
        }
    }
}

/// Write config atomically (temp file in the same directory, then rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("menulens"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/menulens"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("menulens"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/menulens"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("menulens"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\menulens"))
    } else {
        PathBuf::from("./menulens_data")
    }
}
