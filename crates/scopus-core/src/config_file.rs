use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Config;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api: Option<ApiConfig>,
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub inst_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub dir: Option<String>,
    pub max_entries: Option<usize>,
}

impl ConfigFile {
    /// Overwrite the fields of `config` that this file sets.
    pub fn apply(&self, config: &mut Config) {
        if let Some(api) = &self.api {
            if let Some(key) = &api.api_key {
                config.api_key = Some(key.clone());
            }
            if let Some(token) = &api.inst_token {
                config.inst_token = Some(token.clone());
            }
            if let Some(secs) = api.timeout_secs {
                config.timeout_secs = secs;
            }
        }
        if let Some(cache) = &self.cache {
            if let Some(dir) = &cache.dir {
                config.cache_dir = PathBuf::from(dir);
            }
            if let Some(max) = cache.max_entries {
                config.max_entries = max;
            }
        }
    }
}

/// Platform config directory path: `<config_dir>/scopus/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("scopus").join("config.toml"))
}

/// Load config by cascading CWD `.scopus.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".scopus.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_api = base.api.unwrap_or_default();
    let over_api = overlay.api.unwrap_or_default();
    let base_cache = base.cache.unwrap_or_default();
    let over_cache = overlay.cache.unwrap_or_default();

    ConfigFile {
        api: Some(ApiConfig {
            api_key: over_api.api_key.or(base_api.api_key),
            inst_token: over_api.inst_token.or(base_api.inst_token),
            timeout_secs: over_api.timeout_secs.or(base_api.timeout_secs),
        }),
        cache: Some(CacheConfig {
            dir: over_cache.dir.or(base_cache.dir),
            max_entries: over_cache.max_entries.or(base_cache.max_entries),
        }),
    }
}

/// Save the config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    save_to_path(config, &path)?;
    Ok(path)
}

pub fn save_to_path(config: &ConfigFile, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))
}
