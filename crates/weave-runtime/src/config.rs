//! Optional host-side configuration: where to look for plugins, and
//! the default log filter. This is config for *embedding* the runtime,
//! not config for domain plugins.

use std::path::PathBuf;

use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Directories searched, in order, for `load_plugin_from_path` when
    /// given a bare file name instead of a full path.
    #[serde(default)]
    pub plugin_search_paths: Vec<PathBuf>,

    /// Default `tracing` filter directive used by `logging::init` when
    /// `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            plugin_search_paths: Vec::new(),
            log_filter: default_log_filter(),
        }
    }
}

impl RuntimeConfig {
    /// Appends the user config directory (`~/.config/weave` on Linux,
    /// the platform equivalent elsewhere) to `plugin_search_paths`, if
    /// the platform exposes one.
    pub fn with_user_config_dir(mut self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.plugin_search_paths.push(config_dir.join("weave"));
        }
        self
    }
}

/// Loads a [`RuntimeConfig`] from `path`, using the file extension to
/// pick a `figment` provider.
#[cfg(feature = "toml-config")]
pub fn load_toml(path: impl AsRef<std::path::Path>) -> ConfigResult<RuntimeConfig> {
    use figment::providers::{Format, Toml};
    Ok(Figment::new()
        .merge(Toml::file(path.as_ref()))
        .extract()?)
}

#[cfg(feature = "yaml-config")]
pub fn load_yaml(path: impl AsRef<std::path::Path>) -> ConfigResult<RuntimeConfig> {
    use figment::providers::{Format, Yaml};
    Ok(Figment::new()
        .merge(Yaml::file(path.as_ref()))
        .extract()?)
}

/// Loads config from environment variables prefixed `WEAVE_`
/// (`WEAVE_LOG_FILTER`, ...), falling back to defaults for anything
/// unset.
pub fn load_env() -> ConfigResult<RuntimeConfig> {
    use figment::providers::Env;
    Ok(Figment::from(figment::providers::Serialized::defaults(
        RuntimeConfig::default(),
    ))
    .merge(Env::prefixed("WEAVE_"))
    .extract()?)
}
