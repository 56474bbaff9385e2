//! Configuration path discovery.
//!
//! Resolution order: CLI argument → environment variables → XDG config
//! directory → system config → builtin defaults.

use std::path::{Path, PathBuf};

/// Environment variable naming the config file directly.
const ENV_CONFIG_PATH: &str = "BATREC_CONFIG";

/// Environment variable naming a directory containing `recorder.json`.
const ENV_CONFIG_DIR: &str = "BATREC_CONFIG_DIR";

/// Standard config file name.
const CONFIG_FILENAME: &str = "recorder.json";

/// Application name for XDG directories.
const APP_NAME: &str = "batrec";

/// Where the configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in the XDG config directory.
    XdgConfig,

    /// Found in /etc/batrec/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Outcome of config path resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    /// Path to recorder.json, or None when only builtin defaults apply.
    pub path: Option<PathBuf>,

    /// Where the path came from (for diagnostics).
    pub source: ConfigSource,
}

/// Resolve the configuration file path.
///
/// Resolution order:
/// 1. Explicit CLI path
/// 2. `BATREC_CONFIG` (direct file path)
/// 3. `BATREC_CONFIG_DIR` + `recorder.json`
/// 4. XDG config directory (`~/.config/batrec/recorder.json`)
/// 5. System config (`/etc/batrec/recorder.json`)
/// 6. Built-in defaults (no path)
///
/// An explicit path (CLI or env) is taken as given even when the file does
/// not currently exist: the operator named it, so a load failure should
/// surface as an error instead of silently falling back to another source.
/// The searched locations (XDG, /etc) are only selected when present.
pub fn resolve_config_path(cli_path: Option<&Path>) -> ResolvedConfig {
    // 1. CLI argument
    if let Some(path) = cli_path {
        return ResolvedConfig {
            path: Some(path.to_path_buf()),
            source: ConfigSource::CliArgument,
        };
    }

    // 2. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        return ResolvedConfig {
            path: Some(PathBuf::from(env_path)),
            source: ConfigSource::Environment,
        };
    }

    // 3. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        return ResolvedConfig {
            path: Some(PathBuf::from(config_dir).join(CONFIG_FILENAME)),
            source: ConfigSource::Environment,
        };
    }

    // 4. XDG config directory
    if let Some(xdg_config) = dirs::config_dir() {
        let path = xdg_config.join(APP_NAME).join(CONFIG_FILENAME);
        if path.exists() {
            return ResolvedConfig {
                path: Some(path),
                source: ConfigSource::XdgConfig,
            };
        }
    }

    // 5. System config
    let system_path = system_config_dir().join(CONFIG_FILENAME);
    if system_path.exists() {
        return ResolvedConfig {
            path: Some(system_path),
            source: ConfigSource::SystemConfig,
        };
    }

    // 6. Built-in defaults
    ResolvedConfig::default()
}

/// Get the XDG config directory for batrec.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}
