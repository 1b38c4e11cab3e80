//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI arguments → environment variables → XDG paths → defaults.

use std::path::{Path, PathBuf};

/// Discovered configuration file paths.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path to priors.json (or None if not found).
    pub priors: Option<PathBuf>,

    /// Path to engine.json (or None if not found).
    pub engine: Option<PathBuf>,

    pub priors_source: ConfigSource,

    pub engine_source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in the directory passed with `--config`.
    ConfigDir,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/visit-predict/.
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
            ConfigSource::ConfigDir => write!(f, "config directory"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_PRIORS_PATH: &str = "VP_PRIORS";
pub const ENV_ENGINE_PATH: &str = "VP_ENGINE";
pub const ENV_CONFIG_DIR: &str = "VP_CONFIG_DIR";

/// Standard config file names.
pub const PRIORS_FILENAME: &str = "priors.json";
pub const ENGINE_FILENAME: &str = "engine.json";

/// Application name for XDG directories.
const APP_NAME: &str = "visit-predict";

/// Resolve configuration paths using the standard resolution order.
///
/// Resolution order for each config file:
/// 1. Explicit CLI path (if provided)
/// 2. `--config` directory + filename
/// 3. Environment variable (VP_PRIORS, VP_ENGINE)
/// 4. VP_CONFIG_DIR environment variable + filename
/// 5. XDG config directory (~/.config/visit-predict/)
/// 6. System config (/etc/visit-predict/)
/// 7. Built-in defaults (None)
pub fn resolve_config(
    config_dir: Option<&Path>,
    cli_priors: Option<&Path>,
    cli_engine: Option<&Path>,
) -> ConfigPaths {
    let mut paths = ConfigPaths::default();

    paths.priors = resolve_single_config(
        config_dir,
        cli_priors,
        ENV_PRIORS_PATH,
        PRIORS_FILENAME,
        &mut paths.priors_source,
    );

    paths.engine = resolve_single_config(
        config_dir,
        cli_engine,
        ENV_ENGINE_PATH,
        ENGINE_FILENAME,
        &mut paths.engine_source,
    );

    paths
}

/// Resolve a single configuration file path.
fn resolve_single_config(
    config_dir: Option<&Path>,
    cli_path: Option<&Path>,
    env_var: &str,
    filename: &str,
    source: &mut ConfigSource,
) -> Option<PathBuf> {
    // An explicit path is returned even when missing so the loader can
    // report it instead of silently falling back to defaults.
    if let Some(path) = cli_path {
        *source = ConfigSource::CliArgument;
        return Some(path.to_path_buf());
    }

    if let Some(dir) = config_dir {
        let path = dir.join(filename);
        if path.exists() {
            *source = ConfigSource::ConfigDir;
            return Some(path);
        }
    }

    if let Ok(env_path) = std::env::var(env_var) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            *source = ConfigSource::Environment;
            return Some(path);
        }
    }

    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(dir).join(filename);
        if path.exists() {
            *source = ConfigSource::Environment;
            return Some(path);
        }
    }

    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(filename);
        if path.exists() {
            *source = ConfigSource::XdgConfig;
            return Some(path);
        }
    }

    let system_path = system_config_dir().join(filename);
    if system_path.exists() {
        *source = ConfigSource::SystemConfig;
        return Some(system_path);
    }

    *source = ConfigSource::BuiltinDefault;
    None
}

/// Get the XDG config directory for visit-predict.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}
