//! Configuration loading for vp-core.
//!
//! This module handles:
//! - Locating priors.json and engine.json (CLI > env > XDG > system > defaults)
//! - Shape validation through serde, semantic validation through vp-config
//! - A [`ConfigSnapshot`] pinning the loaded file hashes

pub use vp_config::{
    ConfigPaths, ConfigSnapshot, ConfigSource, EngineSettings, Priors, ValidationError,
};

use std::path::{Path, PathBuf};
use thiserror::Error;
use vp_config::resolve_config;
use vp_config::validate::{validate_engine_settings, validate_priors};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Invalid {
        path: String,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn is_version_mismatch(&self) -> bool {
        matches!(
            self,
            ConfigError::Invalid {
                source: ValidationError::VersionMismatch { .. },
                ..
            }
        )
    }
}

impl From<ConfigError> for vp_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid { .. } => vp_common::Error::InvalidPriors(err.to_string()),
            _ => vp_common::Error::Config(err.to_string()),
        }
    }
}

/// Explicit locations from the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub config_dir: Option<PathBuf>,
    pub priors_path: Option<PathBuf>,
    pub engine_path: Option<PathBuf>,
}

/// Loaded and validated configuration with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub priors: Priors,
    pub engine: EngineSettings,
    pub paths: ConfigPaths,
    pub snapshot: ConfigSnapshot,
}

/// Resolve, parse and validate both configuration files.
///
/// A file named explicitly on the command line must exist; anything found
/// by discovery is optional and falls back to built-in defaults.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let paths = resolve_config(
        options.config_dir.as_deref(),
        options.priors_path.as_deref(),
        options.engine_path.as_deref(),
    );

    let (priors, priors_json) = match &paths.priors {
        Some(path) => {
            let json = read_config(path)?;
            let priors = Priors::from_json(&json).map_err(|e| invalid(path, e))?;
            (priors, Some(json))
        }
        None => (Priors::default(), None),
    };
    validate_priors(&priors).map_err(|e| invalid_opt(paths.priors.as_deref(), e))?;

    let (engine, engine_json) = match &paths.engine {
        Some(path) => {
            let json = read_config(path)?;
            let engine = EngineSettings::from_json(&json).map_err(|e| invalid(path, e))?;
            (engine, Some(json))
        }
        None => (EngineSettings::default(), None),
    };
    validate_engine_settings(&engine).map_err(|e| invalid_opt(paths.engine.as_deref(), e))?;

    let snapshot = ConfigSnapshot::new(
        &priors,
        &engine,
        &paths,
        priors_json.as_deref(),
        engine_json.as_deref(),
    );

    Ok(ResolvedConfig {
        priors,
        engine,
        paths,
        snapshot,
    })
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

fn invalid(path: &Path, source: ValidationError) -> ConfigError {
    ConfigError::Invalid {
        path: path.display().to_string(),
        source,
    }
}

fn invalid_opt(path: Option<&Path>, source: ValidationError) -> ConfigError {
    match path {
        Some(p) => invalid(p, source),
        None => ConfigError::Invalid {
            path: "<builtin>".to_string(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let options = ConfigOptions {
            priors_path: Some(tmp.path().join("nope.json")),
            ..Default::default()
        };
        let err = load_config(&options).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn config_dir_files_are_loaded_and_hashed() {
        let tmp = TempDir::new().unwrap();
        let mut priors = Priors::default();
        priors.description = Some("clinic tables".to_string());
        std::fs::write(
            tmp.path().join("priors.json"),
            serde_json::to_string_pretty(&priors).unwrap(),
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("engine.json"),
            r#"{"schema_version":"1.0.0","tenancy":"per_caller","complexity_overflow":"reject","max_workload_iterations":16}"#,
        )
        .unwrap();

        let resolved = load_config(&ConfigOptions {
            config_dir: Some(tmp.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(resolved.priors, priors);
        assert_eq!(resolved.engine.max_workload_iterations, 16);
        assert_eq!(resolved.paths.priors_source, ConfigSource::ConfigDir);
        assert!(resolved.snapshot.priors_hash.is_some());
        assert!(resolved.snapshot.engine_hash.is_some());
    }

    #[test]
    fn semantic_errors_name_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("priors.json");
        let mut priors = Priors::default();
        priors.classes.pph.prior = 70;
        std::fs::write(&path, serde_json::to_string(&priors).unwrap()).unwrap();

        let err = load_config(&ConfigOptions {
            priors_path: Some(path.clone()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("priors.json"));
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(!err.is_version_mismatch());
    }

    #[test]
    fn version_mismatch_is_flagged() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("engine.json");
        std::fs::write(&path, r#"{"schema_version":"9.0.0"}"#).unwrap();
        let err = load_config(&ConfigOptions {
            engine_path: Some(path),
            priors_path: None,
            config_dir: Some(tmp.path().to_path_buf()),
        })
        .unwrap_err();
        assert!(err.is_version_mismatch());
    }
}
