//! Keyed persistence for model state and the owner record.
//!
//! Layout under the data directory:
//!
//! ```text
//! <data>/owner.json
//! <data>/models/global.json
//! <data>/models/caller-<sha256 of principal>.json
//! ```
//!
//! Writes go through a temp file and a rename so a crash never leaves a
//! half-written state file behind.

use crate::sequential::ModelState;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vp_common::Principal;

/// Environment override for the data directory.
pub const ENV_DATA_DIR: &str = "VP_DATA";

const APP_DIR_NAME: &str = "visit-predict";
const MODELS_DIR_NAME: &str = "models";
const OWNER_FILENAME: &str = "owner.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to resolve data directory (set VP_DATA or XDG_DATA_HOME)")]
    DataDirUnavailable,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid state file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<StoreError> for vp_common::Error {
    fn from(err: StoreError) -> Self {
        vp_common::Error::Store(err.to_string())
    }
}

/// Which model instance an operation addresses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "caller", rename_all = "snake_case")]
pub enum StateKey {
    Global,
    Caller(Principal),
}

impl StateKey {
    /// File stem; never contains the raw principal.
    pub fn file_stem(&self) -> String {
        match self {
            StateKey::Global => "global".to_string(),
            StateKey::Caller(p) => format!("caller-{}", p.fingerprint()),
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKey::Global => write!(f, "global"),
            StateKey::Caller(p) => write!(f, "caller:{}", p),
        }
    }
}

/// Durable keyed storage for the engine.
pub trait StateStore {
    fn load_model(&self, key: &StateKey) -> Result<Option<ModelState>, StoreError>;
    fn save_model(&mut self, key: &StateKey, state: &ModelState) -> Result<(), StoreError>;
    fn remove_model(&mut self, key: &StateKey) -> Result<(), StoreError>;

    fn load_owner(&self) -> Result<Option<Principal>, StoreError>;
    fn save_owner(&mut self, owner: &Principal) -> Result<(), StoreError>;
    fn remove_owner(&mut self) -> Result<(), StoreError>;
}

/// In-process store, used by tests and embedders that persist elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    models: BTreeMap<StateKey, ModelState>,
    owner: Option<Principal>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }
}

impl StateStore for MemoryStore {
    fn load_model(&self, key: &StateKey) -> Result<Option<ModelState>, StoreError> {
        Ok(self.models.get(key).cloned())
    }

    fn save_model(&mut self, key: &StateKey, state: &ModelState) -> Result<(), StoreError> {
        self.models.insert(key.clone(), state.clone());
        Ok(())
    }

    fn remove_model(&mut self, key: &StateKey) -> Result<(), StoreError> {
        self.models.remove(key);
        Ok(())
    }

    fn load_owner(&self) -> Result<Option<Principal>, StoreError> {
        Ok(self.owner.clone())
    }

    fn save_owner(&mut self, owner: &Principal) -> Result<(), StoreError> {
        self.owner = Some(owner.clone());
        Ok(())
    }

    fn remove_owner(&mut self) -> Result<(), StoreError> {
        self.owner = None;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OwnerRecord {
    owner: Principal,
}

/// One JSON file per key under a root directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        JsonFileStore { root: root.into() }
    }

    /// Store rooted at the resolved default data directory.
    pub fn open_default() -> Result<Self, StoreError> {
        Ok(Self::new(resolve_data_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn model_path(&self, key: &StateKey) -> PathBuf {
        self.root
            .join(MODELS_DIR_NAME)
            .join(format!("{}.json", key.file_stem()))
    }

    pub fn owner_path(&self) -> PathBuf {
        self.root.join(OWNER_FILENAME)
    }
}

impl StateStore for JsonFileStore {
    fn load_model(&self, key: &StateKey) -> Result<Option<ModelState>, StoreError> {
        read_json(&self.model_path(key))
    }

    fn save_model(&mut self, key: &StateKey, state: &ModelState) -> Result<(), StoreError> {
        write_json_pretty_atomic(&self.model_path(key), state)
    }

    fn remove_model(&mut self, key: &StateKey) -> Result<(), StoreError> {
        remove_if_exists(&self.model_path(key))
    }

    fn load_owner(&self) -> Result<Option<Principal>, StoreError> {
        Ok(read_json::<OwnerRecord>(&self.owner_path())?.map(|r| r.owner))
    }

    fn save_owner(&mut self, owner: &Principal) -> Result<(), StoreError> {
        write_json_pretty_atomic(
            &self.owner_path(),
            &OwnerRecord {
                owner: owner.clone(),
            },
        )
    }

    fn remove_owner(&mut self) -> Result<(), StoreError> {
        remove_if_exists(&self.owner_path())
    }
}

/// Resolve the data directory.
///
/// 1. `VP_DATA`
/// 2. `$XDG_DATA_HOME/visit-predict`
/// 3. platform data dir + `visit-predict`
pub fn resolve_data_dir() -> Result<PathBuf, StoreError> {
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(dir));
    }

    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return Ok(PathBuf::from(xdg).join(APP_DIR_NAME));
    }

    dirs::data_dir()
        .map(|base| base.join(APP_DIR_NAME))
        .ok_or(StoreError::DataDirUnavailable)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let content = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    serde_json::from_slice(&content)
        .map(Some)
        .map_err(|e| StoreError::Json {
            path: path.to_path_buf(),
            source: e,
        })
}

fn remove_if_exists(path: &Path) -> Result<(), StoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn write_json_pretty_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let content = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("state.json");
    let tmp_path = path.with_file_name(format!("{}.tmp.{}", file_name, std::process::id()));
    {
        use std::io::Write;
        let mut file = std::fs::File::create(&tmp_path).map_err(|e| StoreError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        file.write_all(&content)
            .and_then(|_| file.sync_all())
            .map_err(|e| StoreError::Io {
                path: tmp_path.clone(),
                source: e,
            })?;
    }
    std::fs::rename(&tmp_path, path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
