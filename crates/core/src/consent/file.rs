use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};

use crate::{
    consent::DecisionStore,
    error::{Result, UsageError},
};

/// Default location of the persisted decision document.
pub fn default_decision_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("usage-report").join("decision.json"))
        .ok_or(UsageError::NoConfigDir)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct StoredDecision {
    #[serde(default)]
    decided: bool,
    #[serde(default)]
    accepted: bool,
}

/// Decision store persisted as a small JSON document.
///
/// The document is read once on open and cached; `set_decision` writes through.
#[derive(Debug)]
pub struct FileDecisionStore {
    path: PathBuf,
    cached: Mutex<StoredDecision>,
}

impl FileDecisionStore {
    /// Open the store at `path`. A missing file means the user has not decided yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cached = match fs::read_to_string(&path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| UsageError::StoreRead {
                    path: path.clone(),
                    reason: e.to_string(),
                })?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => StoredDecision::default(),
            Err(e) => {
                return Err(UsageError::StoreRead {
                    path,
                    reason: e.to_string(),
                });
            }
        };

        Ok(Self {
            path,
            cached: Mutex::new(cached),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_decision_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, decision: &StoredDecision) -> Result<()> {
        let write_err = |e: std::io::Error| UsageError::StoreWrite {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(decision)?;
        fs::write(&self.path, json).map_err(write_err)
    }
}

impl DecisionStore for FileDecisionStore {
    fn has_decided(&self) -> bool {
        self.cached.lock().expect("FileDecisionStore poisoned").decided
    }

    fn has_accepted(&self) -> bool {
        self.cached.lock().expect("FileDecisionStore poisoned").accepted
    }

    fn set_decision(&self, accept: bool) -> Result<()> {
        let mut cached = self.cached.lock().expect("FileDecisionStore poisoned");
        let next = StoredDecision {
            decided: true,
            accepted: accept,
        };
        self.write(&next)?;
        *cached = next;
        Ok(())
    }
}
