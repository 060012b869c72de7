//! Named timing-code store, a name -> code map backed by a JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::Error;

/// Stored codes, keyed by user-chosen name. Saved by the caller after every
/// mutation; last write wins.
#[derive(Debug)]
pub struct CodeStore {
    path: PathBuf,
    codes: BTreeMap<String, Vec<u32>>,
}

impl CodeStore {
    /// Load the store at `path`. A missing or unreadable file yields an
    /// empty store; the cause is logged, not escalated.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let codes = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(codes) => codes,
                Err(err) => {
                    warn!("ignoring unreadable code store {}: {}", path.display(), err);
                    BTreeMap::new()
                }
            },
            Err(err) => {
                debug!("no code store at {}: {}", path.display(), err);
                BTreeMap::new()
            }
        };
        CodeStore { path, codes }
    }

    /// Write the store back to its file.
    pub fn save(&self) -> Result<(), Error> {
        let text = serde_json::to_string_pretty(&self.codes)
            .map_err(|err| Error::Persistence(err.to_string()))?;
        fs::write(&self.path, text)
            .map_err(|err| Error::Persistence(format!("{}: {}", self.path.display(), err)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&[u32]> {
        self.codes.get(name).map(Vec::as_slice)
    }

    pub fn insert(&mut self, name: &str, code: Vec<u32>) {
        self.codes.insert(name.to_string(), code);
    }

    /// Remove a code, returning whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.codes.remove(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
