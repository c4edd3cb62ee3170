//! JSON dataset files: named collections saved as pretty-printed arrays.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::DictionaryResult;

/// Indentation used for every dataset file.
const INDENT: &[u8] = b"    ";

/// A directory of named JSON collections.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    /// Open a store rooted at `root`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Full path of the collection `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Overwrite the collection `name` with `records`.
    ///
    /// Write failures propagate: losing a save silently would lose the run.
    pub fn save<T: Serialize>(&self, name: &str, records: &[T]) -> DictionaryResult<PathBuf> {
        fs::create_dir_all(&self.root)?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(INDENT);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        records.serialize(&mut ser)?;
        buf.push(b'\n');

        let path = self.path_for(name);
        let mut file = fs::File::create(&path)?;
        file.write_all(&buf)?;
        file.flush()?;

        tracing::debug!("saved {} record(s) to {}", records.len(), path.display());
        Ok(path)
    }

    /// Load the collection `name`.
    ///
    /// A missing, unreadable or corrupt file yields an empty collection.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Vec<T> {
        let path = self.path_for(name);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("no dataset at {}: {e}", path.display());
                return Vec::new();
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("ignoring corrupt dataset {}: {e}", path.display());
                Vec::new()
            }
        }
    }
}
