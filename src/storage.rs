// In: src/storage.rs

//! Whole-file persistence of datasets and encoded artifacts.
//!
//! Every file is one JSON object that is read and written in full. A file that
//! does not exist yet reads as the empty default `{"last_change": null,
//! "data": []}`, so a first run needs no bootstrapping. Saves go through a
//! temporary file in the same directory followed by a rename, which leaves
//! either the old or the new file in place, never a partial one.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::Result;
use crate::pipeline::{decode, EncodedArtifact};
use crate::types::{Dataset, Record, Value, DEFAULT_GROUP};

fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

/// Writes `bytes` to `path` by way of a sibling temporary file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(result?)
}

/// Loads a row-oriented dataset, or the empty default when the file is absent.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    match read_if_exists(path)? {
        Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
        None => {
            log::debug!("[STORAGE] {} does not exist, starting empty", path.display());
            Ok(Dataset::empty())
        }
    }
}

pub fn save_dataset(path: impl AsRef<Path>, dataset: &Dataset) -> Result<()> {
    write_atomic(path.as_ref(), &serde_json::to_vec(dataset)?)
}

/// Loads an encoded artifact, or `None` when the file is absent.
pub fn load_artifact(path: impl AsRef<Path>) -> Result<Option<EncodedArtifact>> {
    read_if_exists(path.as_ref())?
        .map(|bytes| EncodedArtifact::from_bytes(&bytes))
        .transpose()
}

/// Loads and decodes an encoded artifact, or the empty default when the file
/// is absent.
pub fn load_encoded(path: impl AsRef<Path>) -> Result<Dataset> {
    match load_artifact(path)? {
        Some(artifact) => decode(&artifact),
        None => Ok(Dataset::empty()),
    }
}

pub fn save_encoded(path: impl AsRef<Path>, artifact: &EncodedArtifact) -> Result<()> {
    let bytes = artifact.to_bytes()?;
    log::debug!(
        "[STORAGE] writing {} bytes to {}",
        bytes.len(),
        path.as_ref().display()
    );
    write_atomic(path.as_ref(), &bytes)
}

/// Merges a freshly pulled `update` into the `local` copy of a dataset.
///
/// Records are identified by the values of `key_fields`. A record from
/// `update` replaces the local record with the same key in place; new keys are
/// appended in update order. When `update` carries no records, the local
/// records and watermark are kept and only `last_sync` is taken over.
pub fn merge(local: Dataset, update: Dataset, key_fields: &[&str]) -> Dataset {
    let key = |record: &Record| -> Vec<Value> {
        key_fields
            .iter()
            .map(|f| record.get(*f).cloned().unwrap_or_default())
            .collect()
    };

    if update.is_empty() {
        let mut merged = local;
        merged.last_sync = update.last_sync;
        return merged;
    }

    let mut items: IndexMap<Vec<Value>, Record> = IndexMap::new();
    for record in local.groups.into_values().flatten() {
        items.insert(key(&record), record);
    }
    for record in update.groups.into_values().flatten() {
        items.insert(key(&record), record);
    }

    let mut groups = IndexMap::new();
    groups.insert(DEFAULT_GROUP.to_string(), items.into_values().collect());
    Dataset {
        last_change: update.last_change,
        last_sync: update.last_sync,
        groups,
    }
}
