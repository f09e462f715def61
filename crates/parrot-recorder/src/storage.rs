//! Macro persistence: byte-level serialize/deserialize plus a single-file
//! store holding every saved macro.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::events::Macro;

pub fn serialize_macro(m: &Macro) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(m)?)
}

pub fn deserialize_macro(bytes: &[u8]) -> Result<Macro> {
    Ok(serde_json::from_slice(bytes)?)
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    macros: Vec<Macro>,
    #[serde(default)]
    saved_at: i64,
}

/// All macros live in one JSON document; a missing file is an empty store.
pub struct MacroStore {
    path: PathBuf,
}

impl MacroStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Macro>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.path)?;
        let doc: StoreDocument = serde_json::from_slice(&bytes)?;
        Ok(doc.macros)
    }

    pub fn save(&self, macros: &[Macro]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let doc = StoreDocument {
            macros: macros.to_vec(),
            saved_at: chrono::Utc::now().timestamp(),
        };
        fs::write(&self.path, serde_json::to_vec_pretty(&doc)?)?;
        info!(count = macros.len(), path = %self.path.display(), "macros saved");
        Ok(())
    }

    pub fn add(&self, m: Macro) -> Result<()> {
        let mut all = self.load()?;
        all.push(m);
        self.save(&all)
    }

    /// Remove by id; returns whether anything was deleted.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut all = self.load()?;
        let before = all.len();
        all.retain(|m| m.id != id);
        let changed = all.len() != before;
        if changed {
            self.save(&all)?;
        }
        Ok(changed)
    }
}

/// Smallest free "Recording N" title among the existing macros.
pub fn next_title(existing: &[Macro]) -> String {
    let used: HashSet<u32> = existing
        .iter()
        .filter_map(|m| m.title.strip_prefix("Recording ")?.trim().parse().ok())
        .collect();
    let mut n = 1;
    while used.contains(&n) {
        n += 1;
    }
    format!("Recording {n}")
}
