pub mod store;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SequencerError;
use crate::sequencer::{PatternGrid, Tempo};

#[cfg(test)]
pub use store::MemoryStore;
pub use store::{JsonFileStore, KeyValueStore};

/// Key the whole preset list lives under
pub const PRESETS_KEY: &str = "presets";

/// Answer from the caller's confirmation prompt for destructive edits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// What a preset stores and what loading one hands back
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PresetSnapshot {
    pub pattern: PatternGrid,
    pub tempo: Tempo,
    pub volumes: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(flatten)]
    pub snapshot: PresetSnapshot,
}

/// Ordered list of named presets, written through to a key-value store
/// after every change. A change only takes effect once the write succeeds.
pub struct PresetStore {
    presets: Vec<Preset>,
    /// Stored entries that failed to parse, written back untouched
    unreadable: Vec<Value>,
    backend: Box<dyn KeyValueStore>,
}

/// A usable name from a prompt answer, or None if cancelled or blank
fn entered_name(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|n| !n.is_empty())
}

impl PresetStore {
    /// Load the stored list. Entries that do not parse are skipped but kept,
    /// so later writes do not drop them. A stored value that is not a list
    /// at all is an error.
    pub fn open(backend: Box<dyn KeyValueStore>) -> Result<Self> {
        let raw = backend.get(PRESETS_KEY, Value::Array(Vec::new()))?;
        let Value::Array(entries) = raw else {
            bail!("Stored presets are not a list");
        };

        let mut presets = Vec::with_capacity(entries.len());
        let mut unreadable = Vec::new();
        for (i, entry) in entries.into_iter().enumerate() {
            match Preset::deserialize(&entry) {
                Ok(preset) => presets.push(preset),
                Err(e) => {
                    log::warn!("Skipping unreadable preset #{}: {}", i + 1, e);
                    unreadable.push(entry);
                }
            }
        }
        log::info!(
            "Opened preset store with {} presets ({} unreadable)",
            presets.len(),
            unreadable.len()
        );
        Ok(Self {
            presets,
            unreadable,
            backend,
        })
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Preset> {
        self.presets.get(idx)
    }

    /// Name offered when prompting for a new preset
    pub fn default_name(&self) -> String {
        format!("Untitled {}", self.presets.len() + 1)
    }

    fn check(&self, idx: usize) -> Result<()> {
        if idx < self.presets.len() {
            Ok(())
        } else {
            Err(SequencerError::PresetNotFound(idx).into())
        }
    }

    /// Write `presets` (plus any unreadable entries) and adopt it as the
    /// current list. On failure nothing changes.
    fn commit(&mut self, presets: Vec<Preset>) -> Result<()> {
        let mut entries = Vec::with_capacity(presets.len() + self.unreadable.len());
        for preset in &presets {
            entries.push(serde_json::to_value(preset).context("Failed to serialize presets")?);
        }
        entries.extend(self.unreadable.iter().cloned());
        self.backend.set(PRESETS_KEY, Value::Array(entries))?;
        self.presets = presets;
        Ok(())
    }

    /// Append a preset. A cancelled or blank name saves nothing.
    pub fn save_new(&mut self, name: Option<&str>, snapshot: PresetSnapshot) -> Result<Option<usize>> {
        let Some(name) = entered_name(name) else {
            return Ok(None);
        };
        let mut presets = self.presets.clone();
        presets.push(Preset {
            name: name.to_string(),
            snapshot,
        });
        self.commit(presets)?;
        log::info!("Saved preset '{}'", name);
        Ok(Some(self.presets.len() - 1))
    }

    /// Replace a preset's contents, keeping its name
    pub fn overwrite(
        &mut self,
        idx: usize,
        snapshot: PresetSnapshot,
        confirm: Confirmation,
    ) -> Result<bool> {
        self.check(idx)?;
        if confirm == Confirmation::Declined {
            return Ok(false);
        }
        let mut presets = self.presets.clone();
        presets[idx].snapshot = snapshot;
        self.commit(presets)?;
        log::info!("Overwrote preset '{}'", self.presets[idx].name);
        Ok(true)
    }

    pub fn rename(&mut self, idx: usize, name: Option<&str>) -> Result<bool> {
        self.check(idx)?;
        let Some(name) = entered_name(name) else {
            return Ok(false);
        };
        let mut presets = self.presets.clone();
        presets[idx].name = name.to_string();
        self.commit(presets)?;
        Ok(true)
    }

    pub fn delete(&mut self, idx: usize, confirm: Confirmation) -> Result<bool> {
        self.check(idx)?;
        if confirm == Confirmation::Declined {
            return Ok(false);
        }
        let mut presets = self.presets.clone();
        let removed = presets.remove(idx);
        self.commit(presets)?;
        log::info!("Deleted preset '{}'", removed.name);
        Ok(true)
    }

    /// Copy of a preset's contents for the sequencer to apply
    pub fn load(&self, idx: usize) -> Result<PresetSnapshot> {
        self.check(idx)?;
        Ok(self.presets[idx].snapshot.clone())
    }
}
