use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::{SampleVoice, Sound};

pub const MANIFEST_FILE: &str = "kit.json";

/// One sound in a kit manifest
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SoundEntry {
    pub name: String,
    /// WAV path, relative to the kit directory
    pub file: String,
    #[serde(default)]
    pub credit_url: String,
    #[serde(default)]
    pub trigger_offset: f64,
    #[serde(default = "default_color")]
    pub color: String,
    /// Initial volume override for this sound
    #[serde(default)]
    pub volume: Option<f32>,
}

fn default_color() -> String {
    "white".to_string()
}

/// `kit.json`: the ordered list of sounds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KitManifest {
    pub sounds: Vec<SoundEntry>,
}

impl KitManifest {
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: KitManifest =
            serde_json::from_str(json).context("Failed to parse kit manifest")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid kit {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.sounds.is_empty() {
            bail!("Kit has no sounds");
        }
        let mut seen = HashSet::new();
        for entry in &self.sounds {
            if entry.name.trim().is_empty() {
                bail!("Kit sound with empty name ({})", entry.file);
            }
            if !seen.insert(entry.name.as_str()) {
                bail!("Duplicate sound name '{}'", entry.name);
            }
        }
        Ok(())
    }

    /// Per-sound initial volume overrides, in kit order
    pub fn volume_overrides(&self) -> Vec<Option<f32>> {
        self.sounds.iter().map(|s| s.volume).collect()
    }
}

/// Get the global drumgrid directory (~/.drumgrid/)
pub fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".drumgrid")
}

/// Locate a kit directory: explicit path, then ./kit, then ~/.drumgrid/kit
pub fn find_kit_dir(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = explicit {
        return Some(dir.to_path_buf());
    }
    [PathBuf::from("./kit"), home_dir().join("kit")]
        .into_iter()
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
}

/// Decode every sample of a kit at the output sample rate.
/// Returns the sounds in manifest order plus the voices for the audio engine.
pub fn load_kit(
    dir: &Path,
    manifest: &KitManifest,
    sample_rate: f32,
) -> Result<(Vec<Sound>, Vec<Arc<SampleVoice>>)> {
    let mut sounds = Vec::with_capacity(manifest.sounds.len());
    let mut voices = Vec::with_capacity(manifest.sounds.len());

    for entry in &manifest.sounds {
        let path = dir.join(&entry.file);
        let voice = Arc::new(
            SampleVoice::from_wav(&path, sample_rate)
                .with_context(|| format!("Failed to load sound '{}'", entry.name))?,
        );
        log::info!(
            "Loaded sound '{}' ({} frames) from {}",
            entry.name,
            voice.len_frames(),
            path.display()
        );
        sounds.push(
            Sound::new(entry.name.clone(), voice.clone())
                .with_credit(entry.credit_url.clone())
                .with_trigger_offset(entry.trigger_offset)
                .with_color(entry.color.clone()),
        );
        voices.push(voice);
    }

    Ok((sounds, voices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_manifest_with_defaults() {
        let manifest = KitManifest::from_json(
            r#"{"sounds": [
                {"name": "kick", "file": "kick.wav", "trigger_offset": 0.01, "volume": 0.8},
                {"name": "snare", "file": "snare.wav", "credit_url": "https://example.org/snare"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(manifest.sounds.len(), 2);
        assert_eq!(manifest.sounds[1].color, "white");
        assert_eq!(manifest.sounds[1].trigger_offset, 0.0);
        assert_eq!(manifest.volume_overrides(), vec![Some(0.8), None]);
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = KitManifest::from_json(
            r#"{"sounds": [{"name": "hat", "file": "a.wav"}, {"name": "hat", "file": "b.wav"}]}"#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("Duplicate sound name 'hat'"));
    }

    #[test]
    fn rejects_empty_kit() {
        assert!(KitManifest::from_json(r#"{"sounds": []}"#).is_err());
    }

    #[test]
    fn explicit_kit_dir_wins() {
        let dir = PathBuf::from("/some/kit");
        assert_eq!(find_kit_dir(Some(&dir)), Some(dir));
    }
}
