use crate::preset::PresetSnapshot;
use crate::sequencer::Tempo;

/// Every user action the sequencer understands
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Transport
    TogglePlay,
    Play,
    Stop,
    SetTempo(Tempo),

    // Pattern
    ToggleStep { sound: String, step: usize },
    FillPattern { sound: String, divisor: usize, offset: usize },
    ClearRow(String),
    /// Stop playback, rewind, and clear the whole grid
    Reset,

    // Mixer
    SetVolume { track: usize, volume: f32 },
    NudgeVolume { track: usize, delta: f32 },
    ResetVolume(usize),
    ToggleMute(usize),

    // Presets
    LoadPreset(Box<PresetSnapshot>),
}

impl Command {
    /// Returns true if this command should be logged to event log
    pub fn is_loggable(&self) -> bool {
        !matches!(self, Command::NudgeVolume { .. })
    }

    /// Human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            Command::TogglePlay => "Play/Pause".to_string(),
            Command::Play => "Play".to_string(),
            Command::Stop => "Stop".to_string(),
            Command::SetTempo(tempo) => format!("Set tempo to {} BPM", tempo.bpm()),
            Command::ToggleStep { sound, step } => {
                format!("Toggle {} step {}", sound, step + 1)
            }
            Command::FillPattern {
                sound,
                divisor,
                offset,
            } => {
                format!("Fill {} every {} from {}", sound, divisor, offset + 1)
            }
            Command::ClearRow(sound) => format!("Clear {}", sound),
            Command::Reset => "Reset".to_string(),
            Command::SetVolume { track, volume } => {
                format!("Set track {} volume to {:.2}", track + 1, volume)
            }
            Command::NudgeVolume { track, delta } => {
                format!("Nudge track {} volume by {:+.2}", track + 1, delta)
            }
            Command::ResetVolume(track) => format!("Reset track {} volume", track + 1),
            Command::ToggleMute(track) => format!("Toggle mute track {}", track + 1),
            Command::LoadPreset(snapshot) => {
                format!("Load preset ({} BPM)", snapshot.tempo.bpm())
            }
        }
    }
}
