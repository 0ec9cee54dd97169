mod app;
mod audio;
mod command;
mod error;
mod event;
mod preset;
mod sequencer;
mod sound;
mod ui;

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use app::App;
use audio::AudioOutput;
use preset::{JsonFileStore, PresetStore};
use sequencer::{Sequencer, SequencerConfig, Tempo, DEFAULT_STEPS, DEFAULT_VOLUME};
use sound::{find_kit_dir, load_kit, KitManifest};
use ui::{Theme, ThemeName};

/// Sample rate used to decode the kit when no output device is available
const FALLBACK_SAMPLE_RATE: f32 = 44_100.0;

/// Drumgrid - terminal step-sequencer drum machine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Kit directory containing kit.json (default: ./kit, then ~/.drumgrid/kit)
    #[arg(long)]
    kit: Option<PathBuf>,

    /// Preset store file (default: ~/.drumgrid/store.json)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Starting tempo in BPM (1-300)
    #[arg(long, default_value_t = 120)]
    bpm: u32,

    /// Steps per pattern
    #[arg(long, default_value_t = DEFAULT_STEPS)]
    steps: usize,

    /// Starting volume for sounds without one in kit.json
    #[arg(long)]
    volume: Option<f32>,

    /// Theme to use for the interface
    #[arg(long, value_enum, default_value_t = ThemeName::Default)]
    theme: ThemeName,

    /// List available themes and exit
    #[arg(long)]
    list_themes: bool,

    /// Log filter for ~/.drumgrid/drumgrid.log (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) -> Result<()> {
    let dir = sound::home_dir();
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join("drumgrid.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    env_logger::Builder::new()
        .parse_filters(level)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_themes {
        println!("Available themes:");
        for name in ThemeName::value_variants() {
            if let Some(value) = name.to_possible_value() {
                println!("  {}", value.get_name());
            }
        }
        return Ok(());
    }

    init_logging(&args.log_level)?;
    log::info!("drumgrid {} starting", env!("CARGO_PKG_VERSION"));

    let kit_dir = find_kit_dir(args.kit.as_deref()).context(
        "No kit found. Put a kit.json and its WAV files in ./kit or ~/.drumgrid/kit, or pass --kit <dir>",
    )?;
    let manifest = KitManifest::read(&kit_dir)?;

    // A missing device leaves the sequencer running silently
    let output = match AudioOutput::open_default() {
        Ok(output) => Some(output),
        Err(e) => {
            log::warn!("Audio disabled: {:#}", e);
            None
        }
    };
    let sample_rate = output
        .as_ref()
        .map_or(FALLBACK_SAMPLE_RATE, AudioOutput::sample_rate);
    let (sounds, voices) = load_kit(&kit_dir, &manifest, sample_rate)?;
    let audio = match output {
        Some(output) => Some(output.start(voices)?),
        None => None,
    };

    let fallback_volume = args.volume.unwrap_or(DEFAULT_VOLUME);
    let config = SequencerConfig {
        steps: args.steps.max(1),
        tempo: Tempo::new(args.bpm),
        initial_volumes: manifest
            .volume_overrides()
            .into_iter()
            .map(|v| Some(v.unwrap_or(fallback_volume)))
            .collect(),
    };
    let sequencer = Sequencer::new(sounds, config);

    let store_path = args
        .store
        .unwrap_or_else(|| sound::home_dir().join("store.json"));
    let presets = PresetStore::open(Box::new(JsonFileStore::open(&store_path)?))
        .with_context(|| format!("Unreadable preset store {}", store_path.display()))?;
    log::info!(
        "{} presets loaded from {}",
        presets.len(),
        store_path.display()
    );

    let mut app = App::new(Theme::from(args.theme), sequencer, presets, audio);
    app.run()
}
