use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;

use crate::command::Command;
use crate::error::SequencerError;
use crate::preset::PresetSnapshot;
use crate::sound::Sound;

use super::clock::{Tempo, TickFrame, TransportState};
use super::mixer::MixState;
use super::pattern::{PatternGrid, DEFAULT_STEPS};

/// Startup settings for the sequencer
#[derive(Clone, Debug)]
pub struct SequencerConfig {
    pub steps: usize,
    pub tempo: Tempo,
    /// Starting volume per sound in kit order (None = default)
    pub initial_volumes: Vec<Option<f32>>,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            tempo: Tempo::default(),
            initial_volumes: Vec::new(),
        }
    }
}

/// Shared state between the timer thread and the UI
#[derive(Clone, Debug)]
pub struct SequencerState {
    pub transport: TransportState,
    pub tempo: Tempo,
    pub pattern: PatternGrid,
    pub mix: MixState,
}

impl SequencerState {
    pub fn new(sounds: &[Sound], config: &SequencerConfig) -> Self {
        Self {
            transport: TransportState::new(config.steps),
            tempo: config.tempo,
            pattern: PatternGrid::new(sounds, config.steps),
            mix: MixState::new(sounds.len(), &config.initial_volumes),
        }
    }

    /// Claim the column to play and advance the playhead, together with
    /// the mutes it will be played with. Callers hold the write lock for
    /// the whole call so readers see either none or all of the update.
    pub fn begin_tick(&mut self) -> Option<TickFrame> {
        self.transport.advance(self.mix.mutes())
    }
}

enum TimerMsg {
    /// Tempo changed, recompute the next deadline
    Retime,
    Stop,
}

struct Timer {
    control: Sender<TimerMsg>,
    thread: JoinHandle<()>,
}

/// Owns the sequencer state and the repeating trigger that plays it
pub struct Sequencer {
    state: Arc<RwLock<SequencerState>>,
    sounds: Arc<[Sound]>,
    steps: usize,
    timer: Option<Timer>,
}

impl Sequencer {
    pub fn new(sounds: Vec<Sound>, config: SequencerConfig) -> Self {
        let state = SequencerState::new(&sounds, &config);
        for sound in &sounds {
            sound.handle.preload();
        }
        state.mix.apply_volumes(&sounds);
        log::info!(
            "Sequencer ready: {} sounds, {} steps, {} BPM",
            sounds.len(),
            config.steps,
            config.tempo.bpm()
        );
        Self {
            state: Arc::new(RwLock::new(state)),
            sounds: sounds.into(),
            steps: config.steps.max(1),
            timer: None,
        }
    }

    /// Shared state handle, for readers such as the renderer
    pub fn state(&self) -> Arc<RwLock<SequencerState>> {
        Arc::clone(&self.state)
    }

    /// Consistent copy of the current state
    pub fn snapshot(&self) -> SequencerState {
        self.state.read().clone()
    }

    pub fn sounds(&self) -> &[Sound] {
        &self.sounds
    }

    pub fn is_playing(&self) -> bool {
        self.state.read().transport.is_playing()
    }

    /// Start from step 0. No-op while already playing.
    pub fn play(&mut self) {
        if !self.state.write().transport.start() {
            return;
        }
        self.cancel_timer();
        self.timer = Some(self.spawn_timer());
        log::info!("Playback started");
    }

    /// Stop and freeze the playhead where it is
    pub fn stop(&mut self) {
        let was_playing = self.state.write().transport.stop();
        self.cancel_timer();
        if was_playing {
            log::info!("Playback stopped");
        }
    }

    /// Returns true if now playing
    pub fn toggle_play(&mut self) -> bool {
        if self.is_playing() {
            self.stop();
            false
        } else {
            self.play();
            true
        }
    }

    /// Stop, rewind to step 0 and clear the grid
    pub fn reset(&mut self) {
        {
            let mut state = self.state.write();
            state.transport.reset();
            state.pattern = PatternGrid::reset(&self.sounds, self.steps);
        }
        self.cancel_timer();
    }

    pub fn set_tempo(&mut self, tempo: Tempo) {
        self.state.write().tempo = tempo;
        self.retime();
    }

    fn retime(&self) {
        if let Some(timer) = &self.timer {
            log::debug!("Retiming step clock");
            let _ = timer.control.send(TimerMsg::Retime);
        }
    }

    fn apply_volumes(&self) {
        self.state.read().mix.apply_volumes(&self.sounds);
    }

    /// Grid, tempo and volumes as a preset would store them
    pub fn preset_snapshot(&self) -> PresetSnapshot {
        let state = self.state.read();
        PresetSnapshot {
            pattern: state.pattern.clone(),
            tempo: state.tempo,
            volumes: state.mix.volumes().to_vec(),
        }
    }

    /// Replace grid, tempo and volumes with a preset's. Mutes and the
    /// transport are left alone.
    pub fn load_preset(&mut self, snapshot: PresetSnapshot) {
        {
            let mut state = self.state.write();
            state.pattern = PatternGrid::conform(snapshot.pattern, &self.sounds, self.steps);
            state.tempo = snapshot.tempo;
            state.mix.replace_volumes(&snapshot.volumes);
        }
        self.apply_volumes();
        self.retime();
    }

    /// Apply one user action
    pub fn dispatch(&mut self, cmd: Command) -> Result<(), SequencerError> {
        log::debug!("Dispatch: {}", cmd.description());
        match cmd {
            Command::TogglePlay => {
                self.toggle_play();
            }
            Command::Play => self.play(),
            Command::Stop => self.stop(),
            Command::SetTempo(tempo) => self.set_tempo(tempo),
            Command::ToggleStep { sound, step } => {
                self.state.write().pattern.toggle(&sound, step)?;
            }
            Command::FillPattern {
                sound,
                divisor,
                offset,
            } => {
                self.state
                    .write()
                    .pattern
                    .fill_pattern(&sound, divisor, offset)?;
            }
            Command::ClearRow(sound) => {
                self.state.write().pattern.clear_row(&sound)?;
            }
            Command::Reset => self.reset(),
            Command::SetVolume { track, volume } => {
                self.state.write().mix.set_volume(track, volume)?;
                self.apply_volumes();
            }
            Command::NudgeVolume { track, delta } => {
                self.state.write().mix.nudge_volume(track, delta)?;
                self.apply_volumes();
            }
            Command::ResetVolume(track) => {
                self.state.write().mix.reset_volume(track)?;
                self.apply_volumes();
            }
            Command::ToggleMute(track) => {
                self.state.write().mix.toggle_mute(track)?;
            }
            Command::LoadPreset(snapshot) => self.load_preset(*snapshot),
        }
        Ok(())
    }

    fn spawn_timer(&self) -> Timer {
        let (control, rx) = unbounded();
        let state = Arc::clone(&self.state);
        let sounds = Arc::clone(&self.sounds);
        let thread = thread::spawn(move || run_timer(&state, &sounds, &rx));
        Timer { control, thread }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            let _ = timer.control.send(TimerMsg::Stop);
            if timer.thread.join().is_err() {
                log::warn!("Timer thread panicked");
            }
        }
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// Timer loop: fires a tick at every deadline until stopped. The first
/// tick fires immediately so step 0 sounds on play.
fn run_timer(state: &RwLock<SequencerState>, sounds: &[Sound], control: &Receiver<TimerMsg>) {
    let mut last_tick = Instant::now();
    let mut deadline = last_tick;

    loop {
        match control.recv_deadline(deadline) {
            Ok(TimerMsg::Retime) => {
                deadline = last_tick + state.read().tempo.step_period();
            }
            Ok(TimerMsg::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if tick(state, sounds).is_none() {
                    break;
                }
                last_tick = deadline;
                deadline += state.read().tempo.step_period();
                // Fell behind (e.g. a long stall): resync instead of bursting
                let now = Instant::now();
                if deadline < now {
                    last_tick = now;
                    deadline = now;
                }
            }
        }
    }
}

/// One timer firing: advance the playhead, then play the claimed column
/// against the latest grid. None once the transport has stopped.
pub fn tick(state: &RwLock<SequencerState>, sounds: &[Sound]) -> Option<TickFrame> {
    let frame = state.write().begin_tick()?;
    let state = state.read();
    trigger_step(&frame, &state.pattern, sounds);
    Some(frame)
}

/// Rewind every sound, then start the ones whose cell is on and which were
/// unmuted when the frame was taken. Returns how many sounds fired.
pub fn trigger_step(frame: &TickFrame, pattern: &PatternGrid, sounds: &[Sound]) -> usize {
    for sound in sounds {
        sound.rewind();
    }

    let mut fired = 0;
    for (i, sound) in sounds.iter().enumerate() {
        let muted = frame.mutes.get(i).copied().unwrap_or(false);
        if !muted && pattern.is_active(&sound.name, frame.step) {
            sound.trigger();
            fired += 1;
        }
    }
    fired
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sound::testing::{Call, RecordingHandle};

    fn kit() -> (Vec<Sound>, Vec<Arc<RecordingHandle>>) {
        let handles: Vec<Arc<RecordingHandle>> =
            (0..3).map(|_| Arc::new(RecordingHandle::default())).collect();
        let sounds = ["kick", "snare", "hat"]
            .iter()
            .zip(&handles)
            .map(|(name, h)| Sound::new(*name, h.clone()).with_trigger_offset(0.01))
            .collect();
        (sounds, handles)
    }

    fn sequencer(tempo: u32) -> (Sequencer, Vec<Arc<RecordingHandle>>) {
        let (sounds, handles) = kit();
        let config = SequencerConfig {
            tempo: Tempo::new(tempo),
            ..Default::default()
        };
        (Sequencer::new(sounds, config), handles)
    }

    #[test]
    fn new_sequencer_applies_initial_volumes() {
        let (sounds, handles) = kit();
        let config = SequencerConfig {
            initial_volumes: vec![Some(0.9)],
            ..Default::default()
        };
        let seq = Sequencer::new(sounds, config);
        assert_eq!(handles[0].last_volume(), Some(0.9));
        assert_eq!(handles[1].last_volume(), Some(0.5));
        assert!(!seq.is_playing());
        assert_eq!(seq.snapshot().pattern.rows().count(), 3);
    }

    #[test]
    fn ticks_advance_step_modulo_width() {
        let (sounds, _) = kit();
        let state = RwLock::new(SequencerState::new(&sounds, &SequencerConfig::default()));
        state.write().transport.start();

        for _ in 0..21 {
            tick(&state, &sounds).unwrap();
        }
        assert_eq!(state.read().transport.current_step(), 21 % 16);
        assert_eq!(state.read().transport.playhead(), Some(4));

        state.write().transport.stop();
        assert!(tick(&state, &sounds).is_none());
        assert_eq!(state.read().transport.current_step(), 5);

        state.write().transport.start();
        assert_eq!(state.read().transport.current_step(), 0);
    }

    #[test]
    fn tick_plays_active_unmuted_cells() {
        let (sounds, handles) = kit();
        let state = RwLock::new(SequencerState::new(&sounds, &SequencerConfig::default()));
        {
            let mut s = state.write();
            s.transport.start();
            s.pattern.toggle("kick", 0).unwrap();
            s.pattern.toggle("snare", 0).unwrap();
            s.mix.toggle_mute(1).unwrap();
        }
        let frame = tick(&state, &sounds).unwrap();
        assert_eq!(frame.step, 0);
        assert_eq!(handles[0].play_count(), 1);
        assert_eq!(handles[1].play_count(), 0);
        assert_eq!(handles[2].play_count(), 0);
    }

    #[test]
    fn every_sound_is_rewound_before_retrigger() {
        let (sounds, handles) = kit();
        let mut pattern = PatternGrid::new(&sounds, 16);
        pattern.toggle("kick", 3).unwrap();
        for h in &handles {
            h.clear();
        }

        let frame = TickFrame {
            step: 3,
            mutes: vec![false; 3],
        };
        assert_eq!(trigger_step(&frame, &pattern, &sounds), 1);
        assert_eq!(
            handles[0].calls(),
            vec![Call::Pause, Call::Seek(0.01), Call::Seek(0.01), Call::Play]
        );
        assert_eq!(handles[2].calls(), vec![Call::Pause, Call::Seek(0.01)]);
    }

    #[test]
    fn mute_change_after_snapshot_does_not_affect_the_tick() {
        let (sounds, handles) = kit();
        let state = RwLock::new(SequencerState::new(&sounds, &SequencerConfig::default()));
        {
            let mut s = state.write();
            s.transport.start();
            s.pattern.toggle("kick", 0).unwrap();
            s.pattern.toggle("hat", 0).unwrap();
            s.mix.toggle_mute(2).unwrap();
        }

        let frame = state.write().begin_tick().unwrap();
        // Another actor flips both mutes between snapshot and decision
        {
            let mut s = state.write();
            s.mix.toggle_mute(0).unwrap();
            s.mix.toggle_mute(2).unwrap();
        }
        trigger_step(&frame, &state.read().pattern, &sounds);

        assert_eq!(handles[0].play_count(), 1);
        assert_eq!(handles[2].play_count(), 0);
        assert_eq!(state.read().transport.mute_snapshot(), &[false, false, true]);
    }

    #[test]
    fn stale_rows_are_skipped() {
        let (mut seq, handles) = sequencer(120);
        let mut pattern = PatternGrid::from_names(["clap", "kick"], 16);
        pattern.toggle("clap", 0).unwrap();
        pattern.toggle("kick", 0).unwrap();
        seq.load_preset(PresetSnapshot {
            pattern,
            tempo: Tempo::new(100),
            volumes: vec![0.3, 0.4, 0.6],
        });

        let state = seq.state();
        state.write().transport.start();
        let frame = tick(&state, seq.sounds()).unwrap();
        assert_eq!(frame.step, 0);
        assert_eq!(handles[0].play_count(), 1);
        assert!(state.read().pattern.row("snare").is_some());
        assert!(state.read().pattern.row("clap").is_some());
    }

    #[test]
    fn load_preset_replaces_grid_tempo_volumes_but_not_mutes() {
        let (mut seq, handles) = sequencer(120);
        seq.dispatch(Command::ToggleMute(1)).unwrap();
        let mut snapshot = seq.preset_snapshot();
        snapshot.pattern.fill_pattern("hat", 2, 0).unwrap();
        snapshot.tempo = Tempo::new(90);
        snapshot.volumes = vec![0.1, 0.2, 0.3];

        seq.load_preset(snapshot.clone());
        let state = seq.snapshot();
        assert_eq!(state.pattern, snapshot.pattern);
        assert_eq!(state.tempo.bpm(), 90);
        assert_eq!(state.mix.volumes(), &[0.1, 0.2, 0.3]);
        assert!(state.mix.is_muted(1));
        assert_eq!(handles[2].last_volume(), Some(0.3));
        assert_eq!(seq.preset_snapshot(), snapshot);
    }

    #[test]
    fn dispatch_errors_leave_state_unchanged() {
        let (mut seq, _) = sequencer(120);
        let before = seq.preset_snapshot();
        let err = seq
            .dispatch(Command::ToggleStep {
                sound: "cowbell".into(),
                step: 0,
            })
            .unwrap_err();
        assert!(err.is_invalid_index());
        assert!(seq
            .dispatch(Command::FillPattern {
                sound: "kick".into(),
                divisor: 0,
                offset: 0,
            })
            .is_err());
        assert!(seq.dispatch(Command::SetVolume { track: 9, volume: 0.5 }).is_err());
        assert_eq!(seq.preset_snapshot(), before);
    }

    #[test]
    fn volume_commands_reach_the_handles() {
        let (mut seq, handles) = sequencer(120);
        seq.dispatch(Command::SetVolume { track: 1, volume: 1.4 }).unwrap();
        assert_eq!(handles[1].last_volume(), Some(1.0));
        seq.dispatch(Command::NudgeVolume { track: 1, delta: -0.25 }).unwrap();
        assert_eq!(handles[1].last_volume(), Some(0.75));
        seq.dispatch(Command::ResetVolume(1)).unwrap();
        assert_eq!(handles[1].last_volume(), Some(0.5));
    }

    #[test]
    fn reset_stops_rewinds_and_clears() {
        let (mut seq, _) = sequencer(300);
        seq.dispatch(Command::FillPattern {
            sound: "kick".into(),
            divisor: 1,
            offset: 0,
        })
        .unwrap();
        seq.play();
        seq.dispatch(Command::Reset).unwrap();

        let state = seq.snapshot();
        assert!(!state.transport.is_playing());
        assert_eq!(state.transport.current_step(), 0);
        assert!(!state.pattern.has_content());
    }

    #[test]
    fn timer_plays_and_stop_freezes_playhead() {
        let (mut seq, handles) = sequencer(300);
        seq.dispatch(Command::FillPattern {
            sound: "kick".into(),
            divisor: 1,
            offset: 0,
        })
        .unwrap();

        assert!(seq.toggle_play());
        thread::sleep(Duration::from_millis(350));
        assert!(!seq.toggle_play());

        assert!(handles[0].play_count() >= 2);
        let frozen = seq.snapshot().transport.current_step();
        assert!(frozen >= 2);
        thread::sleep(Duration::from_millis(150));
        assert_eq!(seq.snapshot().transport.current_step(), frozen);

        seq.play();
        assert!(seq.snapshot().transport.current_step() <= 1);
        seq.stop();
    }

    #[test]
    fn tempo_change_while_playing_is_picked_up() {
        let (mut seq, _) = sequencer(1);
        seq.play();
        // First tick fires at once, the next would be 30s away at 1 BPM
        thread::sleep(Duration::from_millis(50));
        assert_eq!(seq.snapshot().transport.current_step(), 1);

        seq.dispatch(Command::SetTempo(Tempo::new(300))).unwrap();
        thread::sleep(Duration::from_millis(350));
        assert!(seq.snapshot().transport.current_step() >= 3);
        seq.stop();
    }

    #[test]
    fn play_while_playing_keeps_position() {
        let (mut seq, _) = sequencer(1);
        seq.play();
        thread::sleep(Duration::from_millis(50));
        seq.play();
        assert_eq!(seq.snapshot().transport.current_step(), 1);
        seq.stop();
    }
}
