use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;

use crate::audio::AudioEngine;
use crate::command::Command;
use crate::error::SequencerError;
use crate::event::EventLog;
use crate::preset::PresetStore;
use crate::sequencer::{Sequencer, Tempo, FILL_PRESETS};
use crate::ui::{
    help_line_count, render_grid, render_help, render_presets, render_prompt, render_transport,
    GridState, PresetListState, Prompt, PromptReply, Theme,
};

const VOLUME_STEP: f32 = 0.05;
const STATUS_SECS: u64 = 3;

/// Which panel receives keys
#[derive(Clone, Copy, PartialEq, Eq)]
enum Focus {
    Grid,
    Presets,
}

/// What to do with the answer of an open prompt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PromptAction {
    NewPreset,
    RenamePreset(usize),
    Overwrite(usize),
    Delete(usize),
    Tempo,
}

/// Application state
pub struct App {
    theme: Theme,
    sequencer: Sequencer,
    presets: PresetStore,
    /// Recent actions, the latest one is shown in the footer
    event_log: EventLog,
    grid_state: GridState,
    preset_list: PresetListState,
    focus: Focus,
    prompt: Option<(PromptAction, Prompt)>,
    /// Help overlay scroll position, None when hidden
    help_scroll: Option<usize>,
    should_quit: bool,
    status_message: Option<(String, Instant)>,
    _audio: Option<AudioEngine>,
}

impl App {
    pub fn new(
        theme: Theme,
        sequencer: Sequencer,
        presets: PresetStore,
        audio: Option<AudioEngine>,
    ) -> Self {
        Self {
            theme,
            sequencer,
            presets,
            event_log: EventLog::new(),
            grid_state: GridState::new(),
            preset_list: PresetListState::new(),
            focus: Focus::Grid,
            prompt: None,
            help_scroll: None,
            should_quit: false,
            status_message: None,
            _audio: audio,
        }
    }

    /// Run the main application loop
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = Self::setup_terminal()?;
        let result = self.main_loop(&mut terminal);
        self.sequencer.stop();
        Self::restore_terminal(&mut terminal)?;
        result
    }

    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(terminal)
    }

    fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|frame| self.render(frame))?;

            // Poll for events with timeout for responsive UI (~60fps)
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    /// Log and apply a command; failures become a status message
    fn dispatch(&mut self, cmd: Command) {
        self.event_log.log(&cmd);
        if let Err(e) = self.sequencer.dispatch(cmd) {
            self.report_error(&e);
        }
    }

    fn report_error(&mut self, e: &SequencerError) {
        if e.is_invalid_index() {
            log::debug!("Ignored: {}", e);
        } else {
            log::warn!("{}", e);
        }
        self.set_status(e.to_string());
    }

    fn report_failure(&mut self, what: &str, e: &anyhow::Error) {
        log::warn!("{}: {:#}", what, e);
        self.set_status(format!("{}: {:#}", what, e));
    }

    fn set_status(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    fn num_tracks(&self) -> usize {
        self.sequencer.sounds().len()
    }

    fn num_steps(&self) -> usize {
        self.sequencer.state().read().pattern.width()
    }

    fn cursor_sound(&self) -> Option<String> {
        self.sequencer
            .sounds()
            .get(self.grid_state.cursor_track)
            .map(|s| s.name.clone())
    }

    fn tempo(&self) -> Tempo {
        self.sequencer.state().read().tempo
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if let Some((action, mut prompt)) = self.prompt.take() {
            match prompt.handle_key(key.code) {
                PromptReply::Pending => self.prompt = Some((action, prompt)),
                reply => self.finish_prompt(action, reply),
            }
            return;
        }

        if let Some(scroll) = self.help_scroll {
            self.help_scroll = match key.code {
                KeyCode::Up | KeyCode::Char('k') => Some(scroll.saturating_sub(1)),
                KeyCode::Down | KeyCode::Char('j') => {
                    Some((scroll + 1).min(help_line_count().saturating_sub(1)))
                }
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    None
                }
                _ => None,
            };
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Char(' ') => self.dispatch(Command::TogglePlay),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Grid => Focus::Presets,
                    Focus::Presets => Focus::Grid,
                };
            }
            KeyCode::Char('?') => self.help_scroll = Some(0),
            KeyCode::Char('q') => self.should_quit = true,
            code => match self.focus {
                Focus::Grid => self.handle_grid_key(code),
                Focus::Presets => self.handle_presets_key(code),
            },
        }
    }

    fn handle_grid_key(&mut self, key: KeyCode) {
        let tracks = self.num_tracks();
        let steps = self.num_steps();
        let track = self.grid_state.cursor_track;

        match key {
            KeyCode::Left | KeyCode::Char('h') => self.grid_state.move_cursor(-1, 0, tracks, steps),
            KeyCode::Right | KeyCode::Char('l') => self.grid_state.move_cursor(1, 0, tracks, steps),
            KeyCode::Up | KeyCode::Char('k') => self.grid_state.move_cursor(0, -1, tracks, steps),
            KeyCode::Down | KeyCode::Char('j') => self.grid_state.move_cursor(0, 1, tracks, steps),

            KeyCode::Enter => {
                if let Some(sound) = self.cursor_sound() {
                    let step = self.grid_state.cursor_step;
                    self.dispatch(Command::ToggleStep { sound, step });
                }
            }
            KeyCode::Char(c) if fill_for_key(c).is_some() => {
                if let (Some(sound), Some((divisor, offset))) = (self.cursor_sound(), fill_for_key(c)) {
                    self.dispatch(Command::FillPattern {
                        sound,
                        divisor,
                        offset,
                    });
                }
            }
            KeyCode::Char('c') => {
                if let Some(sound) = self.cursor_sound() {
                    self.dispatch(Command::ClearRow(sound));
                }
            }
            KeyCode::Char('x') => self.dispatch(Command::Reset),

            // Mixer
            KeyCode::Char('m') => self.dispatch(Command::ToggleMute(track)),
            KeyCode::Char('[') => self.dispatch(Command::NudgeVolume {
                track,
                delta: -VOLUME_STEP,
            }),
            KeyCode::Char(']') => self.dispatch(Command::NudgeVolume {
                track,
                delta: VOLUME_STEP,
            }),
            KeyCode::Char('0') => self.dispatch(Command::ResetVolume(track)),

            // Tempo
            KeyCode::Char(',') => self.nudge_tempo(-1),
            KeyCode::Char('.') => self.nudge_tempo(1),
            KeyCode::Char('<') => self.nudge_tempo(-10),
            KeyCode::Char('>') => self.nudge_tempo(10),
            KeyCode::Char('t') => {
                let current = self.tempo().bpm().to_string();
                self.prompt = Some((PromptAction::Tempo, Prompt::text("Tempo (1-300 BPM)", &current)));
            }

            _ => {}
        }
    }

    fn nudge_tempo(&mut self, delta: i32) {
        let tempo = self.tempo().offset(delta);
        self.dispatch(Command::SetTempo(tempo));
    }

    fn handle_presets_key(&mut self, key: KeyCode) {
        let len = self.presets.len();
        let selected = self.preset_list.selected;
        let selected_name = self.presets.get(selected).map(|p| p.name.clone());

        match key {
            KeyCode::Up | KeyCode::Char('k') => self.preset_list.move_selection(-1, len),
            KeyCode::Down | KeyCode::Char('j') => self.preset_list.move_selection(1, len),
            KeyCode::Esc => self.focus = Focus::Grid,

            KeyCode::Enter | KeyCode::Char('l') if self.presets.is_empty() => {
                self.set_status("No presets yet, press n to save one".to_string());
            }
            KeyCode::Enter | KeyCode::Char('l') => self.load_preset(selected),
            KeyCode::Char('n') => {
                let default = self.presets.default_name();
                self.prompt = Some((PromptAction::NewPreset, Prompt::text("Save preset as", &default)));
            }
            KeyCode::Char('w') => {
                if let Some(name) = selected_name {
                    self.prompt = Some((
                        PromptAction::Overwrite(selected),
                        Prompt::confirm(format!("Overwrite '{}'?", name)),
                    ));
                }
            }
            KeyCode::Char('r') => {
                if let Some(name) = selected_name {
                    self.prompt = Some((
                        PromptAction::RenamePreset(selected),
                        Prompt::text("Rename preset", &name),
                    ));
                }
            }
            KeyCode::Char('d') => {
                if let Some(name) = selected_name {
                    self.prompt = Some((
                        PromptAction::Delete(selected),
                        Prompt::confirm(format!("Delete '{}'?", name)),
                    ));
                }
            }
            _ => {}
        }
    }

    fn load_preset(&mut self, idx: usize) {
        match self.presets.load(idx) {
            Ok(snapshot) => {
                self.dispatch(Command::LoadPreset(Box::new(snapshot)));
                self.preset_list.current = Some(idx);
                if let Some(preset) = self.presets.get(idx) {
                    self.set_status(format!("Loaded '{}'", preset.name));
                }
            }
            Err(e) => self.report_failure("Load failed", &e),
        }
    }

    fn finish_prompt(&mut self, action: PromptAction, reply: PromptReply) {
        match (action, reply) {
            (PromptAction::NewPreset, PromptReply::Text(name)) => {
                let snapshot = self.sequencer.preset_snapshot();
                match self.presets.save_new(name.as_deref(), snapshot) {
                    Ok(Some(idx)) => {
                        self.preset_list.current = Some(idx);
                        self.preset_list.selected = idx;
                        self.note_preset_action("Saved", idx);
                    }
                    Ok(None) => self.set_status("Save cancelled".to_string()),
                    Err(e) => self.report_failure("Save failed", &e),
                }
            }
            (PromptAction::RenamePreset(idx), PromptReply::Text(name)) => {
                match self.presets.rename(idx, name.as_deref()) {
                    Ok(true) => self.note_preset_action("Renamed to", idx),
                    Ok(false) => self.set_status("Rename cancelled".to_string()),
                    Err(e) => self.report_failure("Rename failed", &e),
                }
            }
            (PromptAction::Overwrite(idx), PromptReply::Confirm(answer)) => {
                let snapshot = self.sequencer.preset_snapshot();
                match self.presets.overwrite(idx, snapshot, answer) {
                    Ok(true) => {
                        self.preset_list.current = Some(idx);
                        self.note_preset_action("Overwrote", idx);
                    }
                    Ok(false) => {}
                    Err(e) => self.report_failure("Overwrite failed", &e),
                }
            }
            (PromptAction::Delete(idx), PromptReply::Confirm(answer)) => {
                let name = self.presets.get(idx).map(|p| p.name.clone());
                match self.presets.delete(idx, answer) {
                    Ok(true) => {
                        self.preset_list.on_deleted(idx, self.presets.len());
                        let msg = format!("Deleted '{}'", name.unwrap_or_default());
                        self.event_log.record(msg.clone());
                        self.set_status(msg);
                    }
                    Ok(false) => {}
                    Err(e) => self.report_failure("Delete failed", &e),
                }
            }
            (PromptAction::Tempo, PromptReply::Text(Some(text))) => match Tempo::parse(&text) {
                Ok(tempo) => self.dispatch(Command::SetTempo(tempo)),
                Err(e) => self.report_error(&e),
            },
            _ => {}
        }
    }

    fn note_preset_action(&mut self, verb: &str, idx: usize) {
        if let Some(preset) = self.presets.get(idx) {
            let msg = format!("{} '{}'", verb, preset.name);
            self.event_log.record(msg.clone());
            self.set_status(msg);
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let bg_block = Block::default().style(Style::default().bg(self.theme.bg));
        frame.render_widget(bg_block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Transport
                Constraint::Min(6),    // Grid + presets
                Constraint::Length(3), // Footer
            ])
            .split(area);
        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(40), Constraint::Length(30)])
            .split(chunks[1]);

        // One copy so every panel shows the same instant
        let state = self.sequencer.snapshot();
        let preset_name = self
            .preset_list
            .current
            .and_then(|i| self.presets.get(i))
            .map(|p| p.name.as_str());

        render_transport(frame, chunks[0], &state, preset_name, &self.theme);
        render_grid(
            frame,
            main[0],
            &state,
            self.sequencer.sounds(),
            &self.grid_state,
            self.focus == Focus::Grid,
            &self.theme,
        );
        render_presets(
            frame,
            main[1],
            self.presets.presets(),
            &self.preset_list,
            self.focus == Focus::Presets,
            &self.theme,
        );
        self.render_footer(frame, chunks[2]);

        if let Some(scroll) = self.help_scroll {
            render_help(frame, chunks[1], scroll, &self.theme);
        }
        if let Some((_, prompt)) = &self.prompt {
            render_prompt(frame, area, prompt, &self.theme);
        }
    }

    /// Status message if recent, otherwise the cursor sound's credit and
    /// the last action
    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let text = match &self.status_message {
            Some((msg, at)) if at.elapsed().as_secs() < STATUS_SECS => msg.clone(),
            _ => {
                let credit = self
                    .sequencer
                    .sounds()
                    .get(self.grid_state.cursor_track)
                    .filter(|s| !s.credit_url.is_empty())
                    .map(|s| format!("{}: {}", s.name, s.credit_url));
                let last = self
                    .event_log
                    .latest()
                    .map(|e| format!("#{} {} ({})", e.id, e.description, e.age_label()));
                let mut parts: Vec<String> = credit.into_iter().chain(last).collect();
                parts.push("?:Help | SPACE:Play | TAB:Presets | Q:Quit".to_string());
                parts.join(" | ")
            }
        };

        let footer = Paragraph::new(text)
            .style(Style::default().fg(self.theme.dimmed).bg(self.theme.bg))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.border))
                    .style(Style::default().bg(self.theme.bg)),
            );
        frame.render_widget(footer, area);
    }
}

/// Fill keys: `1 2 4 8` fill every n steps from the first, the shifted
/// keys `! @ $ *` start at the variant offset
fn fill_for_key(c: char) -> Option<(usize, usize)> {
    const PLAIN: [char; 4] = ['1', '2', '4', '8'];
    const SHIFTED: [char; 4] = ['!', '@', '$', '*'];

    FILL_PRESETS
        .iter()
        .zip(PLAIN.iter().zip(SHIFTED.iter()))
        .find_map(|(&(divisor, variant), (&plain, &shifted))| {
            if c == plain {
                Some((divisor, 0))
            } else if c == shifted {
                variant.map(|offset| (divisor, offset))
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fill_keys_start_at_zero() {
        assert_eq!(fill_for_key('1'), Some((1, 0)));
        assert_eq!(fill_for_key('4'), Some((4, 0)));
        assert_eq!(fill_for_key('8'), Some((8, 0)));
    }

    #[test]
    fn shifted_fill_keys_use_offsets() {
        assert_eq!(fill_for_key('@'), Some((2, 1)));
        assert_eq!(fill_for_key('$'), Some((4, 2)));
        assert_eq!(fill_for_key('*'), Some((8, 4)));
        assert_eq!(fill_for_key('!'), None);
    }

    #[test]
    fn other_keys_are_not_fills() {
        assert_eq!(fill_for_key('3'), None);
        assert_eq!(fill_for_key('m'), None);
    }
}
