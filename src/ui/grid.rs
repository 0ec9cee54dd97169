use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::sequencer::SequencerState;
use crate::sound::Sound;
use crate::ui::Theme;

const LABEL_WIDTH: u16 = 10;
const MIXER_WIDTH: u16 = 16;
const METER_CELLS: usize = 8;

/// Grid cursor position
pub struct GridState {
    pub cursor_track: usize,
    pub cursor_step: usize,
}

impl GridState {
    pub fn new() -> Self {
        Self {
            cursor_track: 0,
            cursor_step: 0,
        }
    }

    pub fn move_cursor(&mut self, dx: i32, dy: i32, num_tracks: usize, num_steps: usize) {
        if num_tracks == 0 || num_steps == 0 {
            return;
        }
        self.cursor_step = (self.cursor_step as i32 + dx).rem_euclid(num_steps as i32) as usize;
        self.cursor_track = (self.cursor_track as i32 + dy).rem_euclid(num_tracks as i32) as usize;
    }
}

impl Default for GridState {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the step grid with a mute flag and volume meter per row
pub fn render_grid(
    frame: &mut Frame,
    area: Rect,
    state: &SequencerState,
    sounds: &[Sound],
    grid_state: &GridState,
    focused: bool,
    theme: &Theme,
) {
    let border = if focused { theme.highlight } else { theme.border };
    let block = Block::default()
        .title(Span::styled(" Pattern ", Style::default().fg(theme.track_label)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(theme.bg));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let steps = state.pattern.width();
    let playhead = state
        .transport
        .playhead()
        .filter(|_| state.transport.is_playing());
    let available = inner.width.saturating_sub(LABEL_WIDTH + MIXER_WIDTH);
    let cell_width = (available / steps.max(1) as u16).clamp(1, 3);
    let row_gap = if inner.height as usize >= sounds.len() * 2 { 2 } else { 1 };

    for (track, sound) in sounds.iter().enumerate() {
        // Rows muted when the current column was taken show no playhead
        let row_playhead = playhead.filter(|_| {
            !state
                .transport
                .mute_snapshot()
                .get(track)
                .copied()
                .unwrap_or(false)
        });
        let y = inner.y + (track as u16 * row_gap);
        if y >= inner.y + inner.height {
            break;
        }

        let label_style = if focused && track == grid_state.cursor_track {
            Style::default().fg(theme.highlight).bold()
        } else {
            Style::default().fg(theme.sound_color(&sound.color))
        };
        let label: String = sound.name.chars().take(LABEL_WIDTH as usize - 1).collect();
        frame.render_widget(
            Paragraph::new(format!("{:>width$} ", label, width = LABEL_WIDTH as usize - 1))
                .style(label_style),
            Rect::new(inner.x, y, LABEL_WIDTH, 1),
        );

        for step in 0..steps {
            let x = inner.x + LABEL_WIDTH + step as u16 * cell_width;
            if x + cell_width > inner.x + inner.width {
                break;
            }
            let active = state.pattern.is_active(&sound.name, step);
            let is_cursor =
                focused && track == grid_state.cursor_track && step == grid_state.cursor_step;
            let (symbol, style) = cell_style(active, is_cursor, row_playhead == Some(step), step, theme);
            frame.render_widget(
                Paragraph::new(symbol).style(style),
                Rect::new(x, y, cell_width.min(2), 1),
            );
        }

        let mixer_x = inner.x + LABEL_WIDTH + steps as u16 * cell_width + 1;
        if mixer_x + MIXER_WIDTH <= inner.x + inner.width {
            render_mix_strip(
                frame,
                Rect::new(mixer_x, y, MIXER_WIDTH, 1),
                state.mix.volume(track).unwrap_or(0.0),
                state.mix.is_muted(track),
                theme,
            );
        }
    }
}

fn cell_style(
    active: bool,
    is_cursor: bool,
    is_playhead: bool,
    step: usize,
    theme: &Theme,
) -> (&'static str, Style) {
    if is_cursor {
        let style = if active {
            Style::default().fg(theme.bg).bg(theme.grid_cursor).bold()
        } else {
            Style::default().fg(theme.grid_cursor).bg(theme.bg).bold()
        };
        ("[]", style)
    } else if is_playhead {
        if active {
            ("##", Style::default().fg(theme.bg).bg(theme.highlight).bold())
        } else {
            ("::", Style::default().fg(theme.highlight).bg(theme.bg))
        }
    } else if active {
        ("##", Style::default().fg(theme.grid_active).bg(theme.bg))
    } else if step % 4 == 0 {
        (". ", Style::default().fg(theme.dimmed).bg(theme.bg))
    } else {
        ("- ", Style::default().fg(theme.grid_inactive).bg(theme.bg))
    }
}

fn render_mix_strip(frame: &mut Frame, area: Rect, volume: f32, muted: bool, theme: &Theme) {
    let lit = (volume * METER_CELLS as f32).round() as usize;
    let meter_color = if muted { theme.muted } else { theme.meter };
    let line = Line::from(vec![
        Span::styled(
            if muted { "M " } else { "  " },
            Style::default().fg(theme.muted).bold(),
        ),
        Span::styled("|".repeat(lit), Style::default().fg(meter_color)),
        Span::styled(
            ".".repeat(METER_CELLS.saturating_sub(lit)),
            Style::default().fg(theme.dimmed),
        ),
        Span::styled(format!(" {:.2}", volume), Style::default().fg(theme.fg)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Render transport status bar
pub fn render_transport(
    frame: &mut Frame,
    area: Rect,
    state: &SequencerState,
    preset_name: Option<&str>,
    theme: &Theme,
) {
    let playing = state.transport.is_playing();
    let status = if playing { "PLAY" } else { "STOP" };
    let status_style = if playing {
        Style::default().fg(theme.meter).bold()
    } else {
        Style::default().fg(theme.dimmed)
    };
    let step = state
        .transport
        .playhead()
        .unwrap_or(state.transport.current_step());
    let separator = || Span::styled(" | ", Style::default().fg(theme.border));

    let mut spans = vec![
        Span::styled(format!(" {} ", status), status_style),
        separator(),
        Span::styled(
            format!("BPM: {}", state.tempo.bpm()),
            Style::default().fg(theme.fg),
        ),
        separator(),
        Span::styled(
            format!("Step: {:2}/{}", step + 1, state.pattern.width()),
            Style::default().fg(theme.fg),
        ),
    ];
    if let Some(name) = preset_name {
        spans.push(separator());
        spans.push(Span::styled(
            format!("Preset: {}", name),
            Style::default().fg(theme.track_label),
        ));
    }

    let transport = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .style(Style::default().bg(theme.bg)),
        );

    frame.render_widget(transport, area);
}
