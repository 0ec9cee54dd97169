use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};

use crate::preset::Preset;
use crate::ui::Theme;

/// Selection in the preset list, and which preset was last loaded or saved
pub struct PresetListState {
    pub selected: usize,
    pub current: Option<usize>,
}

impl PresetListState {
    pub fn new() -> Self {
        Self {
            selected: 0,
            current: None,
        }
    }

    pub fn move_selection(&mut self, delta: i32, len: usize) {
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected as i32 + delta).clamp(0, len as i32 - 1) as usize;
    }

    /// Keep indices valid after the preset at `removed` was deleted
    pub fn on_deleted(&mut self, removed: usize, len: usize) {
        self.current = match self.current {
            Some(c) if c == removed => None,
            Some(c) if c > removed => Some(c - 1),
            other => other,
        };
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}

impl Default for PresetListState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render_presets(
    frame: &mut Frame,
    area: Rect,
    presets: &[Preset],
    list_state: &PresetListState,
    focused: bool,
    theme: &Theme,
) {
    let border = if focused { theme.highlight } else { theme.border };
    let block = Block::default()
        .title(Span::styled(" Presets ", Style::default().fg(theme.track_label)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(theme.bg));

    if presets.is_empty() {
        let hint = ListItem::new(Span::styled(
            " (none - Tab, n to save)",
            Style::default().fg(theme.dimmed),
        ));
        frame.render_widget(List::new(vec![hint]).block(block), area);
        return;
    }

    let items: Vec<ListItem> = presets
        .iter()
        .enumerate()
        .map(|(i, preset)| {
            let marker = if list_state.current == Some(i) { "*" } else { " " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(theme.highlight)),
                Span::styled(preset.name.clone(), Style::default().fg(theme.fg)),
                Span::styled(
                    format!(" {}bpm", preset.snapshot.tempo.bpm()),
                    Style::default().fg(theme.dimmed),
                ),
            ]))
        })
        .collect();

    let highlight = if focused {
        Style::default().fg(theme.bg).bg(theme.grid_cursor).bold()
    } else {
        Style::default().add_modifier(Modifier::UNDERLINED)
    };
    let list = List::new(items).block(block).highlight_style(highlight);

    let mut state = ListState::default().with_selected(Some(list_state.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_is_clamped_to_list() {
        let mut s = PresetListState::new();
        s.move_selection(5, 3);
        assert_eq!(s.selected, 2);
        s.move_selection(-9, 3);
        assert_eq!(s.selected, 0);
    }

    #[test]
    fn delete_shifts_current_marker() {
        let mut s = PresetListState {
            selected: 2,
            current: Some(2),
        };
        s.on_deleted(0, 2);
        assert_eq!(s.current, Some(1));
        assert_eq!(s.selected, 1);

        s.on_deleted(1, 1);
        assert_eq!(s.current, None);
        assert_eq!(s.selected, 0);
    }
}
