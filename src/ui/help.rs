use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::ui::Theme;

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "GLOBAL",
        &[
            ("Space", "Play / pause (always restarts at step 1)"),
            ("Tab", "Switch focus: pattern / presets"),
            ("?", "Toggle this help"),
            ("q", "Quit"),
        ],
    ),
    (
        "PATTERN",
        &[
            ("Arrows hjkl", "Move cursor"),
            ("Enter", "Toggle step"),
            ("1 2 4 8", "Fill every 1/2/4/8 steps (again to clear)"),
            ("@ $ *", "Offset fill for 2/4/8: start at step 2, 3, 5"),
            ("c", "Clear row"),
            ("x", "Reset: stop and clear the grid"),
            ("m", "Mute / unmute row"),
            ("[ ]", "Row volume down / up"),
            ("0", "Row volume back to 0.50"),
            (", .", "Tempo -1 / +1"),
            ("< >", "Tempo -10 / +10"),
            ("t", "Type a tempo"),
        ],
    ),
    (
        "PRESETS",
        &[
            ("Up/Down", "Select preset"),
            ("Enter", "Load preset"),
            ("n", "Save as new preset"),
            ("w", "Overwrite selected preset"),
            ("r", "Rename selected preset"),
            ("d", "Delete selected preset"),
        ],
    ),
];

/// Total number of help lines (for scroll bounds)
pub fn help_line_count() -> usize {
    SECTIONS.iter().map(|(_, keys)| keys.len() + 2).sum()
}

fn help_lines(theme: &Theme) -> Vec<Line<'static>> {
    let header_style = Style::default().fg(theme.highlight).bold();
    let key_style = Style::default().fg(theme.grid_active);
    let desc_style = Style::default().fg(theme.fg);

    let mut lines = Vec::with_capacity(help_line_count());
    for (title, keys) in SECTIONS {
        lines.push(Line::from(Span::styled(format!("  {}", title), header_style)));
        for (key, desc) in keys.iter() {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<12}", key), key_style),
                Span::styled(desc.to_string(), desc_style),
            ]));
        }
        lines.push(Line::from(""));
    }
    lines
}

/// Render the key reference over `area`, starting at line `scroll`
pub fn render_help(frame: &mut Frame, area: Rect, scroll: usize, theme: &Theme) {
    let block = Block::default()
        .title(Span::styled(" Help ", Style::default().fg(theme.track_label)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.bg));

    let lines: Vec<Line> = help_lines(theme).into_iter().skip(scroll).collect();
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
