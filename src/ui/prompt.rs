use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::preset::Confirmation;
use crate::ui::Theme;

const MAX_INPUT: usize = 40;

enum Mode {
    Text(String),
    Confirm,
}

/// Modal text-input or yes/no question
pub struct Prompt {
    pub title: String,
    mode: Mode,
}

/// Result of feeding a key to a prompt
#[derive(Debug, PartialEq, Eq)]
pub enum PromptReply {
    Pending,
    /// Entered text, or None if cancelled
    Text(Option<String>),
    Confirm(Confirmation),
}

impl Prompt {
    /// Text prompt pre-filled with `initial`
    pub fn text(title: impl Into<String>, initial: &str) -> Self {
        Self {
            title: title.into(),
            mode: Mode::Text(initial.chars().take(MAX_INPUT).collect()),
        }
    }

    pub fn confirm(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            mode: Mode::Confirm,
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> PromptReply {
        match &mut self.mode {
            Mode::Text(input) => match key {
                KeyCode::Enter => PromptReply::Text(Some(std::mem::take(input))),
                KeyCode::Esc => PromptReply::Text(None),
                KeyCode::Backspace => {
                    input.pop();
                    PromptReply::Pending
                }
                KeyCode::Char(c) if !c.is_control() && input.chars().count() < MAX_INPUT => {
                    input.push(c);
                    PromptReply::Pending
                }
                _ => PromptReply::Pending,
            },
            Mode::Confirm => match key {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    PromptReply::Confirm(Confirmation::Confirmed)
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    PromptReply::Confirm(Confirmation::Declined)
                }
                _ => PromptReply::Pending,
            },
        }
    }
}

/// Draw the prompt centered over `area`
pub fn render_prompt(frame: &mut Frame, area: Rect, prompt: &Prompt, theme: &Theme) {
    let width = area.width.min(50);
    let popup = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + area.height.saturating_sub(3) / 2,
        width,
        3.min(area.height),
    );

    let body = match &prompt.mode {
        Mode::Text(input) => Line::from(vec![
            Span::styled(input.clone(), Style::default().fg(theme.fg)),
            Span::styled("_", Style::default().fg(theme.grid_cursor)),
        ]),
        Mode::Confirm => Line::from(Span::styled(
            "y / n",
            Style::default().fg(theme.grid_cursor).bold(),
        )),
    };

    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", prompt.title),
            Style::default().fg(theme.highlight).bold(),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.highlight))
        .style(Style::default().bg(theme.bg));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(body).block(block), popup);
}
