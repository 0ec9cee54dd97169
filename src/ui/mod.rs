pub mod grid;
pub mod help;
pub mod presets;
pub mod prompt;
pub mod theme;

pub use grid::{render_grid, render_transport, GridState};
pub use help::{help_line_count, render_help};
pub use presets::{render_presets, PresetListState};
pub use prompt::{render_prompt, Prompt, PromptReply};
pub use theme::{Theme, ThemeName};
