pub mod play_view;
pub mod status_row;

#[cfg(test)]
pub mod test_helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::widgets::Block;

use crate::model::task::TaskStatus;

use super::theme::Theme;

/// Everything the play screen shows, detached from the navigator so it
/// can be rendered in tests without a store.
#[derive(Debug, Clone, Default)]
pub struct PlayView {
    pub current: Option<CurrentView>,
    pub total_completed: u32,
    pub streak: u32,
    pub unlocked: usize,
    pub status: Option<String>,
    pub can_retreat: bool,
}

#[derive(Debug, Clone)]
pub struct CurrentView {
    /// Ancestor names, root first
    pub breadcrumb: Vec<String>,
    pub name: String,
    pub status: TaskStatus,
    pub elapsed: u64,
    pub estimate: u64,
    pub paused: bool,
    /// 1-based position in the queue
    pub position: usize,
    pub queued: usize,
    pub has_image: bool,
}

pub fn render(frame: &mut Frame, view: &PlayView, theme: &Theme) {
    let area = frame.area();

    let bg_style = Style::default().bg(theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    // Layout: content | status row (1 row) | key hints (1 row)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    play_view::render_play_view(frame, view, theme, chunks[0]);
    status_row::render_status_row(frame, view, theme, chunks[1]);
    status_row::render_key_hints(frame, view, theme, chunks[2]);
}
