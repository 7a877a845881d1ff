use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::theme::Theme;
use crate::util::unicode::{display_width, fit_to_width};

use super::PlayView;

/// Status message on the left, session counters on the right.
pub fn render_status_row(frame: &mut Frame, view: &PlayView, theme: &Theme, area: Rect) {
    let bg = theme.background;
    let width = area.width as usize;

    let counters = format!(
        "done {}  streak {}  \u{2605} {}",
        view.total_completed, view.streak, view.unlocked
    );
    let counters_width = display_width(&counters);
    let message_width = width.saturating_sub(counters_width + 1);
    let message = view.status.as_deref().unwrap_or("");

    let mut spans = vec![Span::styled(
        fit_to_width(message, message_width),
        Style::default().fg(theme.highlight).bg(bg),
    )];
    if counters_width < width {
        spans.push(Span::styled(" ", Style::default().bg(bg)));
        spans.push(Span::styled(counters, Style::default().fg(theme.dim).bg(bg)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Keys that do something right now.
pub fn render_key_hints(frame: &mut Frame, view: &PlayView, theme: &Theme, area: Rect) {
    let bg = theme.background;
    let mut hints: Vec<&str> = Vec::new();
    if view.current.is_some() {
        hints.push("enter done");
        hints.push("n next");
        if view.can_retreat {
            hints.push("p back");
        }
        hints.push("space pause");
        hints.push("+/- estimate");
    } else {
        hints.push("enter start");
    }
    hints.push("q quit");

    let text = fit_to_width(&hints.join("  "), area.width as usize);
    frame.render_widget(
        Paragraph::new(Span::styled(text, Style::default().fg(theme.dim).bg(bg))),
        area,
    );
}
