use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Gauge, Paragraph};

use crate::ops::duration::{format_clock, format_short};
use crate::tui::theme::Theme;
use crate::util::unicode::truncate_to_width;

use super::{CurrentView, PlayView};

const BREADCRUMB_SEP: &str = " \u{203A} ";

/// The task being played, centered: breadcrumb, name, timer and a gauge
/// against the estimate.
pub fn render_play_view(frame: &mut Frame, view: &PlayView, theme: &Theme, area: Rect) {
    let Some(current) = &view.current else {
        render_idle(frame, view, theme, area);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(1), // breadcrumb
            Constraint::Length(1), // name
            Constraint::Length(1),
            Constraint::Length(1), // timer
            Constraint::Length(1), // gauge
            Constraint::Length(1), // queue position
            Constraint::Fill(1),
        ])
        .split(area);

    let width = area.width.saturating_sub(4) as usize;
    let bg = theme.background;

    let crumb = truncate_to_width(&current.breadcrumb.join(BREADCRUMB_SEP), width);
    frame.render_widget(
        Paragraph::new(Span::styled(crumb, Style::default().fg(theme.dim).bg(bg)))
            .alignment(Alignment::Center),
        rows[1],
    );

    let mut name_spans = vec![Span::styled(
        truncate_to_width(&current.name, width.saturating_sub(2)),
        Style::default()
            .fg(theme.status_color(current.status))
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    )];
    if current.has_image {
        name_spans.push(Span::styled(" \u{25A3}", Style::default().fg(theme.dim).bg(bg)));
    }
    frame.render_widget(
        Paragraph::new(Line::from(name_spans)).alignment(Alignment::Center),
        rows[2],
    );

    frame.render_widget(
        Paragraph::new(timer_line(current, theme)).alignment(Alignment::Center),
        rows[4],
    );

    let gauge_area = centered(rows[5], area.width.saturating_sub(8).min(48));
    frame.render_widget(
        Gauge::default()
            .gauge_style(
                Style::default()
                    .fg(theme.timer_color(current.elapsed, current.estimate))
                    .bg(theme.dim),
            )
            .ratio(progress_ratio(current.elapsed, current.estimate))
            .label(""),
        gauge_area,
    );

    frame.render_widget(
        Paragraph::new(Span::styled(
            format!("{} of {}", current.position, current.queued),
            Style::default().fg(theme.dim).bg(bg),
        ))
        .alignment(Alignment::Center),
        rows[6],
    );
}

fn timer_line(current: &CurrentView, theme: &Theme) -> Line<'static> {
    let bg = theme.background;
    let mut spans = vec![
        Span::styled(
            format_clock(current.elapsed),
            Style::default()
                .fg(theme.timer_color(current.elapsed, current.estimate))
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" / {}", format_short(current.estimate)),
            Style::default().fg(theme.dim).bg(bg),
        ),
    ];
    if current.paused {
        spans.push(Span::styled(
            "  paused",
            Style::default().fg(theme.yellow).bg(bg),
        ));
    }
    Line::from(spans)
}

fn render_idle(frame: &mut Frame, view: &PlayView, theme: &Theme, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
        ])
        .split(area);
    let bg = theme.background;
    frame.render_widget(
        Paragraph::new(Span::styled(
            "No task in progress",
            Style::default().fg(theme.text).bg(bg),
        ))
        .alignment(Alignment::Center),
        rows[1],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!("{} completed so far", view.total_completed),
            Style::default().fg(theme.dim).bg(bg),
        ))
        .alignment(Alignment::Center),
        rows[2],
    );
}

/// Share of the estimate used, clamped to the gauge's range. A zero
/// estimate reads as full.
pub fn progress_ratio(elapsed: u64, estimate: u64) -> f64 {
    if estimate == 0 {
        return 1.0;
    }
    (elapsed as f64 / estimate as f64).clamp(0.0, 1.0)
}

fn centered(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}
