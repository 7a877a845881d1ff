use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

use crate::model::task::TaskStatus;

use super::{CurrentView, PlayView};

pub const TERM_W: u16 = 80;
pub const TERM_H: u16 = 24;

/// Render into an in-memory buffer and return plain text (no styles).
pub fn render_to_string<F>(w: u16, h: u16, f: F) -> String
where
    F: FnOnce(&mut ratatui::Frame, Rect),
{
    let backend = TestBackend::new(w, h);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|frame| {
            let area = frame.area();
            f(frame, area);
        })
        .unwrap();

    let buf = terminal.backend().buffer().clone();
    let w = buf.area.width as usize;
    let lines: Vec<String> = buf
        .content
        .chunks(w)
        .map(|row| {
            let s: String = row.iter().map(|cell| cell.symbol()).collect();
            s.trim_end().to_string()
        })
        .collect();

    // Trim trailing blank lines
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

/// Second of three queued leaves, 65s into a 5 minute estimate.
pub fn playing() -> PlayView {
    PlayView {
        current: Some(CurrentView {
            breadcrumb: vec!["Home".into(), "Kitchen".into()],
            name: "Wipe counters".into(),
            status: TaskStatus::Todo,
            elapsed: 65,
            estimate: 300,
            paused: false,
            position: 2,
            queued: 3,
            has_image: false,
        }),
        total_completed: 4,
        streak: 1,
        unlocked: 1,
        status: None,
        can_retreat: true,
    }
}
