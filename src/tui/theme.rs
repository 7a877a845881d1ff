use ratatui::style::Color;

use crate::model::task::TaskStatus;

/// Colors for the play screen
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub text_bright: Color,
    pub highlight: Color,
    pub dim: Color,
    pub red: Color,
    pub yellow: Color,
    pub green: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: Color::Rgb(0x0C, 0x00, 0x1B),
            text: Color::Rgb(0xB0, 0xAA, 0xFF),
            text_bright: Color::Rgb(0xFF, 0xFF, 0xFF),
            highlight: Color::Rgb(0xFB, 0x41, 0x96),
            dim: Color::Rgb(0x7D, 0x78, 0xBF),
            red: Color::Rgb(0xFF, 0x44, 0x44),
            yellow: Color::Rgb(0xFF, 0xD7, 0x00),
            green: Color::Rgb(0x44, 0xFF, 0x88),
        }
    }
}

impl Theme {
    pub fn status_color(&self, status: TaskStatus) -> Color {
        match status {
            TaskStatus::Todo => self.text,
            TaskStatus::Doing => self.highlight,
            TaskStatus::Done => self.green,
        }
    }

    /// Timer color: normal while within the estimate, yellow in the last
    /// fifth, red once over.
    pub fn timer_color(&self, elapsed: u64, estimate: u64) -> Color {
        if estimate == 0 || elapsed > estimate {
            self.red
        } else if elapsed * 5 >= estimate * 4 {
            self.yellow
        } else {
            self.text_bright
        }
    }
}
