pub mod app;
pub mod render;
pub mod theme;

pub use app::{TuiError, run};
