pub mod accomplishment;
pub mod config;
pub mod stats;
pub mod task;

pub use accomplishment::*;
pub use config::*;
pub use stats::*;
pub use task::*;
