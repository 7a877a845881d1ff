pub mod achievements;
pub mod decompose;
pub mod duration;
pub mod events;
pub mod image_gen;
pub mod leaves;
pub mod navigator;
pub mod session;
pub mod stats_ops;
pub mod tree_ops;
