pub mod blob_store;
pub mod config_io;
pub mod lock;
pub mod service;
pub mod store;
pub mod watcher;
