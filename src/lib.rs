pub mod board;
pub mod cache;
pub mod client;
pub mod config;
pub mod drag;
pub mod logging;
pub mod model;
pub mod storage;
pub mod store;
pub mod sync;

#[cfg(feature = "tui")]
pub mod tui;
