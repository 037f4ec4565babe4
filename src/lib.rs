//! rsbar: a status command for i3bar and swaybar.
//!
//! Each configured module runs on its own thread and sends whole block
//! batches to a single engine loop, which owns stdout and re-emits the full
//! status line on every update. Clicks arrive on stdin and are routed back to
//! the module that owns the clicked block.

pub mod app;
pub mod config;
pub mod engine;
pub mod i3bar;
pub mod module;
pub mod signals;
mod telemetry;
pub mod theme;

pub use app::{print_config, resolve_bar, run_bar};
pub use telemetry::{init_tracing, tracing_log_path};
