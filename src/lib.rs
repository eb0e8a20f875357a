pub mod client;
pub mod config;
pub mod doctor;
pub mod hotkey;
pub mod logging;
pub mod markdown;
pub mod sched;
mod telemetry;
pub mod terminal_restore;
pub mod worker;

pub use logging::{init_logging, log_debug, log_debug_content, log_file_path, log_panic};
pub use telemetry::init_tracing;
pub use worker::{RequestWorker, StreamSession, WorkerEvent};
