//! Long-running reconciliation: scheduler loop, signals, runtime, logging.

mod error;
pub mod logging;
mod runtime;
pub mod scheduler;

pub use error::DaemonError;
pub use logging::{init_tracing, LogConfig, LogFormat};
pub use runtime::{run, run_once, run_once_blocking, start_blocking, SHUTDOWN_GRACE};
pub use scheduler::{SchedulerConfig, SchedulerStats};
