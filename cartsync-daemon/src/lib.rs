//! Scheduler driver: runs sync passes on an interval without overlap.

mod error;
mod runtime;
pub mod scheduler;

pub use error::DaemonError;
pub use runtime::{init_tracing, run, start_blocking};
pub use scheduler::{Scheduler, SchedulerState, SchedulerStats};
