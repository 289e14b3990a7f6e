//! Nested task-progress reporting and cooperative cancellation shared by
//! every long-running operation in the pipeline (solves, deconvolution,
//! detection, rendering).

mod file_progress;
mod progress_info;

pub use file_progress::FileProgress;
pub use progress_info::{ProgressInfo, Task};
