//! Entropy: pick a media file, pick an operation, let ffmpeg do the work.
//!
//! The library holds everything except the front ends: the operation table
//! and the argument lists each operation hands to ffmpeg, the engine wrapper
//! that runs ffmpeg in a scratch directory, the progress/time utilities fed
//! by its log, and the session state a front end drives.

pub mod config;
pub mod engine;
pub mod error;
pub mod operations;
pub mod output;
pub mod progress;
pub mod session;
pub mod utils;

#[cfg(feature = "desktop")]
pub mod app;

#[cfg(all(test, unix))]
mod test_support;

pub use config::Settings;
pub use engine::{Context, Engine, NullReporter, Reporter};
pub use error::{Error, Result};
pub use operations::{
    AudioFormat, Flip, Job, MediaKind, Operation, OperationDescriptor, OperationKind, Resolution,
    VideoFormat, OPERATIONS,
};
pub use output::Output;
pub use progress::{parse_ffmpeg_time_log, ProgressState, ProgressTracker, TimeLog};
pub use session::{SelectedFile, Session};

#[cfg(feature = "desktop")]
pub use app::run;
