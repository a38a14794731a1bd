//! # Run Engine
//!
//! The [`Harness`] executes a list of test cases either sequentially or on a
//! fixed pool of workers, sharing one latency recorder and one cancellation
//! handle across them.

pub mod cancel;
pub mod metrics;
pub mod runner;

pub use cancel::CancelHandle;
pub use metrics::{LatencyRecorder, LatencyStats};
pub use runner::{Harness, RunOutput};
