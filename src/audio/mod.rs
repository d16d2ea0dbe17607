//! Audio capture and volume analysis pipeline.
//!
//! The microphone is sampled as signed 16-bit mono PCM, delivered in fixed
//! duration chunks to the control loop, and reduced there to a scalar volume
//! plus a debounced alarm counter. The analyzer never decides whether to
//! notify; that call belongs to the monitor.

/// Capture rate requested from the input device.
pub const TARGET_RATE: u32 = 8_000;

/// Capture channel count requested from the input device.
pub const TARGET_CHANNELS: u16 = 1;

mod analyzer;
mod capture;
mod dispatch;

pub use analyzer::{AnalyzerConfig, AudioReading, VolumeAnalyzer};
pub use capture::{CaptureControl, MicCapture};
