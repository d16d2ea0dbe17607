//! Cribcall: an infant audio monitor that phones home.
//!
//! The engine samples ambient sound, debounces sustained noise into an alarm
//! signal, and notifies a configured contact by outbound call or script while
//! arbitrating phone-call state so alerting and monitoring never collide.

pub mod audio;
pub mod config;
pub mod contact;
mod logging;
pub mod monitor;
pub mod notify;
pub mod settings;
pub mod telephony;
mod telemetry;
pub mod timer;

pub use logging::{
    crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic,
};
pub use telemetry::init_tracing;
