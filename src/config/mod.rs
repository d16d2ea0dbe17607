//! Command-line parsing and validation helpers.

pub mod defaults;
mod validation;

use clap::Parser;
use std::path::PathBuf;

/// CLI options for the cribcall monitor. Validated values keep the settings
/// overlay and downstream subprocesses safe.
#[derive(Debug, Parser, Clone)]
#[command(about = "Cribcall infant audio monitor", author, version)]
pub struct AppConfig {
    /// Path to the persisted settings file
    #[arg(long, env = "CRIBCALL_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Contact phone number override (persisted on exit)
    #[arg(long = "contact-number")]
    pub contact_number: Option<String>,

    /// Contact display name override
    #[arg(long = "contact-name")]
    pub contact_name: Option<String>,

    /// Notify by running this script instead of placing a call
    #[arg(long = "notify-script")]
    pub notify_script: Option<PathBuf>,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Arm the monitor immediately instead of waiting for the `on` command
    #[arg(long, default_value_t = false)]
    pub activate: bool,

    /// Volume amplification factor override
    #[arg(long = "audio-amplify")]
    pub audio_amplify: Option<i32>,

    /// Counter increment per loud chunk override
    #[arg(long = "duration-influence")]
    pub duration_influence: Option<i32>,

    /// Seconds an unanswered alert call rings before release
    #[arg(long = "call-setup-secs")]
    pub call_setup_secs: Option<u64>,

    /// Seconds between arming and the monitor going live
    #[arg(long = "activation-delay-secs")]
    pub activation_delay_secs: Option<u64>,

    /// Pause in seconds after a notification before re-activation
    #[arg(long = "recall-delay-secs")]
    pub recall_delay_secs: Option<u64>,

    /// Send an SMS notice to the contact when an incoming call is rejected
    #[arg(long = "send-sms", default_value_t = false)]
    pub send_sms: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "CRIBCALL_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "CRIBCALL_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging caller phone numbers (debug log only)
    #[arg(
        long = "log-content",
        env = "CRIBCALL_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,
}
