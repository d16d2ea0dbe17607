//! Persisted application settings.
//!
//! Tunables live in a YAML file that is loaded once at startup and written
//! back at shutdown. Components never read this struct directly; they get an
//! immutable [`MonitorConfig`] snapshot at construction time.

use crate::config::defaults::{
    AUDIO_RETRY_MS, CALL_HOLD_SECS, COUNTER_DECREMENT, COUNTER_MAX, DEFAULT_ACTIVATION_DELAY_SECS,
    DEFAULT_AUDIO_AMPLIFY, DEFAULT_CALL_SETUP_SECS, DEFAULT_DURATION_INFLUENCE,
    DEFAULT_RECALL_DELAY_SECS, RESUME_DELAY_MS, SAMPLE_INTERVAL_MS, SAMPLE_SUBINTERVAL,
    SCRIPT_START_TIMEOUT_MS, VOLUME_THRESHOLD,
};
use crate::contact::Contact;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

/// Settings persisted between runs, with the stock defaults applied to any
/// field missing from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub contact_name: String,
    pub contact_number: String,
    /// When set, notification runs this script instead of placing a call.
    pub notify_script: Option<PathBuf>,
    pub audio_amplify: i32,
    pub duration_influence: i32,
    pub call_setup_secs: u64,
    pub activation_delay_secs: u64,
    pub recall_delay_secs: u64,
    pub handle_incoming_calls: bool,
    pub send_sms: bool,
    pub show_statistics: bool,
    pub first_run: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            contact_name: String::new(),
            contact_number: String::new(),
            notify_script: None,
            audio_amplify: DEFAULT_AUDIO_AMPLIFY,
            duration_influence: DEFAULT_DURATION_INFLUENCE,
            call_setup_secs: DEFAULT_CALL_SETUP_SECS,
            activation_delay_secs: DEFAULT_ACTIVATION_DELAY_SECS,
            recall_delay_secs: DEFAULT_RECALL_DELAY_SECS,
            handle_incoming_calls: true,
            send_sms: false,
            show_statistics: true,
            first_run: true,
        }
    }
}

impl Settings {
    /// Default settings file location, honoring XDG conventions.
    pub fn default_path() -> PathBuf {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .unwrap_or_else(env::temp_dir)
            .join("cribcall")
            .join("settings.yaml")
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))
    }

    /// Write the current settings back to `path`, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut snapshot = self.clone();
        snapshot.first_run = false;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create settings directory '{}'", parent.display())
            })?;
        }
        let raw = serde_yaml::to_string(&snapshot).context("failed to serialize settings")?;
        fs::write(path, raw)
            .with_context(|| format!("failed to write settings file '{}'", path.display()))
    }

    pub fn contact(&self) -> Contact {
        Contact::new(self.contact_name.clone(), self.contact_number.clone())
    }

    /// Snapshot the tunables for the monitoring engine.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            contact: self.contact(),
            notify_script: self.notify_script.clone(),
            audio_amplify: self.audio_amplify,
            duration_influence: self.duration_influence,
            volume_threshold: VOLUME_THRESHOLD,
            counter_max: COUNTER_MAX,
            counter_decrement: COUNTER_DECREMENT,
            subinterval: SAMPLE_SUBINTERVAL,
            sample_interval: Duration::from_millis(SAMPLE_INTERVAL_MS),
            call_setup: Duration::from_secs(self.call_setup_secs),
            call_hold: Duration::from_secs(CALL_HOLD_SECS),
            activation_delay: Duration::from_secs(self.activation_delay_secs),
            recall_delay: Duration::from_secs(self.recall_delay_secs),
            resume_delay: Duration::from_millis(RESUME_DELAY_MS),
            audio_retry: Duration::from_millis(AUDIO_RETRY_MS),
            script_start_timeout: Duration::from_millis(SCRIPT_START_TIMEOUT_MS),
            handle_incoming_calls: self.handle_incoming_calls,
            send_sms: self.send_sms,
            show_statistics: self.show_statistics,
        }
    }
}

/// Immutable configuration handed to every engine component at construction.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub contact: Contact,
    pub notify_script: Option<PathBuf>,
    pub audio_amplify: i32,
    /// Counter increment applied per above-threshold chunk.
    pub duration_influence: i32,
    /// Threshold for both the chunk volume and the reported counter.
    pub volume_threshold: i32,
    pub counter_max: i32,
    pub counter_decrement: i32,
    pub subinterval: usize,
    pub sample_interval: Duration,
    pub call_setup: Duration,
    pub call_hold: Duration,
    pub activation_delay: Duration,
    pub recall_delay: Duration,
    pub resume_delay: Duration,
    pub audio_retry: Duration,
    pub script_start_timeout: Duration,
    pub handle_incoming_calls: bool,
    pub send_sms: bool,
    pub show_statistics: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn scratch_path(tag: &str) -> PathBuf {
        static SEQ: AtomicU32 = AtomicU32::new(0);
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        env::temp_dir().join(format!(
            "cribcall_settings_{tag}_{}_{seq}.yaml",
            std::process::id()
        ))
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = scratch_path("missing");
        let settings = Settings::load(&path).expect("defaults for missing file");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_and_reload_round_trip() {
        let path = scratch_path("roundtrip");
        let mut settings = Settings::default();
        settings.contact_name = "Alice".to_string();
        settings.contact_number = "+43123456789".to_string();
        settings.send_sms = true;
        settings.recall_delay_secs = 60;
        settings.save(&path).expect("save settings");

        let reloaded = Settings::load(&path).expect("reload settings");
        assert_eq!(reloaded.contact_name, "Alice");
        assert_eq!(reloaded.contact_number, "+43123456789");
        assert!(reloaded.send_sms);
        assert_eq!(reloaded.recall_delay_secs, 60);
        // Saving marks the first run as done.
        assert!(!reloaded.first_run);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let path = scratch_path("partial");
        fs::write(&path, "contact_number: \"0664555666\"\n").expect("write partial file");
        let settings = Settings::load(&path).expect("load partial file");
        assert_eq!(settings.contact_number, "0664555666");
        assert_eq!(settings.audio_amplify, DEFAULT_AUDIO_AMPLIFY);
        assert!(settings.handle_incoming_calls);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn monitor_config_snapshots_durations() {
        let mut settings = Settings::default();
        settings.call_setup_secs = 45;
        settings.activation_delay_secs = 5;
        let cfg = settings.monitor_config();
        assert_eq!(cfg.call_setup, Duration::from_secs(45));
        assert_eq!(cfg.activation_delay, Duration::from_secs(5));
        assert_eq!(cfg.call_hold, Duration::from_secs(CALL_HOLD_SECS));
    }
}
