//! Stock values for persisted settings and the fixed engineering constants.

/// Volume amplification factor applied to the log energy.
pub const DEFAULT_AUDIO_AMPLIFY: i32 = 16;
/// Counter increment per above-threshold chunk.
pub const DEFAULT_DURATION_INFLUENCE: i32 = 10;
/// Seconds an unanswered alert call rings before it is released.
pub const DEFAULT_CALL_SETUP_SECS: u64 = 30;
/// Seconds between arming the monitor and it going live.
pub const DEFAULT_ACTIVATION_DELAY_SECS: u64 = 0;
/// Pause in seconds after a notification before monitoring re-activates.
pub const DEFAULT_RECALL_DELAY_SECS: u64 = 180;

/// Threshold for both the chunk volume and the reported alarm counter.
pub const VOLUME_THRESHOLD: i32 = 100;
/// The reported counter clips at this value.
pub const COUNTER_MAX: i32 = 120;
/// Counter decrement per below-threshold chunk.
pub const COUNTER_DECREMENT: i32 = 3;
/// Internal counter granularity per reported counter step.
pub const COUNTER_SCALE: i32 = 5;
/// Maximum duration of an established call before it is force-dropped.
pub const CALL_HOLD_SECS: u64 = 300;
/// How long the notify script gets to come up before the attempt fails.
pub const SCRIPT_START_TIMEOUT_MS: u64 = 2_000;
/// Wait after a call ends before capture restarts.
pub const RESUME_DELAY_MS: u64 = 2_000;
/// Audio chunk duration processed per analysis pass.
pub const SAMPLE_INTERVAL_MS: u64 = 800;
/// Samples per peak-detection sub-window.
pub const SAMPLE_SUBINTERVAL: usize = 16;
/// Backoff before retrying a failed capture start.
pub const AUDIO_RETRY_MS: u64 = 5_000;

/// Control channel capacity; chunk delivery drops rather than blocks when
/// the loop falls behind.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// CLI validation bounds.
pub const MIN_AUDIO_AMPLIFY: i32 = 1;
pub const MAX_AUDIO_AMPLIFY: i32 = 1_000;
pub const MIN_DURATION_INFLUENCE: i32 = 1;
pub const MAX_DURATION_INFLUENCE: i32 = 600;
pub const MIN_CALL_SETUP_SECS: u64 = 5;
pub const MAX_CALL_SETUP_SECS: u64 = 120;
pub const MAX_DELAY_SECS: u64 = 3_600;
