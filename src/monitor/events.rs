//! Event types crossing into and out of the control loop.

use crate::telephony::TelephonyEvent;

/// The single serialized event stream feeding the control loop. Capture
/// callbacks, the telephony transport, script watchers, and the shell all
/// funnel through this type; nothing else touches engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// One sample-interval worth of mono PCM from the capture device.
    AudioChunk(Vec<i16>),
    Telephony(TelephonyEvent),
    /// The notify script terminated with the given exit code.
    ScriptExited(i32),
    /// Shell request to arm the monitor.
    Activate,
    /// Shell request to disarm the monitor.
    Deactivate,
    Shutdown,
}

/// Outward signals consumed by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// One reading per processed audio chunk.
    AudioLevel { counter: i32, volume: i32 },
    /// A call began (`finished: false`) or ended (`finished: true`);
    /// `self_initiated` distinguishes notification episodes from foreign
    /// calls.
    CallStatus { finished: bool, self_initiated: bool },
    /// A notification attempt could not be dispatched.
    NotifyError,
    /// Arming was refused, currently only for an invalid contact number.
    ActivationRejected,
    /// The post-call wait ended and audio monitoring is running again.
    MonitoringResumed,
    /// Call statistics summary, surfaced on deactivation.
    Statistics(String),
}
