//! Telephony backend seam and call-state tracking.
//!
//! The concrete signaling transport (a D-Bus phone stack on the original
//! platform) stays outside this crate. The engine issues commands through
//! [`TelephonyBackend`] and consumes [`TelephonyEvent`]s that the transport
//! adapter feeds into the control channel.

mod call_state;

pub use call_state::{CallEvent, CallTracker};

use crate::{log_debug, log_debug_content};
use anyhow::Result;

/// Call status code for a newly arrived incoming call.
pub const STATUS_COMING: u32 = 2;
/// First status at which the stack accepts an answer command.
pub const STATUS_ALERTING: u32 = 5;
/// Terminal status, reported for every call.
pub const STATUS_TERMINATED: u32 = 15;

/// Asynchronous notifications from the phone stack, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelephonyEvent {
    Incoming { caller: String },
    Status(u32),
    AudioConnect { uplink: bool, downlink: bool },
}

/// Commands into the phone stack. All three are fire-and-forget: the result
/// only reports whether the stack accepted the command, completion arrives
/// later as [`TelephonyEvent`]s.
pub trait TelephonyBackend {
    fn dial(&mut self, number: &str) -> Result<()>;
    fn answer(&mut self) -> Result<()>;
    fn release(&mut self) -> Result<()>;
}

/// Backend used when no phone stack is wired up; accepts every command and
/// leaves a log trail.
pub struct NullBackend;

impl TelephonyBackend for NullBackend {
    fn dial(&mut self, number: &str) -> Result<()> {
        tracing::info!(target: "cribcall::telephony", command = "dial", "telephony command");
        log_debug("telephony dial");
        log_debug_content(&format!("telephony dial target: {number}"));
        Ok(())
    }

    fn answer(&mut self) -> Result<()> {
        tracing::info!(target: "cribcall::telephony", command = "answer", "telephony command");
        log_debug("telephony answer");
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        tracing::info!(target: "cribcall::telephony", command = "release", "telephony command");
        log_debug("telephony release");
        Ok(())
    }
}
