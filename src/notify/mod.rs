//! Contact notification: outbound alert calls, user scripts, and missed-call
//! SMS notices.
//!
//! One notification episode runs at a time, guarded by a pending flag. Every
//! episode ends in exactly one `NotifyFinished`, whichever of the four
//! resolution paths fires first (call established then ended, call never
//! answered, or script exit).

mod script;

pub use script::ScriptRunner;

use crate::log_debug;
use crate::settings::MonitorConfig;
use crate::telephony::TelephonyBackend;
use crate::timer::{TimerId, TimerSet};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Launches the user notify script without blocking the control thread
/// beyond the start handshake. Completion arrives later as a control event.
pub trait ProcessRunner {
    fn launch(&mut self, script: &Path, args: &[String]) -> Result<()>;
}

/// Outbound SMS seam.
pub trait Messaging {
    fn send_sms(&mut self, to: &str, body: &str) -> Result<()>;
}

/// Messaging stub for setups without an SMS transport.
pub struct NullMessaging;

impl Messaging for NullMessaging {
    fn send_sms(&mut self, _to: &str, body: &str) -> Result<()> {
        log_debug(&format!("sms transport not wired, dropping notice: {body}"));
        Ok(())
    }
}

/// Notification statistics, monotonic until the next arming of the monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyStats {
    pub invoked: u32,
    pub taken: u32,
    pub timed_out: u32,
    pub errored: u32,
}

impl NotifyStats {
    /// Summary text the shell shows on deactivation.
    pub fn summary(&self) -> String {
        if self.invoked == 0 {
            return "No notifications took place.".to_string();
        }
        format!(
            "Notifications total: {}\nCalls taken: {}\nUnanswered or timed out: {}",
            self.invoked, self.taken, self.timed_out
        )
    }
}

/// Dispatches one notification attempt at a time and tracks its resolution.
pub struct Notifier {
    contact_name: String,
    contact_number: String,
    contact_display: String,
    script: Option<PathBuf>,
    call_setup: Duration,
    call_hold: Duration,
    send_sms: bool,
    pending: bool,
    stats: NotifyStats,
}

impl Notifier {
    pub fn new(cfg: &MonitorConfig) -> Self {
        Self {
            contact_name: cfg.contact.name.clone(),
            contact_number: cfg.contact.number.clone(),
            contact_display: cfg.contact.display_string(),
            script: cfg.notify_script.clone(),
            call_setup: cfg.call_setup,
            call_hold: cfg.call_hold,
            send_sms: cfg.send_sms,
            pending: false,
            stats: NotifyStats::default(),
        }
    }

    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Whether notification runs a script instead of placing a call.
    pub fn uses_script(&self) -> bool {
        self.script.is_some()
    }

    pub fn stats(&self) -> NotifyStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = NotifyStats::default();
    }

    /// Start a notification episode. Returns whether one is now pending.
    ///
    /// A second request while one is in flight is refused, not queued.
    pub fn notify(
        &mut self,
        tel: &mut dyn TelephonyBackend,
        runner: &mut dyn ProcessRunner,
        timers: &mut TimerSet,
    ) -> bool {
        self.stats.invoked += 1;

        if self.pending {
            self.stats.errored += 1;
            log_debug("notification already pending, denying new request");
            return false;
        }

        let method = if self.script.is_some() { "script" } else { "call" };
        self.pending = match self.script.clone() {
            Some(script) => self.notify_script(runner, &script),
            None => self.notify_call(tel, timers),
        };
        tracing::info!(
            target: "cribcall::notify",
            pending = self.pending,
            method,
            "notification dispatched"
        );
        self.pending
    }

    fn notify_call(&mut self, tel: &mut dyn TelephonyBackend, timers: &mut TimerSet) -> bool {
        if let Err(err) = tel.dial(&self.contact_number) {
            self.stats.errored += 1;
            log_debug(&format!(
                "call initiation to {} failed: {err:#}",
                self.contact_display
            ));
            return false;
        }
        log_debug(&format!("call initiated to {}", self.contact_display));

        // Abort the call if it is not answered in time.
        timers.arm(TimerId::NotifyGuard, self.call_setup);
        true
    }

    fn notify_script(&mut self, runner: &mut dyn ProcessRunner, script: &Path) -> bool {
        let args = vec![self.contact_name.clone(), self.contact_number.clone()];
        match runner.launch(script, &args) {
            Ok(()) => {
                log_debug(&format!("started notify script '{}'", script.display()));
                true
            }
            Err(err) => {
                log_debug(&format!(
                    "failed to start notify script '{}': {err:#}",
                    script.display()
                ));
                false
            }
        }
    }

    /// Call audio came up or went down. Returns true when this resolved the
    /// pending episode.
    pub fn on_call_status(&mut self, established: bool, timers: &mut TimerSet) -> bool {
        // Status updates only matter while a notification is in flight.
        if !self.pending {
            return false;
        }

        if established {
            self.stats.taken += 1;
            log_debug("notification call taken, extending guard timer");
            // The setup guard becomes the hold bound for the live call.
            timers.arm(TimerId::NotifyGuard, self.call_hold);
            false
        } else {
            log_debug("notification call ended");
            timers.cancel(TimerId::NotifyGuard);
            self.pending = false;
            true
        }
    }

    /// The guard timer expired, either unanswered setup or an overlong call.
    /// Returns true when this resolved the pending episode.
    pub fn on_guard_expired(&mut self, tel: &mut dyn TelephonyBackend) -> bool {
        if !self.pending {
            return false;
        }

        self.stats.timed_out += 1;
        log_debug("notification guard timeout, releasing call");
        if let Err(err) = tel.release() {
            log_debug(&format!("call release failed: {err:#}"));
        }
        self.pending = false;
        true
    }

    /// The notify script terminated. Returns true when this resolved the
    /// pending episode.
    pub fn on_script_exited(&mut self, code: i32) -> bool {
        if !self.pending {
            return false;
        }
        log_debug(&format!("notify script exited with code {code}"));
        self.pending = false;
        true
    }

    /// Inform the contact that an incoming call was rejected.
    pub fn notify_missed_call(&mut self, messaging: &mut dyn Messaging, caller: &str) {
        if !self.send_sms {
            return;
        }
        let body = format!("Cribcall: an incoming phone call was rejected: {caller}");
        match messaging.send_sms(&self.contact_number, &body) {
            Ok(()) => log_debug("missed call sms sent"),
            Err(err) => log_debug(&format!("missed call sms failed: {err:#}")),
        }
    }
}
