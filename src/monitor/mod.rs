//! The top-level monitoring state machine and its control loop.
//!
//! All mutable engine state (analyzer counter, call flags, notification
//! pending, timers) is owned by one [`Monitor`] instance driven from a single
//! thread. External happenings arrive as [`ControlEvent`]s; timer firings are
//! folded in between events. The monitor sequences
//! detect, suspend capture, notify, wait, resume
//! without ever blocking the control thread.

mod events;

pub use events::{ControlEvent, Signal};

use crate::audio::{AnalyzerConfig, CaptureControl, VolumeAnalyzer};
use crate::log_debug;
use crate::notify::{Messaging, Notifier, NotifyStats, ProcessRunner};
use crate::settings::MonitorConfig;
use crate::telephony::{CallEvent, CallTracker, TelephonyBackend, TelephonyEvent};
use crate::timer::{TimerId, TimerSet};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// Arming state of the monitor. Audio capture runs in every state; only `On`
/// turns counter threshold crossings into notifications. An active
/// notification episode is tracked by a separate pending flag, not a state,
/// because audio conceptually keeps being monitored while its triggers are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Off,
    /// Armed, waiting for the activation delay to elapse.
    Waiting,
    On,
}

pub struct Monitor {
    cfg: MonitorConfig,
    state: MonitorState,
    /// An alert call or notify script is in flight; audio triggers are
    /// ignored until the episode resolves and the resume delay passes.
    notification_pending: bool,
    analyzer: VolumeAnalyzer,
    tracker: CallTracker,
    notifier: Notifier,
    timers: TimerSet,
    capture: Box<dyn CaptureControl>,
    tel: Box<dyn TelephonyBackend>,
    runner: Box<dyn ProcessRunner>,
    messaging: Box<dyn Messaging>,
    signals: Sender<Signal>,
}

impl Monitor {
    /// Wire up the engine and start audio capture right away; the level
    /// display is live even while the monitor is off.
    pub fn new(
        cfg: MonitorConfig,
        capture: Box<dyn CaptureControl>,
        tel: Box<dyn TelephonyBackend>,
        runner: Box<dyn ProcessRunner>,
        messaging: Box<dyn Messaging>,
        signals: Sender<Signal>,
    ) -> Self {
        let analyzer = VolumeAnalyzer::new(AnalyzerConfig::from(&cfg));
        let tracker = CallTracker::new(cfg.call_hold);
        let notifier = Notifier::new(&cfg);
        let mut monitor = Self {
            cfg,
            state: MonitorState::Off,
            notification_pending: false,
            analyzer,
            tracker,
            notifier,
            timers: TimerSet::new(),
            capture,
            tel,
            runner,
            messaging,
            signals,
        };
        monitor.start_capture();
        monitor
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn notification_pending(&self) -> bool {
        self.notification_pending
    }

    pub fn stats(&self) -> NotifyStats {
        self.notifier.stats()
    }

    /// Run the control loop until shutdown or until every event source hung
    /// up. Sleeps only until the nearest timer deadline.
    pub fn run(&mut self, events: &Receiver<ControlEvent>) {
        loop {
            let now = Instant::now();
            while let Some(id) = self.timers.pop_expired(now) {
                self.handle_timer(id);
            }

            let event = match self.timers.next_deadline() {
                Some(deadline) => {
                    let timeout = deadline.saturating_duration_since(Instant::now());
                    match events.recv_timeout(timeout) {
                        Ok(event) => event,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
                None => match events.recv() {
                    Ok(event) => event,
                    Err(_) => return,
                },
            };

            if !self.handle_event(event) {
                return;
            }
        }
    }

    /// Process one event. Returns false when the loop should stop.
    pub fn handle_event(&mut self, event: ControlEvent) -> bool {
        match event {
            ControlEvent::AudioChunk(chunk) => self.on_audio_chunk(&chunk),
            ControlEvent::Telephony(TelephonyEvent::Incoming { caller }) => {
                self.on_incoming_call(&caller);
            }
            ControlEvent::Telephony(TelephonyEvent::Status(code)) => {
                let derived = self
                    .tracker
                    .on_status(code, self.tel.as_mut(), &mut self.timers);
                self.process_call_events(derived);
            }
            ControlEvent::Telephony(TelephonyEvent::AudioConnect { uplink, downlink }) => {
                let derived = self
                    .tracker
                    .on_audio_connect(uplink, downlink, &mut self.timers);
                self.process_call_events(derived);
            }
            ControlEvent::ScriptExited(code) => {
                if self.notifier.on_script_exited(code) {
                    self.notify_finished();
                }
            }
            ControlEvent::Activate => self.on_activate(),
            ControlEvent::Deactivate => self.on_deactivate(),
            ControlEvent::Shutdown => return false,
        }
        true
    }

    /// Process one expired timer.
    pub fn handle_timer(&mut self, id: TimerId) {
        match id {
            TimerId::Activation => {
                if self.state == MonitorState::Waiting {
                    self.set_state(MonitorState::On);
                }
            }
            TimerId::Resume => self.resume_monitoring(),
            TimerId::NotifyGuard => {
                if self.notifier.on_guard_expired(self.tel.as_mut()) {
                    self.notify_finished();
                }
            }
            TimerId::CallHold => {
                let derived = self.tracker.on_hold_expired(self.tel.as_mut());
                self.process_call_events(derived);
            }
            TimerId::AudioRetry => self.start_capture(),
            TimerId::SuspendCapture => {
                log_debug("stop audio capturing");
                self.capture.stop();
            }
        }
    }

    fn set_state(&mut self, state: MonitorState) {
        if state == self.state {
            log_debug("application state switch to current state");
        }
        // Fresh statistics for every arming cycle.
        if self.state == MonitorState::Off {
            self.notifier.reset_stats();
        }
        log_debug(&format!("new application state: {state:?}"));
        tracing::info!(target: "cribcall::monitor", state = ?state, "state change");
        self.state = state;
    }

    /// Arm the monitor. Requires a syntactically valid contact number.
    fn on_activate(&mut self) {
        // A stale activation countdown must not outlive this decision.
        self.timers.cancel(TimerId::Activation);

        if self.state != MonitorState::Off {
            log_debug("activation requested but monitor is already armed");
            return;
        }
        if !self.cfg.contact.has_valid_number() {
            log_debug("no valid contact number set, refusing activation");
            self.send(Signal::ActivationRejected);
            return;
        }

        self.set_state(MonitorState::Waiting);
        self.timers.arm(TimerId::Activation, self.cfg.activation_delay);
    }

    fn on_deactivate(&mut self) {
        self.timers.cancel(TimerId::Activation);

        if self.state == MonitorState::Off {
            log_debug("deactivation requested but monitor is off");
            return;
        }
        self.set_state(MonitorState::Off);

        if self.cfg.show_statistics {
            self.send(Signal::Statistics(self.notifier.stats().summary()));
        }
    }

    /// Threshold check on every analysis reading; initiates a notification
    /// when sustained noise is detected.
    fn on_audio_chunk(&mut self, chunk: &[i16]) {
        let reading = self.analyzer.process(chunk);
        self.send(Signal::AudioLevel {
            counter: reading.counter,
            volume: reading.volume,
        });

        let triggered = self.state == MonitorState::On
            && reading.counter > self.cfg.volume_threshold
            && !self.tracker.call_active()
            && !self.notification_pending;
        if !triggered {
            return;
        }

        log_debug("audio threshold reached, notifying contact");
        self.analyzer.reset();

        if self
            .notifier
            .notify(self.tel.as_mut(), self.runner.as_mut(), &mut self.timers)
        {
            self.notification_pending = true;
            // The capture subsystem cannot be stopped from within its own
            // data-delivery path; defer the stop to the next loop turn.
            self.timers.arm(TimerId::SuspendCapture, Duration::ZERO);
            self.send(Signal::CallStatus {
                finished: false,
                self_initiated: true,
            });
        } else {
            self.send(Signal::NotifyError);
        }
    }

    /// An incoming call arrived. Capture stops in every state so the voice
    /// path is free, also for manually taken calls; this handler runs from
    /// the telephony side, not the capture path, so no deferral is needed.
    fn on_incoming_call(&mut self, caller: &str) {
        log_debug("stop audio capturing");
        crate::log_debug_content(&format!("incoming call from {caller}"));
        self.capture.stop();

        let derived = self.tracker.on_incoming(caller);
        self.process_call_events(derived);
    }

    fn call_received(&mut self, caller: &str) {
        // Calls only get handled while the monitor is armed.
        if self.state == MonitorState::Off {
            return;
        }

        if !self.cfg.handle_incoming_calls {
            // Call handling is inactive; still signal the event.
            self.notifier
                .notify_missed_call(self.messaging.as_mut(), caller);
            return;
        }

        if self.cfg.contact.matches(caller) && !self.tracker.call_active() {
            // The contact is checking in; treat it like a self-initiated
            // notification call.
            self.notification_pending = true;
            self.tracker.request_take();
            self.send(Signal::CallStatus {
                finished: false,
                self_initiated: false,
            });
        } else if self.tracker.drop_call(self.tel.as_mut()) {
            self.notifier
                .notify_missed_call(self.messaging.as_mut(), caller);
        }
    }

    /// A call reached its terminal status. Start the resume wait and, for
    /// notification episodes, schedule the re-activation pause.
    fn call_finished(&mut self) {
        self.timers.arm(TimerId::Resume, self.cfg.resume_delay);
        self.send(Signal::CallStatus {
            finished: true,
            self_initiated: self.notification_pending,
        });

        if self.notification_pending && self.state != MonitorState::Off {
            self.set_state(MonitorState::Waiting);
            self.timers.arm(TimerId::Activation, self.cfg.recall_delay);
        }
    }

    /// The notifier resolved its episode. Script notifications produce no
    /// telephony lifecycle, so the re-arm path runs from here instead.
    fn notify_finished(&mut self) {
        tracing::info!(target: "cribcall::notify", "notification finished");
        if self.notifier.uses_script() {
            self.call_finished();
        }
    }

    fn process_call_events(&mut self, derived: Vec<CallEvent>) {
        for event in derived {
            match event {
                CallEvent::Received(caller) => self.call_received(&caller),
                CallEvent::Finished => self.call_finished(),
                CallEvent::Established(established) => {
                    if self.notifier.on_call_status(established, &mut self.timers) {
                        self.notify_finished();
                    }
                }
                CallEvent::SelfCallFinished => {
                    log_debug("self-initiated call finished");
                }
            }
        }
    }

    /// The resume wait after a call ended: clear the episode, forget the
    /// accumulated noise evidence, and restart capture.
    fn resume_monitoring(&mut self) {
        self.notification_pending = false;
        self.analyzer.reset();
        self.start_capture();
        self.send(Signal::MonitoringResumed);
    }

    /// Start capture; transient failures retry on a fixed backoff forever.
    fn start_capture(&mut self) {
        log_debug("start audio capturing");
        if !self.capture.start() {
            log_debug("starting audio capture failed, retrying later");
            self.timers.arm(TimerId::AudioRetry, self.cfg.audio_retry);
        }
    }

    fn send(&self, signal: Signal) {
        // A departed shell must not stall the engine.
        let _ = self.signals.send(signal);
    }
}

#[cfg(test)]
mod tests;
