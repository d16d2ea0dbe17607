use super::*;
use crate::settings::Settings;
use anyhow::{anyhow, Result};
use crossbeam_channel::unbounded;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Clone, Default)]
struct CaptureProbe {
    active: Rc<Cell<bool>>,
    starts: Rc<Cell<u32>>,
    stops: Rc<Cell<u32>>,
    /// Number of upcoming start attempts that should fail.
    fail_starts: Rc<Cell<u32>>,
}

struct TestCapture {
    probe: CaptureProbe,
}

impl CaptureControl for TestCapture {
    fn start(&mut self) -> bool {
        if self.probe.fail_starts.get() > 0 {
            self.probe.fail_starts.set(self.probe.fail_starts.get() - 1);
            return false;
        }
        self.probe.starts.set(self.probe.starts.get() + 1);
        self.probe.active.set(true);
        true
    }

    fn stop(&mut self) {
        self.probe.stops.set(self.probe.stops.get() + 1);
        self.probe.active.set(false);
    }

    fn is_active(&self) -> bool {
        self.probe.active.get()
    }
}

#[derive(Clone, Default)]
struct TelProbe {
    dials: Rc<RefCell<Vec<String>>>,
    answers: Rc<Cell<u32>>,
    releases: Rc<Cell<u32>>,
    fail_dial: Rc<Cell<bool>>,
}

struct TestTel {
    probe: TelProbe,
}

impl crate::telephony::TelephonyBackend for TestTel {
    fn dial(&mut self, number: &str) -> Result<()> {
        if self.probe.fail_dial.get() {
            return Err(anyhow!("dial rejected"));
        }
        self.probe.dials.borrow_mut().push(number.to_string());
        Ok(())
    }

    fn answer(&mut self) -> Result<()> {
        self.probe.answers.set(self.probe.answers.get() + 1);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.probe.releases.set(self.probe.releases.get() + 1);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RunnerProbe {
    launches: Rc<RefCell<Vec<(PathBuf, Vec<String>)>>>,
}

struct TestRunner {
    probe: RunnerProbe,
}

impl ProcessRunner for TestRunner {
    fn launch(&mut self, script: &Path, args: &[String]) -> Result<()> {
        self.probe
            .launches
            .borrow_mut()
            .push((script.to_path_buf(), args.to_vec()));
        Ok(())
    }
}

#[derive(Clone, Default)]
struct SmsProbe {
    sent: Rc<RefCell<Vec<(String, String)>>>,
}

struct TestMessaging {
    probe: SmsProbe,
}

impl Messaging for TestMessaging {
    fn send_sms(&mut self, to: &str, body: &str) -> Result<()> {
        self.probe
            .sent
            .borrow_mut()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

const CONTACT: &str = "+43123456789";

struct Harness {
    monitor: Monitor,
    signals: crossbeam_channel::Receiver<Signal>,
    capture: CaptureProbe,
    tel: TelProbe,
    runner: RunnerProbe,
    sms: SmsProbe,
}

impl Harness {
    fn new(adjust: impl FnOnce(&mut Settings)) -> Self {
        let mut settings = Settings::default();
        settings.contact_number = CONTACT.to_string();
        // One loud chunk saturates the counter past the threshold, keeping
        // tests short.
        settings.duration_influence = 600;
        adjust(&mut settings);
        let cfg = settings.monitor_config();

        let capture = CaptureProbe::default();
        let tel = TelProbe::default();
        let runner = RunnerProbe::default();
        let sms = SmsProbe::default();
        let (signal_tx, signal_rx) = unbounded();
        let monitor = Monitor::new(
            cfg,
            Box::new(TestCapture {
                probe: capture.clone(),
            }),
            Box::new(TestTel { probe: tel.clone() }),
            Box::new(TestRunner {
                probe: runner.clone(),
            }),
            Box::new(TestMessaging { probe: sms.clone() }),
            signal_tx,
        );
        Self {
            monitor,
            signals: signal_rx,
            capture,
            tel,
            runner,
            sms,
        }
    }

    fn drain_signals(&self) -> Vec<Signal> {
        self.signals.try_iter().collect()
    }

    /// Fire an armed timer the way the run loop would: remove the deadline,
    /// then handle the expiry.
    fn fire(&mut self, id: TimerId) {
        assert!(self.monitor.timers.is_armed(id), "timer {id:?} not armed");
        self.monitor.timers.cancel(id);
        self.monitor.handle_timer(id);
    }

    fn arm_to_on(&mut self) {
        self.monitor.handle_event(ControlEvent::Activate);
        self.fire(TimerId::Activation);
        assert_eq!(self.monitor.state(), MonitorState::On);
        self.drain_signals();
    }

    fn loud_chunk(&self) -> ControlEvent {
        ControlEvent::AudioChunk(vec![20_000; 6_400])
    }
}

#[test]
fn activation_with_invalid_number_is_rejected() {
    let mut h = Harness::new(|settings| settings.contact_number.clear());
    h.monitor.handle_event(ControlEvent::Activate);
    assert_eq!(h.monitor.state(), MonitorState::Off);
    assert!(!h.monitor.timers.is_armed(TimerId::Activation));
    assert!(h
        .drain_signals()
        .contains(&Signal::ActivationRejected));
}

#[test]
fn activation_reaches_on_after_the_delay() {
    let mut h = Harness::new(|_| {});
    assert_eq!(h.capture.starts.get(), 1, "capture runs from construction");

    h.monitor.handle_event(ControlEvent::Activate);
    assert_eq!(h.monitor.state(), MonitorState::Waiting);
    h.fire(TimerId::Activation);
    assert_eq!(h.monitor.state(), MonitorState::On);
}

#[test]
fn audio_chunks_always_report_levels() {
    let mut h = Harness::new(|_| {});
    h.monitor
        .handle_event(ControlEvent::AudioChunk(vec![0; 6_400]));
    let signals = h.drain_signals();
    assert_eq!(
        signals,
        vec![Signal::AudioLevel {
            counter: 0,
            volume: 0
        }]
    );
}

#[test]
fn silence_never_triggers_while_armed() {
    let mut h = Harness::new(|_| {});
    h.arm_to_on();
    for _ in 0..50 {
        h.monitor
            .handle_event(ControlEvent::AudioChunk(vec![0; 6_400]));
    }
    assert!(h.tel.dials.borrow().is_empty());
    assert!(!h.monitor.notification_pending());
}

#[test]
fn threshold_crossing_notifies_exactly_once_and_defers_suspension() {
    let mut h = Harness::new(|_| {});
    h.arm_to_on();

    let chunk = h.loud_chunk();
    h.monitor.handle_event(chunk);

    assert_eq!(*h.tel.dials.borrow(), vec![CONTACT.to_string()]);
    assert!(h.monitor.notification_pending());
    assert_eq!(h.monitor.state(), MonitorState::On);
    // The stop is deferred to the next loop turn, never executed inline.
    assert!(h.capture.active.get());
    assert_eq!(h.capture.stops.get(), 0);
    assert!(h.monitor.timers.is_armed(TimerId::SuspendCapture));
    assert!(h.drain_signals().contains(&Signal::CallStatus {
        finished: false,
        self_initiated: true
    }));

    h.fire(TimerId::SuspendCapture);
    assert!(!h.capture.active.get());
    assert_eq!(h.capture.stops.get(), 1);

    // Further loud audio is ignored while the episode is pending.
    let chunk = h.loud_chunk();
    h.monitor.handle_event(chunk);
    assert_eq!(h.tel.dials.borrow().len(), 1);
    assert_eq!(h.monitor.stats().invoked, 1);
}

#[test]
fn threshold_crossing_is_ignored_while_a_call_is_active() {
    let mut h = Harness::new(|_| {});
    h.arm_to_on();
    h.monitor
        .handle_event(ControlEvent::Telephony(TelephonyEvent::AudioConnect {
            uplink: true,
            downlink: true,
        }));

    let chunk = h.loud_chunk();
    h.monitor.handle_event(chunk);
    assert!(h.tel.dials.borrow().is_empty());
}

#[test]
fn failed_dial_surfaces_an_error_without_state_change() {
    let mut h = Harness::new(|_| {});
    h.arm_to_on();
    h.tel.fail_dial.set(true);

    let chunk = h.loud_chunk();
    h.monitor.handle_event(chunk);

    assert!(!h.monitor.notification_pending());
    assert_eq!(h.monitor.state(), MonitorState::On);
    assert!(h.capture.active.get());
    assert!(h.drain_signals().contains(&Signal::NotifyError));
}

#[test]
fn notification_call_lifecycle_rearms_through_waiting() {
    let mut h = Harness::new(|_| {});
    h.arm_to_on();
    let chunk = h.loud_chunk();
    h.monitor.handle_event(chunk);
    h.fire(TimerId::SuspendCapture);
    h.drain_signals();

    // The contact answers, talks, then hangs up.
    h.monitor
        .handle_event(ControlEvent::Telephony(TelephonyEvent::AudioConnect {
            uplink: true,
            downlink: true,
        }));
    assert_eq!(h.monitor.stats().taken, 1);
    h.monitor
        .handle_event(ControlEvent::Telephony(TelephonyEvent::AudioConnect {
            uplink: false,
            downlink: false,
        }));
    h.monitor
        .handle_event(ControlEvent::Telephony(TelephonyEvent::Status(
            crate::telephony::STATUS_TERMINATED,
        )));

    assert_eq!(h.monitor.state(), MonitorState::Waiting);
    assert!(h.monitor.timers.is_armed(TimerId::Activation));
    assert!(h.monitor.timers.is_armed(TimerId::Resume));
    assert!(h.drain_signals().contains(&Signal::CallStatus {
        finished: true,
        self_initiated: true
    }));

    // Resume delay elapses: capture restarts and the episode is closed.
    h.fire(TimerId::Resume);
    assert!(!h.monitor.notification_pending());
    assert!(h.capture.active.get());
    assert!(h.drain_signals().contains(&Signal::MonitoringResumed));

    // Recall delay elapses: monitoring is live again.
    h.fire(TimerId::Activation);
    assert_eq!(h.monitor.state(), MonitorState::On);
}

#[test]
fn setup_timeout_drops_the_call_and_finishes_once() {
    let mut h = Harness::new(|_| {});
    h.arm_to_on();
    let chunk = h.loud_chunk();
    h.monitor.handle_event(chunk);
    h.fire(TimerId::SuspendCapture);

    h.fire(TimerId::NotifyGuard);
    assert_eq!(h.monitor.stats().timed_out, 1);
    assert_eq!(h.tel.releases.get(), 1);

    // The released call still reports its termination, which re-arms.
    h.monitor
        .handle_event(ControlEvent::Telephony(TelephonyEvent::Status(
            crate::telephony::STATUS_TERMINATED,
        )));
    assert_eq!(h.monitor.state(), MonitorState::Waiting);
    h.fire(TimerId::Resume);
    assert!(!h.monitor.notification_pending());
    assert!(h.capture.active.get());
}

#[test]
fn incoming_contact_call_is_answered_not_dropped() {
    let mut h = Harness::new(|settings| settings.send_sms = true);
    h.arm_to_on();

    h.monitor
        .handle_event(ControlEvent::Telephony(TelephonyEvent::Incoming {
            caller: CONTACT.to_string(),
        }));

    // Capture stops immediately; the event source is external.
    assert!(!h.capture.active.get());
    assert_eq!(h.capture.stops.get(), 1);
    assert!(h.monitor.notification_pending());
    assert_eq!(h.tel.releases.get(), 0, "contact call must not be dropped");
    assert!(h.sms.sent.borrow().is_empty(), "no missed-call notice");
    assert!(h.drain_signals().contains(&Signal::CallStatus {
        finished: false,
        self_initiated: false
    }));

    // The deferred answer goes out once the call is answerable.
    h.monitor
        .handle_event(ControlEvent::Telephony(TelephonyEvent::Status(
            crate::telephony::STATUS_ALERTING,
        )));
    assert_eq!(h.tel.answers.get(), 1);
    assert!(h.monitor.timers.is_armed(TimerId::CallHold));
}

#[test]
fn incoming_foreign_call_is_dropped_with_notice() {
    let mut h = Harness::new(|settings| settings.send_sms = true);
    h.arm_to_on();

    h.monitor
        .handle_event(ControlEvent::Telephony(TelephonyEvent::Incoming {
            caller: "0664000111".to_string(),
        }));

    assert_eq!(h.tel.releases.get(), 1);
    assert!(!h.monitor.notification_pending());
    let sent = h.sms.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, CONTACT);
    assert!(sent[0].1.contains("0664000111"));
}

#[test]
fn incoming_call_with_handling_disabled_only_sends_notice() {
    let mut h = Harness::new(|settings| {
        settings.handle_incoming_calls = false;
        settings.send_sms = true;
    });
    h.arm_to_on();

    h.monitor
        .handle_event(ControlEvent::Telephony(TelephonyEvent::Incoming {
            caller: CONTACT.to_string(),
        }));

    assert_eq!(h.tel.releases.get(), 0);
    assert_eq!(h.tel.answers.get(), 0);
    assert_eq!(h.sms.sent.borrow().len(), 1);
    assert!(!h.monitor.notification_pending());
}

#[test]
fn incoming_call_while_off_stops_capture_and_nothing_else() {
    let mut h = Harness::new(|settings| settings.send_sms = true);

    h.monitor
        .handle_event(ControlEvent::Telephony(TelephonyEvent::Incoming {
            caller: "0664000111".to_string(),
        }));

    assert!(!h.capture.active.get());
    assert_eq!(h.tel.releases.get(), 0);
    assert!(h.sms.sent.borrow().is_empty());

    // The foreign call ends; capture comes back after the resume wait.
    h.monitor
        .handle_event(ControlEvent::Telephony(TelephonyEvent::Status(
            crate::telephony::STATUS_TERMINATED,
        )));
    h.fire(TimerId::Resume);
    assert!(h.capture.active.get());
}

#[test]
fn script_notification_resolves_via_script_exit() {
    let script = PathBuf::from("/usr/local/bin/alert.sh");
    let script_for_settings = script.clone();
    let mut h = Harness::new(move |settings| settings.notify_script = Some(script_for_settings));
    h.arm_to_on();

    let chunk = h.loud_chunk();
    h.monitor.handle_event(chunk);
    {
        let launches = h.runner.launches.borrow();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].0, script);
        assert_eq!(launches[0].1[1], CONTACT);
    }
    assert!(h.tel.dials.borrow().is_empty());
    h.fire(TimerId::SuspendCapture);
    h.drain_signals();

    // Script completion substitutes for the missing telephony lifecycle.
    h.monitor.handle_event(ControlEvent::ScriptExited(0));
    assert_eq!(h.monitor.state(), MonitorState::Waiting);
    assert!(h.monitor.timers.is_armed(TimerId::Resume));
    assert!(h.drain_signals().contains(&Signal::CallStatus {
        finished: true,
        self_initiated: true
    }));

    h.fire(TimerId::Resume);
    assert!(!h.monitor.notification_pending());
    assert!(h.capture.active.get());
}

#[test]
fn deactivation_cancels_rearm_and_surfaces_statistics() {
    let mut h = Harness::new(|_| {});
    h.arm_to_on();
    h.monitor.handle_event(ControlEvent::Deactivate);
    assert_eq!(h.monitor.state(), MonitorState::Off);
    assert!(!h.monitor.timers.is_armed(TimerId::Activation));
    let signals = h.drain_signals();
    assert!(signals
        .iter()
        .any(|signal| matches!(signal, Signal::Statistics(_))));
}

#[test]
fn statistics_reset_on_each_arming_cycle() {
    let mut h = Harness::new(|_| {});
    h.arm_to_on();
    let chunk = h.loud_chunk();
    h.monitor.handle_event(chunk);
    assert_eq!(h.monitor.stats().invoked, 1);

    h.monitor.handle_event(ControlEvent::Deactivate);
    h.monitor.handle_event(ControlEvent::Activate);
    assert_eq!(h.monitor.stats().invoked, 0);
}

#[test]
fn failed_capture_start_retries_on_backoff() {
    let mut h = Harness::new(|_| {});
    h.capture.fail_starts.set(1);
    // Drive a restart cycle against the failing device.
    h.monitor.handle_timer(TimerId::Resume);
    assert!(h.monitor.timers.is_armed(TimerId::AudioRetry));

    h.fire(TimerId::AudioRetry);
    assert!(h.capture.active.get());
    assert!(!h.monitor.timers.is_armed(TimerId::AudioRetry));
}

#[test]
fn shutdown_event_stops_the_loop() {
    let mut h = Harness::new(|_| {});
    assert!(h.monitor.handle_event(ControlEvent::Activate));
    assert!(!h.monitor.handle_event(ControlEvent::Shutdown));
}
