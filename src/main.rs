//! Headless shell for the cribcall engine.
//!
//! Wires the microphone to the control loop, bridges stdin commands (`on`,
//! `off`, `quit`) into control events, and prints engine signals line by
//! line. The telephony transport is the null backend until a platform
//! adapter feeds real events in.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, unbounded, Sender};
use cribcall::audio::MicCapture;
use cribcall::config::defaults::EVENT_CHANNEL_CAPACITY;
use cribcall::config::AppConfig;
use cribcall::monitor::{ControlEvent, Monitor, Signal};
use cribcall::notify::{NullMessaging, ScriptRunner};
use cribcall::settings::Settings;
use cribcall::telephony::NullBackend;
use cribcall::{init_logging, init_tracing, log_debug, log_panic};
use std::io::BufRead;
use std::thread;

fn main() {
    let config = match AppConfig::parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    };

    init_logging(&config);
    init_tracing(&config);
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log_panic(info);
        default_hook(info);
    }));

    if let Err(err) = run(config) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(config: AppConfig) -> Result<()> {
    if config.list_input_devices {
        let devices = MicCapture::list_devices().context("failed to list audio input devices")?;
        println!("audio input devices: {}", devices.len());
        for name in devices {
            println!("{name}");
        }
        return Ok(());
    }

    let settings_path = config
        .settings
        .clone()
        .unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load(&settings_path)?;
    config.apply_to(&mut settings);
    let monitor_cfg = settings.monitor_config();

    let (event_tx, event_rx) = bounded(EVENT_CHANNEL_CAPACITY);
    let (signal_tx, signal_rx) = unbounded();

    // 16-bit capture negotiation is a hard requirement; refuse to start in a
    // degraded mode.
    let capture = MicCapture::new(
        config.input_device.as_deref(),
        monitor_cfg.sample_interval,
        event_tx.clone(),
    )?;
    log_debug(&format!("using input device '{}'", capture.device_name()));

    let runner = ScriptRunner::new(event_tx.clone(), monitor_cfg.script_start_timeout);
    let mut monitor = Monitor::new(
        monitor_cfg,
        Box::new(capture),
        Box::new(NullBackend),
        Box::new(runner),
        Box::new(NullMessaging),
        signal_tx,
    );

    spawn_command_reader(event_tx.clone());
    let printer = thread::spawn(move || {
        for signal in signal_rx {
            print_signal(&signal);
        }
    });

    if config.activate {
        let _ = event_tx.send(ControlEvent::Activate);
    }

    monitor.run(&event_rx);

    settings.save(&settings_path)?;
    log_debug("settings saved, exiting");
    drop(monitor);
    let _ = printer.join();
    Ok(())
}

/// Forward stdin commands into the control loop. EOF shuts the engine down
/// so settings still get written.
fn spawn_command_reader(events: Sender<ControlEvent>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let command = line.trim().to_ascii_lowercase();
            let event = match command.as_str() {
                "" => continue,
                "on" => ControlEvent::Activate,
                "off" => ControlEvent::Deactivate,
                "q" | "quit" | "exit" => ControlEvent::Shutdown,
                other => {
                    eprintln!("unknown command '{other}' (try on, off, quit)");
                    continue;
                }
            };
            let stop = event == ControlEvent::Shutdown;
            if events.send(event).is_err() || stop {
                return;
            }
        }
        let _ = events.send(ControlEvent::Shutdown);
    });
}

fn print_signal(signal: &Signal) {
    match signal {
        Signal::AudioLevel { counter, volume } => {
            println!("level counter={counter} volume={volume}");
        }
        Signal::CallStatus {
            finished,
            self_initiated,
        } => {
            println!("call finished={finished} self_initiated={self_initiated}");
        }
        Signal::NotifyError => println!("notification failed"),
        Signal::ActivationRejected => {
            println!("cannot arm: no valid contact number configured");
        }
        Signal::MonitoringResumed => println!("monitoring resumed"),
        Signal::Statistics(text) => println!("{text}"),
    }
}
