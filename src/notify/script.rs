//! Non-blocking notify script execution.
//!
//! The script is spawned on a worker thread; the control thread only waits
//! for the bounded start handshake. The exit code comes back later through
//! the control channel, which is how the pending notification resolves.

use super::ProcessRunner;
use crate::log_debug;
use crate::monitor::ControlEvent;
use anyhow::{bail, Context, Result};
use crossbeam_channel::{bounded, Sender};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

pub struct ScriptRunner {
    events: Sender<ControlEvent>,
    start_timeout: Duration,
}

impl ScriptRunner {
    pub fn new(events: Sender<ControlEvent>, start_timeout: Duration) -> Self {
        Self {
            events,
            start_timeout,
        }
    }
}

impl ProcessRunner for ScriptRunner {
    fn launch(&mut self, script: &Path, args: &[String]) -> Result<()> {
        let display = script.display().to_string();
        let script = script.to_path_buf();
        let args = args.to_vec();
        let events = self.events.clone();
        let (started_tx, started_rx) = bounded(1);

        thread::spawn(move || {
            match Command::new(&script)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
            {
                Ok(mut child) => {
                    let _ = started_tx.send(Ok(()));
                    let code = match child.wait() {
                        Ok(status) => status.code().unwrap_or(-1),
                        Err(err) => {
                            log_debug(&format!("waiting on notify script failed: {err}"));
                            -1
                        }
                    };
                    let _ = events.send(ControlEvent::ScriptExited(code));
                }
                Err(err) => {
                    let _ = started_tx.send(Err(err));
                }
            }
        });

        match started_rx.recv_timeout(self.start_timeout) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                Err(err).with_context(|| format!("failed to start notify script '{display}'"))
            }
            Err(_) => bail!(
                "notify script '{display}' did not start within {:?}",
                self.start_timeout
            ),
        }
    }
}
