//! Microphone capture via CPAL.
//!
//! The device is negotiated for signed 16-bit mono PCM at 8 kHz. A deviating
//! rate or channel count is tolerated (the dispatcher downmixes and chunk
//! sizes follow the actual rate), but 16-bit sampling is load-bearing for the
//! analyzer's integer math: a device that cannot supply it fails construction
//! instead of running degraded.

use super::dispatch::ChunkDispatcher;
use super::{TARGET_CHANNELS, TARGET_RATE};
use crate::log_debug;
use crate::monitor::ControlEvent;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig, SupportedStreamConfigRange};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Start/stop surface the monitor drives. Implemented by [`MicCapture`] for
/// real hardware and by test doubles elsewhere.
pub trait CaptureControl {
    /// Begin chunk delivery. Returns false on a transient failure; the
    /// caller is expected to retry later.
    fn start(&mut self) -> bool;
    fn stop(&mut self);
    fn is_active(&self) -> bool;
}

/// Audio input device wrapper delivering fixed-duration i16 chunks to the
/// control channel.
pub struct MicCapture {
    device: cpal::Device,
    config: StreamConfig,
    chunk_samples: usize,
    sender: Sender<ControlEvent>,
    dropped: Arc<AtomicUsize>,
    stream: Option<cpal::Stream>,
}

impl MicCapture {
    /// List microphone names so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Open a capture device and negotiate the stream format.
    ///
    /// Fails when no input device is present or when the device cannot
    /// supply 16-bit samples.
    pub fn new(
        preferred_device: Option<&str>,
        sample_interval: Duration,
        sender: Sender<ControlEvent>,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))?
            }
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        let device_name = device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string());

        let ranges = device
            .supported_input_configs()
            .with_context(|| format!("failed to query formats of '{device_name}'"))?;
        let range = pick_16bit_range(ranges).ok_or_else(|| {
            anyhow!("input device '{device_name}' does not support 16-bit capture")
        })?;

        let rate = TARGET_RATE.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
        let channels = range.channels();
        if rate != TARGET_RATE || channels != TARGET_CHANNELS {
            log_debug(&format!(
                "could not get desired audio format, nearest is rate={rate}Hz channels={channels}"
            ));
        }
        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(rate),
            buffer_size: cpal::BufferSize::Default,
        };
        // Chunk length is counted in mono samples after downmixing.
        let chunk_samples =
            ((u64::from(rate) * sample_interval.as_millis() as u64) / 1000).max(1) as usize;

        log_debug(&format!(
            "capture config: device='{device_name}' rate={rate}Hz channels={channels} chunk={chunk_samples} samples"
        ));

        Ok(Self {
            device,
            config,
            chunk_samples,
            sender,
            dropped: Arc::new(AtomicUsize::new(0)),
            stream: None,
        })
    }

    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }

    /// Chunks dropped because the control loop fell behind.
    pub fn dropped_chunks(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl CaptureControl for MicCapture {
    fn start(&mut self) -> bool {
        if self.stream.is_some() {
            log_debug("tried to start audio although already running");
            return true;
        }

        let channels = usize::from(self.config.channels.max(1));
        let mut dispatcher = ChunkDispatcher::new(
            self.chunk_samples,
            self.sender.clone(),
            self.dropped.clone(),
        );
        let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[i16], _| dispatcher.push(data, channels),
            err_fn,
            None,
        );
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                log_debug(&format!("failed to open audio stream: {err}"));
                return false;
            }
        };
        if let Err(err) = stream.play() {
            log_debug(&format!("failed to start audio stream: {err}"));
            return false;
        }

        self.stream = Some(stream);
        true
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                log_debug(&format!("failed to pause audio stream: {err}"));
            }
            drop(stream);
        }
    }

    fn is_active(&self) -> bool {
        self.stream.is_some()
    }
}

/// Prefer the 16-bit range with the fewest channels; mono needs no downmix.
fn pick_16bit_range(
    ranges: impl Iterator<Item = SupportedStreamConfigRange>,
) -> Option<SupportedStreamConfigRange> {
    let mut best: Option<SupportedStreamConfigRange> = None;
    for range in ranges {
        if range.sample_format() != SampleFormat::I16 {
            continue;
        }
        let better = match &best {
            None => true,
            Some(current) => range.channels() < current.channels(),
        };
        if better {
            best = Some(range);
        }
    }
    best
}
