//! Volume extraction and the time-based alarm counter.
//!
//! Each chunk is reduced with a peak detector rather than an RMS meter: the
//! point is to catch short cries, not to measure averaged ambient loudness.

use crate::config::defaults::COUNTER_SCALE;
use crate::settings::MonitorConfig;

/// Tunables for one analyzer instance.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub amplify: i32,
    /// Counter increment per above-threshold chunk.
    pub increment: i32,
    /// Counter decrement per below-threshold chunk.
    pub decrement: i32,
    pub threshold: i32,
    /// The reported counter clips at this value.
    pub counter_max: i32,
    /// Samples per peak-detection sub-window.
    pub subinterval: usize,
}

impl From<&MonitorConfig> for AnalyzerConfig {
    fn from(cfg: &MonitorConfig) -> Self {
        Self {
            amplify: cfg.audio_amplify,
            increment: cfg.duration_influence,
            decrement: cfg.counter_decrement,
            threshold: cfg.volume_threshold,
            counter_max: cfg.counter_max,
            subinterval: cfg.subinterval,
        }
    }
}

/// One analysis result per processed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioReading {
    /// Debounced alarm counter, already rescaled for reporting.
    pub counter: i32,
    pub volume: i32,
}

/// Turns raw sample chunks into volume readings and maintains the counter.
///
/// The internal counter keeps finer granularity than what is reported; the
/// division by the scale factor keeps the reported value from oscillating at
/// the threshold boundary.
pub struct VolumeAnalyzer {
    cfg: AnalyzerConfig,
    counter: i32,
}

impl VolumeAnalyzer {
    pub fn new(cfg: AnalyzerConfig) -> Self {
        Self { cfg, counter: 0 }
    }

    /// Clear the accumulated counter, used when monitoring re-arms.
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    /// Process one chunk and return the resulting reading.
    ///
    /// The chunk is split into consecutive sub-windows; the positive peak of
    /// each window is summed into an energy value, and the volume is the
    /// amplified logarithm of the energy normalized by the chunk length.
    /// A silent chunk has zero energy, so the logarithm goes to negative
    /// infinity; the cast saturates and the clamp floors the volume at zero.
    pub fn process(&mut self, chunk: &[i16]) -> AudioReading {
        let subinterval = self.cfg.subinterval.max(1);
        let mut energy: u64 = 0;
        for window in chunk.chunks(subinterval) {
            let peak = window.iter().copied().max().unwrap_or(0).max(0);
            energy += peak as u64;
        }

        let volume = if chunk.is_empty() {
            0
        } else {
            let scaled = energy as f64 * subinterval as f64 / chunk.len() as f64;
            let raw = self.cfg.amplify as f64 * scaled.ln();
            (raw as i32).max(0)
        };

        if volume > self.cfg.threshold {
            self.counter += self.cfg.increment;
            let ceiling = self.cfg.counter_max * COUNTER_SCALE;
            if self.counter > ceiling {
                self.counter = ceiling;
            }
        } else {
            self.counter -= self.cfg.decrement;
            if self.counter < 0 {
                self.counter = 0;
            }
        }

        AudioReading {
            counter: self.counter / COUNTER_SCALE,
            volume,
        }
    }

    #[cfg(test)]
    pub(crate) fn internal_counter(&self) -> i32 {
        self.counter
    }
}
