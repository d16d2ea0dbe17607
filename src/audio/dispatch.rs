use crate::monitor::ControlEvent;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Downmix interleaved multi-channel input to mono so the analyzer sees a
/// single channel regardless of the microphone layout.
pub(super) fn append_mono_samples(buf: &mut Vec<i16>, data: &[i16], channels: usize) {
    if channels <= 1 {
        buf.extend_from_slice(data);
        return;
    }

    // Average each interleaved frame to produce a mono representation.
    let mut acc = 0i32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += i32::from(sample);
        count += 1;
        if count == channels {
            buf.push((acc / channels as i32) as i16);
            acc = 0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push((acc / count as i32) as i16);
    }
}

/// Accumulates capture-callback deliveries into fixed-duration chunks and
/// marshals them onto the control channel.
///
/// Runs inside the CPAL callback, so it must never block: a full channel
/// drops the chunk and bumps the shared counter instead.
pub(super) struct ChunkDispatcher {
    chunk_samples: usize,
    pending: Vec<i16>,
    scratch: Vec<i16>,
    sender: Sender<ControlEvent>,
    dropped: Arc<AtomicUsize>,
}

impl ChunkDispatcher {
    pub(super) fn new(
        chunk_samples: usize,
        sender: Sender<ControlEvent>,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            chunk_samples: chunk_samples.max(1),
            pending: Vec::with_capacity(chunk_samples),
            scratch: Vec::new(),
            sender,
            dropped,
        }
    }

    pub(super) fn push(&mut self, data: &[i16], channels: usize) {
        self.scratch.clear();
        append_mono_samples(&mut self.scratch, data, channels);
        self.pending.extend_from_slice(&self.scratch);

        while self.pending.len() >= self.chunk_samples {
            let chunk: Vec<i16> = self.pending.drain(..self.chunk_samples).collect();
            if let Err(err) = self.sender.try_send(ControlEvent::AudioChunk(chunk)) {
                match err {
                    TrySendError::Full(_) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    TrySendError::Disconnected(_) => break,
                }
            }
        }
    }
}
