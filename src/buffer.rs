use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_QUEUE_FRAMES: usize = 4;

/// Bounded hand-off between the capture callback and the processing loop.
/// Pushing never blocks: when full, the oldest frame is discarded.
pub struct FrameQueue {
    frames: ArrayQueue<Vec<f32>>,
    dropped: AtomicU64,
}

impl FrameQueue {
    pub fn new(cap: usize) -> Self {
        Self {
            frames: ArrayQueue::new(cap.max(1)),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn push(&self, frame: Vec<f32>) {
        if self.frames.force_push(frame).is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn pop(&self) -> Option<Vec<f32>> {
        self.frames.pop()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Callback-side accumulator: down-mixes interleaved samples to mono and
/// cuts them into fixed-length frames.
pub struct FrameAssembler {
    frame_len: usize,
    channels: usize,
    pending: Vec<f32>,
}

impl FrameAssembler {
    pub fn new(frame_len: usize, channels: usize) -> Self {
        let frame_len = frame_len.max(1);
        Self {
            frame_len,
            channels: channels.max(1),
            pending: Vec::with_capacity(frame_len),
        }
    }

    pub fn push_interleaved<I>(&mut self, samples: I, queue: &FrameQueue)
    where
        I: IntoIterator<Item = f32>,
    {
        let mut acc = 0.0f32;
        let mut n = 0usize;
        for s in samples {
            acc += s;
            n += 1;
            if n == self.channels {
                self.pending.push(acc / self.channels as f32);
                acc = 0.0;
                n = 0;
                if self.pending.len() == self.frame_len {
                    let frame = std::mem::replace(
                        &mut self.pending,
                        Vec::with_capacity(self.frame_len),
                    );
                    queue.push(frame);
                }
            }
        }
    }
}
