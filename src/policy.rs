//! Victim selection for a full frame table.

use std::fmt;

use rand::Rng;

use crate::memory::{Frame, FrameTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementPolicy {
    /// Uniformly random frame
    Random,
    /// Oldest insertion
    Fifo,
    /// Oldest mapping or write upgrade. Plain reads never refresh a frame, so
    /// this tracks write recency rather than access recency.
    Lru,
}

impl ReplacementPolicy {
    /// Pick the frame to evict. Only called when no frame is free.
    pub fn select_victim<R: Rng>(&self, frames: &FrameTable, rng: &mut R) -> usize {
        match self {
            ReplacementPolicy::Random => rng.random_range(..frames.len()),
            ReplacementPolicy::Fifo => oldest_by(frames, |frame| frame.inserted_at),
            ReplacementPolicy::Lru => oldest_by(frames, |frame| frame.updated_at),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReplacementPolicy::Random => "rand",
            ReplacementPolicy::Fifo => "fifo",
            ReplacementPolicy::Lru => "lru",
        }
    }
}

// Left-to-right scan with strict `<`, so ties go to the lowest index.
fn oldest_by(frames: &FrameTable, key: impl Fn(&Frame) -> u64) -> usize {
    let mut victim = 0;
    let mut oldest = u64::MAX;
    for (idx, frame) in frames.iter().enumerate() {
        let stamp = key(frame);
        if stamp < oldest {
            victim = idx;
            oldest = stamp;
        }
    }
    victim
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
