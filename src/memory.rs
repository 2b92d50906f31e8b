use std::fmt;

use crate::constants::*;

/// Byte-addressed physical memory, `nframes` page-sized frames laid out back to back
pub struct PhysicalMemory {
    data: Box<[u8]>,
    nframes: usize,
}

impl PhysicalMemory {
    /// Create a new physical memory initialized to all zeros
    pub fn new(nframes: usize) -> Self {
        let data = vec![0u8; nframes * PAGE_SIZE].into_boxed_slice();
        PhysicalMemory { data, nframes }
    }

    pub fn nframes(&self) -> usize {
        self.nframes
    }

    /// Read a byte from physical memory
    #[inline]
    pub fn read(&self, address: usize) -> u8 {
        self.data[address]
    }

    /// Write a byte to physical memory
    #[inline]
    pub fn write(&mut self, address: usize, value: u8) {
        self.data[address] = value;
    }

    /// Calculate the starting address of a frame
    #[inline]
    pub fn frame_to_address(frame: usize) -> usize {
        frame * PAGE_SIZE
    }

    /// The page-sized region backing `frame`
    pub fn frame(&self, frame: usize) -> &[u8] {
        let start = Self::frame_to_address(frame);
        &self.data[start..start + PAGE_SIZE]
    }

    pub fn frame_mut(&mut self, frame: usize) -> &mut [u8] {
        let start = Self::frame_to_address(frame);
        &mut self.data[start..start + PAGE_SIZE]
    }
}

/// Bookkeeping for one physical frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Virtual page held by this frame; only meaningful when `!is_free`
    pub mapped_page: usize,
    /// Set once the page has been granted write permission
    pub dirty: bool,
    /// Fault count when the frame last received a new page
    pub inserted_at: u64,
    /// Fault count of the last mapping or write upgrade
    pub updated_at: u64,
    pub is_free: bool,
}

impl Frame {
    pub fn new() -> Self {
        Frame {
            mapped_page: 0,
            dirty: false,
            inserted_at: 0,
            updated_at: 0,
            is_free: true,
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-size table of frame metadata. Storage and scans only; victim
/// selection lives in `policy`.
#[derive(Debug, Clone)]
pub struct FrameTable {
    frames: Vec<Frame>,
}

impl FrameTable {
    pub fn new(nframes: usize) -> Self {
        FrameTable {
            frames: vec![Frame::new(); nframes],
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn get(&self, frame: usize) -> &Frame {
        &self.frames[frame]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// Lowest-index free frame, if any
    pub fn find_free(&self) -> Option<usize> {
        self.frames.iter().position(|frame| frame.is_free)
    }

    pub fn occupied_count(&self) -> usize {
        self.frames.iter().filter(|frame| !frame.is_free).count()
    }

    /// Frame currently holding `page`
    pub fn frame_of(&self, page: usize) -> Option<usize> {
        self.frames
            .iter()
            .position(|frame| !frame.is_free && frame.mapped_page == page)
    }

    /// (Re)assign `frame` to `page`, stamping both timestamps with `clock`
    pub fn assign(&mut self, frame: usize, page: usize, clock: u64) {
        let entry = &mut self.frames[frame];
        entry.mapped_page = page;
        entry.dirty = false;
        entry.is_free = false;
        entry.inserted_at = clock;
        entry.updated_at = clock;
    }

    /// Record a write-permission upgrade without touching the mapping
    pub fn mark_dirty(&mut self, frame: usize, clock: u64) {
        let entry = &mut self.frames[frame];
        entry.dirty = true;
        entry.updated_at = clock;
    }
}

impl fmt::Display for FrameTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, frame) in self.frames.iter().enumerate() {
            if frame.is_free {
                writeln!(f, "frame {:>4}: free", idx)?;
            } else {
                writeln!(
                    f,
                    "frame {:>4}: page {:>6} dirty={} inserted={} updated={}",
                    idx, frame.mapped_page, frame.dirty as u8, frame.inserted_at, frame.updated_at
                )?;
            }
        }
        Ok(())
    }
}
