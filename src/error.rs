//! Error types for the simulator.
//!
//! Nothing below `main` terminates the process: every failure is returned as a
//! `VmError` and the driver picks the exit status.

use thiserror::Error;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, VmError>;

#[derive(Error, Debug)]
pub enum VmError {
    /// Backing store read or write failed
    #[error("disk I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The same page was installed through eviction twice in a row
    #[error("thrashing detected: page {page} re-faulted immediately after being installed")]
    Thrashing { page: usize },

    #[error("virtual address {addr:#x} is outside the {len} byte address space")]
    AddressOutOfRange { addr: usize, len: usize },

    #[error("page {page} is outside the {npages} page address space")]
    PageOutOfRange { page: usize, npages: usize },

    #[error("block {block} is outside the disk ({blocks} blocks)")]
    BlockOutOfRange { block: usize, blocks: usize },

    #[error("buffer is {actual} bytes, expected one block of {expected}")]
    BadBlockLength { expected: usize, actual: usize },

    /// Invalid sizes or arguments when building the simulation
    #[error("{0}")]
    Config(String),
}

impl VmError {
    /// True for the livelock abort, which the driver reports differently from a crash
    pub fn is_thrashing(&self) -> bool {
        matches!(self, VmError::Thrashing { .. })
    }
}
