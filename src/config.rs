//! Command-line surface and run configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::constants::DEFAULT_DISK_PATH;
use crate::error::{Result, VmError};
use crate::policy::ReplacementPolicy;
use crate::workload::Workload;

#[derive(Parser, Debug)]
#[command(name = "virtmem")]
#[command(about = "Demand-paged virtual memory simulator")]
#[command(version)]
pub struct Cli {
    /// Number of virtual pages
    pub npages: usize,

    /// Number of physical frames
    pub nframes: usize,

    /// Page replacement algorithm
    #[arg(value_enum)]
    pub algorithm: Algorithm,

    /// Access pattern to run over the virtual buffer
    #[arg(value_enum)]
    pub program: Workload,

    /// Log each fault (-v) and dump the tables after every fault (-vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Seed for the random replacement policy
    #[arg(long)]
    pub seed: Option<u64>,

    /// Backing store file
    #[arg(long, default_value = DEFAULT_DISK_PATH)]
    pub disk: PathBuf,

    /// Keep the backing store in memory instead of a file
    #[arg(long, conflicts_with = "disk")]
    pub in_memory: bool,
}

/// Algorithm names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    Rand,
    Fifo,
    Lru,
    /// Same policy as lru
    Custom,
}

impl From<Algorithm> for ReplacementPolicy {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Rand => ReplacementPolicy::Random,
            Algorithm::Fifo => ReplacementPolicy::Fifo,
            Algorithm::Lru | Algorithm::Custom => ReplacementPolicy::Lru,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskKind {
    File(PathBuf),
    Memory,
}

/// Validated settings for one simulation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub npages: usize,
    pub nframes: usize,
    pub policy: ReplacementPolicy,
    pub workload: Workload,
    pub seed: Option<u64>,
    pub disk: DiskKind,
    pub verbose: u8,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let config = Config {
            npages: cli.npages,
            nframes: cli.nframes,
            policy: cli.algorithm.into(),
            workload: cli.program,
            seed: cli.seed,
            disk: if cli.in_memory {
                DiskKind::Memory
            } else {
                DiskKind::File(cli.disk)
            },
            verbose: cli.verbose,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.npages == 0 {
            return Err(VmError::Config("npages must be at least 1".into()));
        }
        if self.nframes == 0 {
            return Err(VmError::Config("nframes must be at least 1".into()));
        }
        Ok(())
    }
}
