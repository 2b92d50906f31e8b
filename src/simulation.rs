use log::info;

use crate::config::{Config, DiskKind};
use crate::disk::{BackingStore, FileDisk, MemDisk};
use crate::error::Result;
use crate::pager::FaultStats;
use crate::vm_manager::VmManager;

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// Checksum reported by the workload
    pub result: i64,
    pub stats: FaultStats,
}

fn open_disk(config: &Config) -> Result<Box<dyn BackingStore>> {
    Ok(match &config.disk {
        DiskKind::File(path) => Box::new(FileDisk::create(path, config.npages)?),
        DiskKind::Memory => Box::new(MemDisk::new(config.npages)),
    })
}

/// Build the address space, run the workload, and collect the counters
pub fn run(config: &Config) -> Result<Report> {
    config.validate()?;
    let disk = open_disk(config)?;

    let vm = VmManager::with_pager(config.npages, config.nframes, disk, config.policy)?;
    let (pt, mut pager) = vm.into_parts();
    if let Some(seed) = config.seed {
        pager = pager.with_seed(seed);
    }
    let mut vm = VmManager::new(pt, pager);

    info!(
        "{} pages, {} frames, policy {}, workload {}",
        config.npages, config.nframes, config.policy, config.workload
    );
    let result = config.workload.run(&mut vm)?;

    Ok(Report {
        result,
        stats: vm.handler().stats(),
    })
}
