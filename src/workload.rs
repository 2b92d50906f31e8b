//! Synthetic access patterns that drive the pager through the virtual buffer.

use std::fmt;

use clap::ValueEnum;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::*;
use crate::error::Result;
use crate::pager::FaultHandler;
use crate::vm_manager::VmManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Workload {
    /// Fill with random bytes and heap sort in place
    Sort,
    /// Write every byte, then sum the buffer ten times
    Scan,
    /// Random writes clustered in small windows
    Focus,
}

impl Workload {
    pub fn name(&self) -> &'static str {
        match self {
            Workload::Sort => "sort",
            Workload::Scan => "scan",
            Workload::Focus => "focus",
        }
    }

    /// Run against `vm` and return the checksum the workload reports
    pub fn run<H: FaultHandler>(&self, vm: &mut VmManager<H>) -> Result<i64> {
        debug!("running {} over {} bytes", self, vm.len());
        match self {
            Workload::Sort => sort_program(vm),
            Workload::Scan => scan_program(vm),
            Workload::Focus => focus_program(vm),
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn sum_bytes<H: FaultHandler>(vm: &mut VmManager<H>) -> Result<i64> {
    let mut total = 0i64;
    for addr in 0..vm.len() {
        total += i64::from(vm.read(addr)?);
    }
    Ok(total)
}

pub fn scan_program<H: FaultHandler>(vm: &mut VmManager<H>) -> Result<i64> {
    for addr in 0..vm.len() {
        vm.write(addr, (addr % 256) as u8)?;
    }
    let mut total = 0;
    for _ in 0..10 {
        total += sum_bytes(vm)?;
    }
    Ok(total)
}

pub fn sort_program<H: FaultHandler>(vm: &mut VmManager<H>) -> Result<i64> {
    let mut rng = StdRng::seed_from_u64(SORT_SEED);
    for addr in 0..vm.len() {
        vm.write(addr, rng.random())?;
    }
    heap_sort(vm)?;
    sum_bytes(vm)
}

pub fn focus_program<H: FaultHandler>(vm: &mut VmManager<H>) -> Result<i64> {
    const ROUNDS: usize = 100;
    const WRITES_PER_ROUND: usize = 100;
    const WINDOW: usize = 25;

    let len = vm.len();
    let mut rng = StdRng::seed_from_u64(FOCUS_SEED);
    for addr in 0..len {
        vm.write(addr, 0)?;
    }
    for _ in 0..ROUNDS {
        let start = rng.random_range(..len);
        for _ in 0..WRITES_PER_ROUND {
            let addr = (start + rng.random_range(..WINDOW)) % len;
            vm.write(addr, rng.random())?;
        }
    }

    // bytes are summed as signed values
    let mut total = 0i64;
    for addr in 0..len {
        total += i64::from(vm.read(addr)? as i8);
    }
    Ok(total)
}

fn heap_sort<H: FaultHandler>(vm: &mut VmManager<H>) -> Result<()> {
    let len = vm.len();
    for root in (0..len / 2).rev() {
        sift_down(vm, root, len)?;
    }
    for end in (1..len).rev() {
        let (first, last) = (vm.read(0)?, vm.read(end)?);
        vm.write(0, last)?;
        vm.write(end, first)?;
        sift_down(vm, 0, end)?;
    }
    Ok(())
}

fn sift_down<H: FaultHandler>(vm: &mut VmManager<H>, mut root: usize, end: usize) -> Result<()> {
    loop {
        let mut child = 2 * root + 1;
        if child >= end {
            return Ok(());
        }
        if child + 1 < end && vm.read(child)? < vm.read(child + 1)? {
            child += 1;
        }
        let (parent, larger) = (vm.read(root)?, vm.read(child)?);
        if parent >= larger {
            return Ok(());
        }
        vm.write(root, larger)?;
        vm.write(child, parent)?;
        root = child;
    }
}
