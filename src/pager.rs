//! Page fault handler: frame allocation, eviction and backing-store I/O.

use log::{debug, log_enabled, trace, Level};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::disk::BackingStore;
use crate::error::{Result, VmError};
use crate::memory::FrameTable;
use crate::policy::ReplacementPolicy;
use crate::translation::{PageTable, Protection};

/// Callback the VM manager invokes when an access is disallowed by the page
/// table. On `Ok` the access is retried.
pub trait FaultHandler {
    fn handle_fault(&mut self, pt: &mut PageTable, page: usize) -> Result<()>;
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultStats {
    /// Also the logical clock used to timestamp frames
    pub faults: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
}

pub struct Pager<D: BackingStore> {
    frames: FrameTable,
    disk: D,
    policy: ReplacementPolicy,
    rng: StdRng,
    stats: FaultStats,
    // last page installed through the eviction path
    last_evicted_install: Option<usize>,
}

impl<D: BackingStore> Pager<D> {
    pub fn new(nframes: usize, disk: D, policy: ReplacementPolicy) -> Result<Self> {
        if nframes == 0 {
            return Err(VmError::Config("pager needs at least one frame".into()));
        }
        Ok(Pager {
            frames: FrameTable::new(nframes),
            disk,
            policy,
            rng: StdRng::from_os_rng(),
            stats: FaultStats::default(),
            last_evicted_install: None,
        })
    }

    /// Make random victim selection reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn stats(&self) -> FaultStats {
        self.stats
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    pub fn disk(&self) -> &D {
        &self.disk
    }

    pub fn disk_mut(&mut self) -> &mut D {
        &mut self.disk
    }

    pub fn into_disk(self) -> D {
        self.disk
    }

    fn clock(&self) -> u64 {
        self.stats.faults
    }

    /// Write fault on a read-only page: no I/O, just widen the permission
    fn grant_write(&mut self, pt: &mut PageTable, page: usize, frame: usize) {
        debug!("fault {}: granting write on page {} (frame {})", self.clock(), page, frame);
        self.frames.mark_dirty(frame, self.clock());
        pt.set_entry(page, Some(frame), Protection::ReadWrite);
    }

    fn map_free(&mut self, pt: &mut PageTable, page: usize, frame: usize) -> Result<()> {
        debug!("fault {}: page {} -> free frame {}", self.clock(), page, frame);
        self.disk.read(page, pt.physmem_mut().frame_mut(frame))?;
        self.stats.disk_reads += 1;

        self.frames.assign(frame, page, self.clock());
        pt.set_entry(page, Some(frame), Protection::Read);
        Ok(())
    }

    fn evict_and_map(&mut self, pt: &mut PageTable, page: usize) -> Result<()> {
        // Coarse livelock guard: only an immediate repeat of the same page trips it.
        if self.last_evicted_install == Some(page) {
            return Err(VmError::Thrashing { page });
        }

        let victim = self.policy.select_victim(&self.frames, &mut self.rng);
        let evicted = self.frames.get(victim).mapped_page;
        debug!(
            "fault {}: page {} -> frame {} evicting page {} ({})",
            self.clock(),
            page,
            victim,
            evicted,
            self.policy
        );

        // write-back does not consult the dirty bit
        self.disk.write(evicted, pt.physmem().frame(victim))?;
        self.stats.disk_writes += 1;

        self.disk.read(page, pt.physmem_mut().frame_mut(victim))?;
        self.stats.disk_reads += 1;

        self.frames.assign(victim, page, self.clock());
        pt.set_entry(page, Some(victim), Protection::Read);
        pt.set_entry(evicted, None, Protection::None);

        self.last_evicted_install = Some(page);
        Ok(())
    }
}

impl<D: BackingStore> FaultHandler for Pager<D> {
    fn handle_fault(&mut self, pt: &mut PageTable, page: usize) -> Result<()> {
        if pt.nframes() != self.frames.len() {
            return Err(VmError::Config(format!(
                "pager tracks {} frames but the page table has {}",
                self.frames.len(),
                pt.nframes()
            )));
        }
        if page >= pt.npages() {
            return Err(VmError::PageOutOfRange {
                page,
                npages: pt.npages(),
            });
        }

        self.stats.faults += 1;

        let entry = pt.entry(page);
        match (entry.prot, entry.frame) {
            (Protection::Read | Protection::ReadWrite, Some(frame)) => {
                self.grant_write(pt, page, frame)
            }
            _ => match self.frames.find_free() {
                Some(frame) => self.map_free(pt, page, frame)?,
                None => self.evict_and_map(pt, page)?,
            },
        }

        if log_enabled!(Level::Trace) {
            trace!("{}{}", pt, self.frames);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::disk::MemDisk;

    fn setup(npages: usize, nframes: usize, policy: ReplacementPolicy) -> (PageTable, Pager<MemDisk>) {
        let pt = PageTable::new(npages, nframes).unwrap();
        let pager = Pager::new(nframes, MemDisk::new(npages), policy).unwrap().with_seed(7);
        (pt, pager)
    }

    #[test]
    fn test_first_fault_uses_free_frame() {
        let (mut pt, mut pager) = setup(4, 2, ReplacementPolicy::Fifo);
        pager.disk_mut().block_mut(3)[0] = 99;

        pager.handle_fault(&mut pt, 3).unwrap();

        let entry = pt.entry(3);
        assert_eq!(entry.frame, Some(0));
        assert_eq!(entry.prot, Protection::Read);
        assert_eq!(pt.physmem().frame(0)[0], 99);

        let frame = pager.frames().get(0);
        assert_eq!(frame.mapped_page, 3);
        assert_eq!(frame.inserted_at, 1);
        assert_eq!(frame.updated_at, 1);
        assert!(!frame.dirty);
        assert_eq!(
            pager.stats(),
            FaultStats { faults: 1, disk_reads: 1, disk_writes: 0 }
        );
    }

    #[test]
    fn test_write_upgrade_does_no_io() {
        let (mut pt, mut pager) = setup(4, 2, ReplacementPolicy::Lru);
        pager.handle_fault(&mut pt, 1).unwrap();
        pager.handle_fault(&mut pt, 1).unwrap();

        assert_eq!(pt.entry(1).prot, Protection::ReadWrite);
        let frame = pager.frames().get(0);
        assert!(frame.dirty);
        assert_eq!(frame.inserted_at, 1);
        assert_eq!(frame.updated_at, 2);
        assert_eq!(
            pager.stats(),
            FaultStats { faults: 2, disk_reads: 1, disk_writes: 0 }
        );
    }

    #[test]
    fn test_eviction_writes_back_to_victim_page_slot() {
        let (mut pt, mut pager) = setup(3, 1, ReplacementPolicy::Fifo);
        pager.handle_fault(&mut pt, 2).unwrap();
        pt.physmem_mut().frame_mut(0).fill(0xAB);

        pager.handle_fault(&mut pt, 0).unwrap();

        assert!(pager.disk().block(2).iter().all(|&b| b == 0xAB));
        assert!(pager.disk().block(0).iter().all(|&b| b == 0));
        assert_eq!(pt.entry(2).frame, None);
        assert_eq!(pt.entry(2).prot, Protection::None);
        assert_eq!(pt.entry(0).frame, Some(0));
        assert!(pt.physmem().frame(0).iter().all(|&b| b == 0));
        assert_eq!(
            pager.stats(),
            FaultStats { faults: 2, disk_reads: 2, disk_writes: 1 }
        );
    }

    #[test]
    fn test_clean_victim_still_written_back() {
        let (mut pt, mut pager) = setup(2, 1, ReplacementPolicy::Lru);
        pager.handle_fault(&mut pt, 0).unwrap();
        assert!(!pager.frames().get(0).dirty);
        pager.handle_fault(&mut pt, 1).unwrap();
        assert_eq!(pager.stats().disk_writes, 1);
    }

    #[test]
    fn test_immediate_repeat_after_eviction_aborts() {
        let (mut pt, mut pager) = setup(3, 1, ReplacementPolicy::Fifo);
        pager.handle_fault(&mut pt, 0).unwrap();
        pager.handle_fault(&mut pt, 1).unwrap();
        let before = pager.stats();

        // the page loses its mapping and faults straight back in
        pt.set_entry(1, None, Protection::None);
        let err = pager.handle_fault(&mut pt, 1).unwrap_err();

        assert!(matches!(err, VmError::Thrashing { page: 1 }));
        let after = pager.stats();
        assert_eq!(after.disk_reads, before.disk_reads);
        assert_eq!(after.disk_writes, before.disk_writes);
        assert_eq!(after.faults, before.faults + 1);
    }

    #[test]
    fn test_alternating_pages_do_not_trip_guard() {
        let (mut pt, mut pager) = setup(2, 1, ReplacementPolicy::Lru);
        for page in [0, 1, 0, 1, 0, 1] {
            pager.handle_fault(&mut pt, page).unwrap();
        }
        assert_eq!(
            pager.stats(),
            FaultStats { faults: 6, disk_reads: 6, disk_writes: 5 }
        );
    }

    #[test]
    fn test_fault_outside_address_space() {
        let (mut pt, mut pager) = setup(2, 1, ReplacementPolicy::Fifo);
        let err = pager.handle_fault(&mut pt, 5).unwrap_err();
        assert!(matches!(err, VmError::PageOutOfRange { page: 5, npages: 2 }));
        // a rejected fault does not advance the clock
        assert_eq!(pager.stats(), FaultStats::default());

        pager.handle_fault(&mut pt, 1).unwrap();
        assert_eq!(pager.frames().get(0).inserted_at, 1);
    }

    #[test]
    fn test_zero_frames_rejected() {
        let result = Pager::new(0, MemDisk::new(2), ReplacementPolicy::Random);
        assert!(matches!(result, Err(VmError::Config(_))));
    }

    #[test]
    fn test_frame_count_mismatch_rejected() {
        // pager believes in three frames, physical memory only has one
        let mut pt = PageTable::new(4, 1).unwrap();
        let mut pager = Pager::new(3, MemDisk::new(4), ReplacementPolicy::Fifo).unwrap();
        for page in [0, 1] {
            let err = pager.handle_fault(&mut pt, page).unwrap_err();
            assert!(matches!(err, VmError::Config(_)));
        }
        assert_eq!(pager.stats(), FaultStats::default());
        assert_eq!(pt.entry(0).prot, Protection::None);

        let mut small = PageTable::new(4, 2).unwrap();
        let mut pager = Pager::new(1, MemDisk::new(4), ReplacementPolicy::Lru).unwrap();
        assert!(matches!(pager.handle_fault(&mut small, 0), Err(VmError::Config(_))));
    }

    #[test]
    fn test_disk_failure_propagates() {
        // disk too small for page 3
        let mut pt = PageTable::new(4, 1).unwrap();
        let mut pager = Pager::new(1, MemDisk::new(2), ReplacementPolicy::Fifo).unwrap();
        let err = pager.handle_fault(&mut pt, 3).unwrap_err();
        assert!(matches!(err, VmError::BlockOutOfRange { block: 3, blocks: 2 }));
        assert_eq!(pager.stats().disk_reads, 0);
    }

    #[test]
    fn test_frame_contents_match_disk_block_size() {
        let (pt, _) = setup(1, 1, ReplacementPolicy::Random);
        assert_eq!(pt.physmem().frame(0).len(), BLOCK_SIZE);
    }
}
