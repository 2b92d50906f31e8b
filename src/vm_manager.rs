use crate::disk::BackingStore;
use crate::error::{Result, VmError};
use crate::pager::{FaultHandler, Pager};
use crate::policy::ReplacementPolicy;
use crate::translation::{Access, PageTable, TranslationResult, VirtualAddress};

/// Virtual memory as seen by a workload: byte loads and stores that fault,
/// get resolved by the handler, and are retried.
pub struct VmManager<H: FaultHandler> {
    pt: PageTable,
    handler: H,
}

impl<H: FaultHandler> VmManager<H> {
    pub fn new(pt: PageTable, handler: H) -> Self {
        VmManager { pt, handler }
    }

    /// Size of the virtual address space in bytes
    pub fn len(&self) -> usize {
        self.pt.virtmem_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read(&mut self, addr: usize) -> Result<u8> {
        let pa = self.resolve(addr, Access::Read)?;
        Ok(self.pt.physmem().read(pa))
    }

    pub fn write(&mut self, addr: usize, value: u8) -> Result<()> {
        let pa = self.resolve(addr, Access::Write)?;
        self.pt.physmem_mut().write(pa, value);
        Ok(())
    }

    fn resolve(&mut self, addr: usize, access: Access) -> Result<usize> {
        let va = VirtualAddress::from_raw(addr);
        loop {
            match self.pt.translate(&va, access) {
                TranslationResult::Success(pa) => return Ok(pa),
                TranslationResult::PageFault(page) => self.handler.handle_fault(&mut self.pt, page)?,
                TranslationResult::OutOfRange => {
                    return Err(VmError::AddressOutOfRange {
                        addr,
                        len: self.len(),
                    });
                }
            }
        }
    }

    pub fn page_table(&self) -> &PageTable {
        &self.pt
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_parts(self) -> (PageTable, H) {
        (self.pt, self.handler)
    }
}

impl<D: BackingStore> VmManager<Pager<D>> {
    /// Build a paged address space of `npages` pages over `nframes` frames.
    /// The disk needs one block per page.
    pub fn with_pager(npages: usize, nframes: usize, disk: D, policy: ReplacementPolicy) -> Result<Self> {
        if disk.blocks() < npages {
            return Err(VmError::Config(format!(
                "disk has {} blocks but {} pages need backing",
                disk.blocks(),
                npages
            )));
        }
        let pt = PageTable::new(npages, nframes)?;
        Ok(VmManager::new(pt, Pager::new(nframes, disk, policy)?))
    }
}
