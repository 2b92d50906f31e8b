use std::fmt;

use crate::constants::*;
use crate::error::{Result, VmError};
use crate::memory::PhysicalMemory;

/// Represents the decomposed components of a Virtual Address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub va: usize,
    pub page: usize,
    pub offset: usize,
}

impl VirtualAddress {
    /// Decompose a raw VA into page number and offset within the page
    pub fn from_raw(va: usize) -> Self {
        VirtualAddress {
            va,
            page: va >> PAGE_SHIFT,
            offset: va & OFFSET_MASK,
        }
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA({:#x}) = (page={}, offset={})", self.va, self.page, self.offset)
    }
}

/// Access rights recorded for a virtual page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Protection {
    #[default]
    None,
    Read,
    ReadWrite,
}

impl Protection {
    pub fn allows(&self, access: Access) -> bool {
        match access {
            Access::Read => *self >= Protection::Read,
            Access::Write => *self == Protection::ReadWrite,
        }
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protection::None => "--",
            Protection::Read => "r-",
            Protection::ReadWrite => "rw",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// One page table slot. `frame` is `None` whenever `prot` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageEntry {
    pub frame: Option<usize>,
    pub prot: Protection,
}

/// Result of an address translation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationResult {
    Success(usize),
    PageFault(usize),
    OutOfRange,
}

/// Software page table plus the physical memory it maps into.
pub struct PageTable {
    entries: Vec<PageEntry>,
    physmem: PhysicalMemory,
}

impl PageTable {
    pub fn new(npages: usize, nframes: usize) -> Result<Self> {
        if npages == 0 {
            return Err(VmError::Config("couldn't create page table: npages must be at least 1".into()));
        }
        if nframes == 0 {
            return Err(VmError::Config("couldn't create page table: nframes must be at least 1".into()));
        }
        Ok(PageTable {
            entries: vec![PageEntry::default(); npages],
            physmem: PhysicalMemory::new(nframes),
        })
    }

    pub fn npages(&self) -> usize {
        self.entries.len()
    }

    pub fn nframes(&self) -> usize {
        self.physmem.nframes()
    }

    /// Size of the virtual address space in bytes
    pub fn virtmem_len(&self) -> usize {
        self.npages() * PAGE_SIZE
    }

    pub fn entry(&self, page: usize) -> PageEntry {
        self.entries[page]
    }

    pub fn set_entry(&mut self, page: usize, frame: Option<usize>, prot: Protection) {
        self.entries[page] = PageEntry { frame, prot };
    }

    /// Translate `va` for `access`, reporting a fault when the recorded
    /// permission does not allow it
    pub fn translate(&self, va: &VirtualAddress, access: Access) -> TranslationResult {
        let Some(entry) = self.entries.get(va.page) else {
            return TranslationResult::OutOfRange;
        };
        match entry.frame {
            Some(frame) if entry.prot.allows(access) => {
                TranslationResult::Success(PhysicalMemory::frame_to_address(frame) + va.offset)
            }
            _ => TranslationResult::PageFault(va.page),
        }
    }

    pub fn physmem(&self) -> &PhysicalMemory {
        &self.physmem
    }

    pub fn physmem_mut(&mut self) -> &mut PhysicalMemory {
        &mut self.physmem
    }
}

impl fmt::Display for PageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "page table: {} pages, {} frames", self.npages(), self.nframes())?;
        for (page, entry) in self.entries.iter().enumerate() {
            match entry.frame {
                Some(frame) => writeln!(f, "page {:>6}: frame {:>4} {}", page, frame, entry.prot)?,
                None => writeln!(f, "page {:>6}: unmapped", page)?,
            }
        }
        Ok(())
    }
}
