// page size in bytes; the backing store uses the same block size so one page is one block
pub const PAGE_SHIFT: u32 = 12;
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
pub const BLOCK_SIZE: usize = PAGE_SIZE;

pub const OFFSET_MASK: usize = PAGE_SIZE - 1;

pub const DEFAULT_DISK_PATH: &str = "myvirtualdisk";

// seeds used by the synthetic workloads so runs are reproducible
pub const SORT_SEED: u64 = 4856;
pub const FOCUS_SEED: u64 = 38290;
