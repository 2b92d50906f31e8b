pub mod config;
pub mod constants;
pub mod disk;
pub mod error;
pub mod memory;
pub mod pager;
pub mod policy;
pub mod simulation;
pub mod translation;
pub mod vm_manager;
pub mod workload;

// Re-export commonly used items for convenience
pub use constants::*;
pub use error::{Result, VmError};
pub use pager::{FaultHandler, FaultStats, Pager};
pub use policy::ReplacementPolicy;
pub use translation::{Access, PageTable, Protection, TranslationResult, VirtualAddress};
pub use vm_manager::VmManager;
