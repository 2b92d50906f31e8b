//! Block-addressed backing store for paged-out contents.
//!
//! One block holds exactly one page, and block `n` is the home slot of virtual
//! page `n`.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::constants::*;
use crate::error::{Result, VmError};

/// Storage the fault handler pages to and from.
pub trait BackingStore {
    /// Number of blocks on the device
    fn blocks(&self) -> usize;

    /// Copy block `block` into `buf`, which must be exactly one block long
    fn read(&mut self, block: usize, buf: &mut [u8]) -> Result<()>;

    /// Copy `buf` into block `block`
    fn write(&mut self, block: usize, buf: &[u8]) -> Result<()>;
}

fn check_request(block: usize, blocks: usize, len: usize) -> Result<()> {
    if block >= blocks {
        return Err(VmError::BlockOutOfRange { block, blocks });
    }
    if len != BLOCK_SIZE {
        return Err(VmError::BadBlockLength {
            expected: BLOCK_SIZE,
            actual: len,
        });
    }
    Ok(())
}

/// Paging disk held entirely in memory
pub struct MemDisk {
    data: Vec<u8>,
    blocks: usize,
}

impl MemDisk {
    /// Create a new disk initialized to all zeros
    pub fn new(blocks: usize) -> Self {
        MemDisk {
            data: vec![0u8; blocks * BLOCK_SIZE],
            blocks,
        }
    }

    /// Direct access to a block, bypassing the I/O path
    pub fn block(&self, block: usize) -> &[u8] {
        let start = block * BLOCK_SIZE;
        &self.data[start..start + BLOCK_SIZE]
    }

    pub fn block_mut(&mut self, block: usize) -> &mut [u8] {
        let start = block * BLOCK_SIZE;
        &mut self.data[start..start + BLOCK_SIZE]
    }
}

impl BackingStore for MemDisk {
    fn blocks(&self) -> usize {
        self.blocks
    }

    fn read(&mut self, block: usize, buf: &mut [u8]) -> Result<()> {
        check_request(block, self.blocks, buf.len())?;
        buf.copy_from_slice(self.block(block));
        Ok(())
    }

    fn write(&mut self, block: usize, buf: &[u8]) -> Result<()> {
        check_request(block, self.blocks, buf.len())?;
        self.block_mut(block).copy_from_slice(buf);
        Ok(())
    }
}

/// Paging disk backed by a regular file of `blocks * BLOCK_SIZE` bytes
pub struct FileDisk {
    file: File,
    blocks: usize,
}

impl FileDisk {
    /// Create (or truncate) `path` and size it for `blocks` zeroed blocks
    pub fn create<P: AsRef<Path>>(path: P, blocks: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        file.set_len((blocks * BLOCK_SIZE) as u64)?;
        Ok(FileDisk { file, blocks })
    }

    fn seek_to(&mut self, block: usize) -> Result<()> {
        self.file.seek(SeekFrom::Start((block * BLOCK_SIZE) as u64))?;
        Ok(())
    }
}

impl BackingStore for FileDisk {
    fn blocks(&self) -> usize {
        self.blocks
    }

    fn read(&mut self, block: usize, buf: &mut [u8]) -> Result<()> {
        check_request(block, self.blocks, buf.len())?;
        self.seek_to(block)?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, block: usize, buf: &[u8]) -> Result<()> {
        check_request(block, self.blocks, buf.len())?;
        self.seek_to(block)?;
        self.file.write_all(buf)?;
        Ok(())
    }
}

impl<D: BackingStore + ?Sized> BackingStore for Box<D> {
    fn blocks(&self) -> usize {
        (**self).blocks()
    }

    fn read(&mut self, block: usize, buf: &mut [u8]) -> Result<()> {
        (**self).read(block, buf)
    }

    fn write(&mut self, block: usize, buf: &[u8]) -> Result<()> {
        (**self).write(block, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_disk_initialization() {
        let mut disk = MemDisk::new(3);
        assert_eq!(disk.blocks(), 3);
        let mut buf = vec![1u8; BLOCK_SIZE];
        disk.read(2, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_mem_disk_read_write() {
        let mut disk = MemDisk::new(2);
        let mut block = vec![0u8; BLOCK_SIZE];
        block[0] = 13;
        block[BLOCK_SIZE - 1] = 25;
        disk.write(1, &block).unwrap();

        let mut buf = vec![0u8; BLOCK_SIZE];
        disk.read(1, &mut buf).unwrap();
        assert_eq!(buf[0], 13);
        assert_eq!(buf[BLOCK_SIZE - 1], 25);
        assert!(disk.block(0).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_out_of_range_block() {
        let mut disk = MemDisk::new(2);
        let mut buf = vec![0u8; BLOCK_SIZE];
        let err = disk.read(2, &mut buf).unwrap_err();
        assert!(matches!(err, VmError::BlockOutOfRange { block: 2, blocks: 2 }));
    }

    #[test]
    fn test_wrong_buffer_length() {
        let mut disk = MemDisk::new(1);
        let err = disk.write(0, &[0u8; 16]).unwrap_err();
        assert!(matches!(
            err,
            VmError::BadBlockLength { expected: BLOCK_SIZE, actual: 16 }
        ));
    }

    #[test]
    fn test_file_disk_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("myvirtualdisk");
        let mut disk = FileDisk::create(&path, 4).unwrap();
        assert_eq!(disk.blocks(), 4);
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            (4 * BLOCK_SIZE) as u64
        );

        let block: Vec<u8> = (0..BLOCK_SIZE).map(|i| (i % 251) as u8).collect();
        disk.write(3, &block).unwrap();

        let mut buf = vec![0u8; BLOCK_SIZE];
        disk.read(3, &mut buf).unwrap();
        assert_eq!(buf, block);

        disk.read(0, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_file_disk_truncates_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk");
        std::fs::write(&path, vec![9u8; 3 * BLOCK_SIZE]).unwrap();

        let mut disk = FileDisk::create(&path, 1).unwrap();
        let mut buf = vec![0u8; BLOCK_SIZE];
        disk.read(0, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
        assert!(disk.read(1, &mut buf).is_err());
    }

    #[test]
    fn test_file_disk_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("disk");
        assert!(matches!(FileDisk::create(&path, 1), Err(VmError::Io(_))));
    }

    #[test]
    fn test_boxed_store() {
        let mut disk: Box<dyn BackingStore> = Box::new(MemDisk::new(2));
        assert_eq!(disk.blocks(), 2);
        disk.write(0, &vec![4u8; BLOCK_SIZE]).unwrap();
        let mut buf = vec![0u8; BLOCK_SIZE];
        disk.read(0, &mut buf).unwrap();
        assert_eq!(buf[10], 4);
    }
}
