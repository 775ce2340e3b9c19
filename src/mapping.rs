//! Memory-mapped UIO register windows.

use std::fs::File;
use std::num::NonZeroUsize;
use std::ptr::{self, NonNull};

use log::debug;
use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};

use crate::sysfs::MapInfo;

/// Access to a 32-bit register file.
///
/// Implemented by [`Mapping`] for real hardware; driver tests implement it
/// over an in-memory register array instead.
pub trait Registers {
    /// Reads the register at a byte offset.
    fn read32(&self, offset: usize) -> u32;

    /// Writes the register at a byte offset.
    fn write32(&self, offset: usize, value: u32);

    /// Read-modify-write of a single register.
    fn modify32(&self, offset: usize, f: impl FnOnce(u32) -> u32)
    where
        Self: Sized,
    {
        let value = f(self.read32(offset));
        self.write32(offset, value);
    }
}

/// One mmap'd region of a UIO device.
///
/// Per the UIO kernel contract the mmap offset encodes the region index
/// (`index * PAGE_SIZE`), and the region's own `offset` attribute locates the
/// valid data inside the mapping. Register offsets passed to [`Registers`]
/// methods are relative to that data start.
pub struct Mapping {
    base: NonNull<libc::c_void>,
    mapped_len: usize,
    data_offset: usize,
    len: usize,
}

// The mapping covers device registers, not memory shared with other host
// threads, and all accesses are volatile reads/writes through `&self`.
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

impl Mapping {
    pub(crate) fn new(file: &File, index: usize, info: &MapInfo) -> nix::Result<Mapping> {
        let page = page_size();
        let mapped_len = round_to_pages(info.size as usize + info.offset as usize, page);
        let base = unsafe {
            mmap(
                None,
                NonZeroUsize::new(mapped_len).ok_or(nix::Error::EINVAL)?,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                file,
                (index * page) as libc::off_t,
            )?
        };
        debug!("mapped {mapped_len:#x} bytes for map{index} at {base:p}");
        Ok(Mapping {
            base,
            mapped_len,
            data_offset: info.offset as usize,
            len: info.size as usize,
        })
    }

    /// Usable length in bytes, from the start of the region's data.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn reg_ptr(&self, offset: usize) -> *mut u32 {
        assert_eq!(
            offset % 4,
            0,
            "register offset {offset:#x} is not 32-bit aligned"
        );
        assert!(
            offset + 4 <= self.len,
            "register offset {offset:#x} outside the {:#x}-byte region",
            self.len
        );
        unsafe {
            self.base
                .as_ptr()
                .cast::<u8>()
                .add(self.data_offset + offset)
                .cast::<u32>()
        }
    }
}

impl Registers for Mapping {
    fn read32(&self, offset: usize) -> u32 {
        unsafe { ptr::read_volatile(self.reg_ptr(offset)) }
    }

    fn write32(&self, offset: usize, value: u32) {
        unsafe { ptr::write_volatile(self.reg_ptr(offset), value) }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            let _ = munmap(self.base, self.mapped_len);
        }
    }
}

pub(crate) fn page_size() -> usize {
    // SAFETY: sysconf has no memory-safety preconditions.
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

fn round_to_pages(len: usize, page: usize) -> usize {
    len.div_ceil(page) * page
}
