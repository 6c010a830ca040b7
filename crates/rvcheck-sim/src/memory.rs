//! Sparse byte-addressable memory.
//!
//! Backing pages are allocated on first write. Reads of untouched memory
//! return zero. Addresses wrap at 2^64.

use rustc_hash::FxHashMap;

/// Page size of the backing store.
pub const PAGE_SIZE: usize = 1 << 12;
const PAGE_MASK: u64 = PAGE_SIZE as u64 - 1;

type Page = Box<[u8; PAGE_SIZE]>;

/// Flat memory store shared by image loading and the reference executor.
#[derive(Default)]
pub struct Memory {
    pages: FxHashMap<u64, Page>,
}

impl Memory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill `buf` with the bytes starting at `addr`.
    pub fn read(&self, addr: u64, buf: &mut [u8]) {
        let mut addr = addr;
        let mut done = 0;
        while done < buf.len() {
            let (page, offset) = split(addr);
            let chunk = (PAGE_SIZE - offset).min(buf.len() - done);
            match self.pages.get(&page) {
                Some(data) => {
                    buf[done..done + chunk].copy_from_slice(&data[offset..offset + chunk]);
                }
                None => buf[done..done + chunk].fill(0),
            }
            done += chunk;
            addr = addr.wrapping_add(chunk as u64);
        }
    }

    /// Write `bytes` starting at `addr`.
    pub fn write(&mut self, addr: u64, bytes: &[u8]) {
        let mut addr = addr;
        let mut done = 0;
        while done < bytes.len() {
            let (page, offset) = split(addr);
            let chunk = (PAGE_SIZE - offset).min(bytes.len() - done);
            let data = self
                .pages
                .entry(page)
                .or_insert_with(|| Box::new([0; PAGE_SIZE]));
            data[offset..offset + chunk].copy_from_slice(&bytes[done..done + chunk]);
            done += chunk;
            addr = addr.wrapping_add(chunk as u64);
        }
    }

    /// Write a single byte.
    pub fn write_byte(&mut self, addr: u64, byte: u8) {
        self.write(addr, &[byte]);
    }

    /// Read up to 8 bytes as a little-endian value.
    #[must_use]
    pub fn read_le(&self, addr: u64, size: usize) -> u64 {
        let mut bytes = [0u8; 8];
        self.read(addr, &mut bytes[..size.min(8)]);
        u64::from_le_bytes(bytes)
    }

    /// Write the low `size` bytes of `value` little-endian.
    pub fn write_le(&mut self, addr: u64, size: usize, value: u64) {
        self.write(addr, &value.to_le_bytes()[..size.min(8)]);
    }

    /// Number of allocated pages.
    #[must_use]
    pub fn mapped_pages(&self) -> usize {
        self.pages.len()
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn split(addr: u64) -> (u64, usize) {
    (addr & !PAGE_MASK, (addr & PAGE_MASK) as usize)
}
