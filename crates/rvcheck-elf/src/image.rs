//! ELF image with loadable segments.

use std::path::Path;

use rvcheck_isa::Xlen;

use crate::constants::*;
use crate::file::{ElfFile, ProgramHeader};
use crate::{ElfError, Result};

/// A loadable segment.
///
/// `data` holds only the file bytes (filesz). Bytes from `data.len()` to
/// `memsz` are BSS and are not produced by [`ElfImage::bytes`].
#[derive(Clone, Debug)]
pub struct MemorySegment {
    pub vaddr: u64,
    pub memsz: u64,
    pub data: Vec<u8>,
    pub flags: u32,
}

impl MemorySegment {
    /// Size of file data (non-BSS).
    #[must_use]
    pub fn filesz(&self) -> u64 {
        self.data.len() as u64
    }
}

/// ELF image ready for loading into memory.
#[derive(Clone, Debug)]
pub struct ElfImage {
    pub class: Xlen,
    pub entry_point: u64,
    pub e_flags: u32,
    pub segments: Vec<MemorySegment>,
}

impl ElfImage {
    /// Parse ELF from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed, has no loadable segment,
    /// more than [`MAX_SEGMENTS`] of them, or overlapping ones.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let elf = ElfFile::parse(data)?;
        let loadable = Self::validate_segments(&elf, data)?;
        let segments = Self::load_segments(&loadable, data);

        Ok(Self {
            class: elf.header.class,
            entry_point: elf.header.entry,
            e_flags: elf.header.flags,
            segments,
        })
    }

    /// Read and parse an ELF file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }

    /// Every file byte of every loadable segment with its virtual address,
    /// in segment order.
    pub fn bytes(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.segments.iter().flat_map(|segment| {
            segment
                .data
                .iter()
                .zip(0u64..)
                .map(move |(&byte, i)| (byte, segment.vaddr.wrapping_add(i)))
        })
    }

    /// Total number of file bytes across all segments.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.segments.iter().map(MemorySegment::filesz).sum()
    }

    fn validate_segments(elf: &ElfFile, file_data: &[u8]) -> Result<Vec<ProgramHeader>> {
        let mut loadable = Vec::new();

        for phdr in &elf.program_headers {
            if phdr.p_type != PT_LOAD || (phdr.memsz == 0 && phdr.filesz == 0) {
                continue;
            }
            let end = phdr
                .offset
                .checked_add(phdr.filesz)
                .ok_or(ElfError::SegmentBeyondFile)?;
            if end > file_data.len() as u64 {
                return Err(ElfError::SegmentBeyondFile);
            }
            if phdr.vaddr.checked_add(phdr.memsz.max(phdr.filesz)).is_none() {
                return Err(ElfError::VirtualAddressOverflow);
            }
            loadable.push(phdr.clone());
        }

        if loadable.is_empty() {
            return Err(ElfError::NoLoadableSegments);
        }

        if loadable.len() > MAX_SEGMENTS {
            return Err(ElfError::TooManySegments);
        }

        for (i, a) in loadable.iter().enumerate() {
            let a_end = a.vaddr + a.memsz.max(a.filesz);
            for b in loadable.iter().skip(i + 1) {
                let b_end = b.vaddr + b.memsz.max(b.filesz);
                if a.vaddr < b_end && b.vaddr < a_end {
                    return Err(ElfError::OverlappingSegments);
                }
            }
        }

        Ok(loadable)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn load_segments(program_headers: &[ProgramHeader], file_data: &[u8]) -> Vec<MemorySegment> {
        program_headers
            .iter()
            .map(|phdr| {
                // Bounds were checked by validate_segments.
                let offset = phdr.offset as usize;
                let filesz = phdr.filesz as usize;
                MemorySegment {
                    vaddr: phdr.vaddr,
                    memsz: phdr.memsz,
                    data: file_data[offset..offset + filesz].to_vec(),
                    flags: phdr.flags,
                }
            })
            .collect()
    }
}
