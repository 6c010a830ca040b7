//! ELF file and program header parser.

use rvcheck_isa::Xlen;

use crate::constants::*;
use crate::{ElfError, Result};

/// Read little-endian u16 from bytes.
#[inline]
fn read_le16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

/// Read little-endian u32 from bytes.
#[inline]
fn read_le32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Read little-endian u64 from bytes.
#[inline]
fn read_le64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

/// Fields of the ELF file header used by the loader. Addresses are widened to u64.
#[derive(Clone, Debug)]
pub struct ElfHeader {
    pub class: Xlen,
    pub entry: u64,
    pub phoff: u64,
    pub flags: u32,
    pub phentsize: u16,
    pub phnum: u16,
}

/// Program header.
#[derive(Clone, Debug)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub flags: u32,
    pub offset: u64,
    pub vaddr: u64,
    pub filesz: u64,
    pub memsz: u64,
}

/// Parsed ELF file.
#[derive(Clone, Debug)]
pub struct ElfFile {
    pub header: ElfHeader,
    pub program_headers: Vec<ProgramHeader>,
}

impl ElfFile {
    /// Parse ELF file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is malformed or a program header lies
    /// outside the file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = Self::parse_header(data)?;
        let program_headers = Self::parse_program_headers(data, &header)?;
        Ok(Self {
            header,
            program_headers,
        })
    }

    fn parse_header(data: &[u8]) -> Result<ElfHeader> {
        if data.len() < ELF32_EHDR_SIZE {
            return Err(ElfError::TooSmall);
        }
        if read_le32(data, 0) != ELF_MAGIC {
            return Err(ElfError::InvalidMagic);
        }
        if data[5] != ELF_DATA_LSB {
            return Err(ElfError::NotLittleEndian);
        }

        match data[4] {
            ELF_CLASS_32 => Ok(ElfHeader {
                class: Xlen::Rv32,
                entry: u64::from(read_le32(data, 24)),
                phoff: u64::from(read_le32(data, 28)),
                flags: read_le32(data, 36),
                phentsize: read_le16(data, 42),
                phnum: read_le16(data, 44),
            }),
            ELF_CLASS_64 => {
                if data.len() < ELF64_EHDR_SIZE {
                    return Err(ElfError::TooSmall);
                }
                Ok(ElfHeader {
                    class: Xlen::Rv64,
                    entry: read_le64(data, 24),
                    phoff: read_le64(data, 32),
                    flags: read_le32(data, 48),
                    phentsize: read_le16(data, 54),
                    phnum: read_le16(data, 56),
                })
            }
            other => Err(ElfError::UnsupportedClass(other)),
        }
    }

    fn parse_program_headers(data: &[u8], header: &ElfHeader) -> Result<Vec<ProgramHeader>> {
        let mut headers = Vec::with_capacity(usize::from(header.phnum));

        for i in 0..u64::from(header.phnum) {
            let offset = i
                .checked_mul(u64::from(header.phentsize))
                .and_then(|rel| rel.checked_add(header.phoff))
                .and_then(|off| usize::try_from(off).ok())
                .ok_or(ElfError::ProgramOutOfBounds)?;
            headers.push(Self::parse_program_header(data, offset, header.class)?);
        }

        Ok(headers)
    }

    fn parse_program_header(data: &[u8], offset: usize, class: Xlen) -> Result<ProgramHeader> {
        let size = match class {
            Xlen::Rv32 => ELF32_PHDR_SIZE,
            Xlen::Rv64 => ELF64_PHDR_SIZE,
        };
        if offset.checked_add(size).is_none_or(|end| end > data.len()) {
            return Err(ElfError::ProgramOutOfBounds);
        }

        Ok(match class {
            Xlen::Rv64 => ProgramHeader {
                p_type: read_le32(data, offset),
                flags: read_le32(data, offset + 4),
                offset: read_le64(data, offset + 8),
                vaddr: read_le64(data, offset + 16),
                filesz: read_le64(data, offset + 32),
                memsz: read_le64(data, offset + 40),
            },
            Xlen::Rv32 => ProgramHeader {
                p_type: read_le32(data, offset),
                offset: u64::from(read_le32(data, offset + 4)),
                vaddr: u64::from(read_le32(data, offset + 8)),
                filesz: u64::from(read_le32(data, offset + 16)),
                memsz: u64::from(read_le32(data, offset + 20)),
                flags: read_le32(data, offset + 24),
            },
        })
    }
}
