//! ELF loader for RISC-V reference images.
//!
//! Only what a loader needs is parsed: the file header and the program
//! headers. Sections and symbols are ignored.

mod constants;
mod file;
mod image;

pub use constants::*;
pub use file::*;
pub use image::*;

use thiserror::Error;

/// ELF parsing errors.
#[derive(Error, Debug)]
pub enum ElfError {
    #[error("failed to read ELF file: {0}")]
    Io(#[from] std::io::Error),
    #[error("ELF data too small")]
    TooSmall,
    #[error("Invalid ELF magic number")]
    InvalidMagic,
    #[error("Only little-endian ELF supported")]
    NotLittleEndian,
    #[error("Unsupported ELF class: {0}")]
    UnsupportedClass(u8),
    #[error("Program header out of bounds")]
    ProgramOutOfBounds,
    #[error("Segment extends beyond file")]
    SegmentBeyondFile,
    #[error("Virtual address overflow")]
    VirtualAddressOverflow,
    #[error("No loadable segments found")]
    NoLoadableSegments,
    #[error("Too many loadable segments")]
    TooManySegments,
    #[error("Overlapping virtual address ranges")]
    OverlappingSegments,
}

pub type Result<T> = std::result::Result<T, ElfError>;
