//! RISC-V instruction set definitions and decoder.
//!
//! This crate provides instruction decoding for the RV32/RV64 I, M, A, C and
//! Zicsr extensions, CSR address definitions, ISA string parsing, and the
//! register-write types shared by the reference executor and the checker.

mod compressed;
pub mod csr;
mod decode;
mod encode;
mod isa;
mod types;

pub use decode::*;
pub use encode::*;
pub use isa::*;
pub use types::*;
