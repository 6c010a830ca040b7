//! Shared helpers for rvcheck integration tests.

#![allow(dead_code, clippy::cast_sign_loss, clippy::cast_possible_truncation)]

use std::fs;
use std::path::{Path, PathBuf};

use rvcheck::{AuditSink, CheckConfig, CheckStats, Checker, Result};
use rvcheck_elf::{
    ELF_CLASS_64, ELF_DATA_LSB, ELF_MACHINE_RISCV, ELF_MAGIC, ELF_TYPE_EXEC, ELF_VERSION_CURRENT,
    ELF64_EHDR_SIZE, ELF64_PHDR_SIZE, PF_R, PF_X, PT_LOAD,
};
use tempfile::TempDir;

/// Load address of test programs.
pub const BASE: u64 = 0x8000_0000;

/// Encoders for the handful of instructions the scenarios need.
pub mod asm {
    fn i_type(imm: i32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
        ((imm as u32 & 0xfff) << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
    }

    pub fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
        i_type(imm, rs1, 0, rd, 0x13)
    }

    pub fn nop() -> u32 {
        addi(0, 0, 0)
    }

    pub fn lui(rd: u32, imm20: u32) -> u32 {
        ((imm20 & 0xf_ffff) << 12) | (rd << 7) | 0x37
    }

    pub fn lw(rd: u32, rs1: u32, imm: i32) -> u32 {
        i_type(imm, rs1, 2, rd, 0x03)
    }

    pub fn sw(rs2: u32, rs1: u32, imm: i32) -> u32 {
        let imm = imm as u32 & 0xfff;
        ((imm >> 5) << 25) | (rs2 << 20) | (rs1 << 15) | (2 << 12) | ((imm & 0x1f) << 7) | 0x23
    }

    pub fn csrrw(rd: u32, csr: u32, rs1: u32) -> u32 {
        (csr << 20) | (rs1 << 15) | (1 << 12) | (rd << 7) | 0x73
    }

    pub fn csrrs(rd: u32, csr: u32, rs1: u32) -> u32 {
        (csr << 20) | (rs1 << 15) | (2 << 12) | (rd << 7) | 0x73
    }

    pub const ECALL: u32 = 0x0000_0073;
    pub const MRET: u32 = 0x3020_0073;
}

/// Minimal ELF64 executable with one loadable segment per entry.
pub fn elf64(segments: &[(u64, &[u8])]) -> Vec<u8> {
    let phoff = ELF64_EHDR_SIZE;
    let data_start = phoff + segments.len() * ELF64_PHDR_SIZE;
    let mut out = vec![0u8; data_start];
    out[..4].copy_from_slice(&ELF_MAGIC.to_le_bytes());
    out[4] = ELF_CLASS_64;
    out[5] = ELF_DATA_LSB;
    out[6] = ELF_VERSION_CURRENT;
    out[16..18].copy_from_slice(&ELF_TYPE_EXEC.to_le_bytes());
    out[18..20].copy_from_slice(&ELF_MACHINE_RISCV.to_le_bytes());
    out[24..32].copy_from_slice(&segments.first().map_or(0, |s| s.0).to_le_bytes());
    out[32..40].copy_from_slice(&(phoff as u64).to_le_bytes());
    out[52..54].copy_from_slice(&(ELF64_EHDR_SIZE as u16).to_le_bytes());
    out[54..56].copy_from_slice(&(ELF64_PHDR_SIZE as u16).to_le_bytes());
    out[56..58].copy_from_slice(&(segments.len() as u16).to_le_bytes());

    let mut file_offset = data_start as u64;
    for (i, (vaddr, bytes)) in segments.iter().enumerate() {
        let ph = phoff + i * ELF64_PHDR_SIZE;
        let len = bytes.len() as u64;
        out[ph..ph + 4].copy_from_slice(&PT_LOAD.to_le_bytes());
        out[ph + 4..ph + 8].copy_from_slice(&(PF_R | PF_X).to_le_bytes());
        out[ph + 8..ph + 16].copy_from_slice(&file_offset.to_le_bytes());
        out[ph + 16..ph + 24].copy_from_slice(&vaddr.to_le_bytes());
        out[ph + 24..ph + 32].copy_from_slice(&vaddr.to_le_bytes());
        out[ph + 32..ph + 40].copy_from_slice(&len.to_le_bytes());
        out[ph + 40..ph + 48].copy_from_slice(&len.to_le_bytes());
        file_offset += len;
    }
    for (_, bytes) in segments {
        out.extend_from_slice(bytes);
    }
    out
}

/// Temporary directory holding a program image, traces and audit output.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `instructions` at [`BASE`] as an ELF image.
    pub fn program(&self, instructions: &[u32]) -> PathBuf {
        let code: Vec<u8> = instructions.iter().flat_map(|i| i.to_le_bytes()).collect();
        self.image("program.elf", &[(BASE, &code)])
    }

    pub fn image(&self, name: &str, segments: &[(u64, &[u8])]) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, elf64(segments)).expect("failed to write image");
        path
    }

    pub fn audit_path(&self) -> PathBuf {
        self.path("audit.txt")
    }

    pub fn config(&self) -> CheckConfig {
        CheckConfig::new().with_audit(AuditSink::File(self.audit_path()))
    }

    /// Run `trace` through a fresh checker with `config`.
    pub fn check_with(&self, config: &CheckConfig, trace: &str) -> Result<CheckStats> {
        let mut checker = Checker::new(config)?;
        checker.check_reader(trace.as_bytes(), |_| {})
    }

    pub fn check(&self, trace: &str) -> Result<CheckStats> {
        self.check_with(&self.config(), trace)
    }

    /// Audit lines written so far.
    pub fn audit(&self) -> Vec<String> {
        fs::read_to_string(self.audit_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Trace prologue: load `image` and create hart 0 starting at [`BASE`].
pub fn prologue(image: &Path, isa: &str) -> String {
    format!(
        "elf load {} 0\nrv new 0 {isa} msu\nrv set pc 0 {BASE:#x}\n",
        image.display()
    )
}
