//! CSR addresses, names, and SYSTEM-opcode classification.

use crate::encode::{decode_funct3, decode_opcode};

/// SYSTEM major opcode (ECALL/EBREAK/xRET/WFI and the Zicsr instructions).
pub const OPCODE_SYSTEM: u8 = 0x73;

// Privilege-return encodings
pub const MRET: u32 = 0x3020_0073;
pub const SRET: u32 = 0x1020_0073;
pub const URET: u32 = 0x0020_0073;
pub const WFI: u32 = 0x1050_0073;
pub const ECALL: u32 = 0x0000_0073;
pub const EBREAK: u32 = 0x0010_0073;

// Unprivileged counters
pub const CSR_CYCLE: u16 = 0xC00;
pub const CSR_TIME: u16 = 0xC01;
pub const CSR_INSTRET: u16 = 0xC02;
pub const CSR_CYCLEH: u16 = 0xC80;
pub const CSR_TIMEH: u16 = 0xC81;
pub const CSR_INSTRETH: u16 = 0xC82;

// Supervisor
pub const CSR_SSTATUS: u16 = 0x100;
pub const CSR_SIE: u16 = 0x104;
pub const CSR_STVEC: u16 = 0x105;
pub const CSR_SCOUNTEREN: u16 = 0x106;
pub const CSR_SENVCFG: u16 = 0x10A;
pub const CSR_SSCRATCH: u16 = 0x140;
pub const CSR_SEPC: u16 = 0x141;
pub const CSR_SCAUSE: u16 = 0x142;
pub const CSR_STVAL: u16 = 0x143;
pub const CSR_SIP: u16 = 0x144;
pub const CSR_SATP: u16 = 0x180;

// Machine
pub const CSR_MSTATUS: u16 = 0x300;
pub const CSR_MISA: u16 = 0x301;
pub const CSR_MEDELEG: u16 = 0x302;
pub const CSR_MIDELEG: u16 = 0x303;
pub const CSR_MIE: u16 = 0x304;
pub const CSR_MTVEC: u16 = 0x305;
pub const CSR_MCOUNTEREN: u16 = 0x306;
pub const CSR_MENVCFG: u16 = 0x30A;
pub const CSR_MSTATUSH: u16 = 0x310;
pub const CSR_MCOUNTINHIBIT: u16 = 0x320;
pub const CSR_MSCRATCH: u16 = 0x340;
pub const CSR_MEPC: u16 = 0x341;
pub const CSR_MCAUSE: u16 = 0x342;
pub const CSR_MTVAL: u16 = 0x343;
pub const CSR_MIP: u16 = 0x344;
pub const CSR_PMPCFG0: u16 = 0x3A0;
pub const CSR_PMPADDR0: u16 = 0x3B0;
pub const CSR_MCYCLE: u16 = 0xB00;
pub const CSR_MINSTRET: u16 = 0xB02;
pub const CSR_MCYCLEH: u16 = 0xB80;
pub const CSR_MINSTRETH: u16 = 0xB82;
pub const CSR_MVENDORID: u16 = 0xF11;
pub const CSR_MARCHID: u16 = 0xF12;
pub const CSR_MIMPID: u16 = 0xF13;
pub const CSR_MHARTID: u16 = 0xF14;

/// Address bits compared when matching a DUT CSR write against a reference write.
///
/// Bits 8 and 9 (the privilege field) are ignored, so a supervisor alias such as
/// `sstatus` matches its machine register.
pub const CSR_MATCH_MASK: u32 = 0xCFF;

/// True for MRET, SRET and URET.
#[must_use]
pub const fn is_privilege_return(raw: u64) -> bool {
    matches!(raw, 0x3020_0073 | 0x1020_0073 | 0x0020_0073)
}

/// True for the Zicsr instructions: SYSTEM opcode with funct3 bits 0..1 set.
///
/// funct3 values 0 and 4 (privileged ops, hypervisor loads and stores) are
/// not CSR accesses.
#[must_use]
pub const fn is_csr_access(raw: u64) -> bool {
    let raw = raw as u32;
    decode_opcode(raw) == OPCODE_SYSTEM && decode_funct3(raw) & 0b011 != 0
}

/// Lowest privilege level allowed to access a CSR (bits [9:8]).
#[must_use]
pub const fn csr_min_privilege(csr: u16) -> u8 {
    ((csr >> 8) & 0x3) as u8
}

/// True if the CSR is read-only (bits [11:10] == 0b11).
#[must_use]
pub const fn csr_is_read_only(csr: u16) -> bool {
    (csr >> 10) & 0x3 == 0x3
}
