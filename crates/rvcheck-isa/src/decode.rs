//! Instruction decoder.
//!
//! Compressed instructions decode to the same [`Op`] as their 32-bit expansion,
//! with `size == 2`, so the executor only needs one implementation per operation.

use crate::compressed::decode_compressed;
use crate::encode::{
    decode_b_imm, decode_csr, decode_funct3, decode_funct7, decode_i_imm, decode_j_imm,
    decode_opcode, decode_rd, decode_rs1, decode_rs2, decode_s_imm, decode_u_imm,
};
use crate::{Isa, Xlen};

/// Read-modify-write operation of an AMO instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AmoOp {
    Swap,
    Add,
    Xor,
    And,
    Or,
    Min,
    Max,
    Minu,
    Maxu,
}

/// Operation identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    // RV32I / RV64I
    Lui,
    Auipc,
    Jal,
    Jalr,
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
    Lb,
    Lh,
    Lw,
    Ld,
    Lbu,
    Lhu,
    Lwu,
    Sb,
    Sh,
    Sw,
    Sd,
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    Addiw,
    Slliw,
    Srliw,
    Sraiw,
    Addw,
    Subw,
    Sllw,
    Srlw,
    Sraw,
    Fence,
    Ecall,
    Ebreak,
    // Privileged
    Mret,
    Sret,
    Wfi,
    SfenceVma,
    // M
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
    Mulw,
    Divw,
    Divuw,
    Remw,
    Remuw,
    // A
    LrW,
    ScW,
    LrD,
    ScD,
    AmoW(AmoOp),
    AmoD(AmoOp),
    // Zicsr
    Csrrw,
    Csrrs,
    Csrrc,
    Csrrwi,
    Csrrsi,
    Csrrci,
    // Zifencei
    FenceI,
}

/// Instruction argument patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstrArgs {
    /// R-type: rd, rs1, rs2
    R { rd: u8, rs1: u8, rs2: u8 },
    /// I-type: rd, rs1, imm
    I { rd: u8, rs1: u8, imm: i32 },
    /// S-type: rs1, rs2, imm
    S { rs1: u8, rs2: u8, imm: i32 },
    /// B-type: rs1, rs2, imm
    B { rs1: u8, rs2: u8, imm: i32 },
    /// U-type: rd, imm
    U { rd: u8, imm: i32 },
    /// J-type: rd, imm
    J { rd: u8, imm: i32 },
    /// CSR: rd, rs1, csr
    Csr { rd: u8, rs1: u8, csr: u16 },
    /// CSRI: rd, imm, csr
    CsrI { rd: u8, imm: u8, csr: u16 },
    /// AMO: rd, rs1, rs2
    Amo { rd: u8, rs1: u8, rs2: u8 },
    /// No arguments (ECALL, EBREAK, etc.)
    None,
}

/// Decoded instruction with all fields extracted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedInstr {
    pub op: Op,
    /// Instruction size in bytes (2 for compressed, 4 for normal).
    pub size: u8,
    /// Raw encoding as fetched (16 or 32 bits).
    pub raw: u32,
    pub args: InstrArgs,
}

impl DecodedInstr {
    #[must_use]
    pub const fn new(op: Op, size: u8, raw: u32, args: InstrArgs) -> Self {
        Self { op, size, raw, args }
    }
}

/// Decode one instruction given its raw bits.
///
/// The low two bits select the format: anything but `0b11` is a compressed
/// parcel and only the low 16 bits of `raw` are used. Returns `None` for
/// encodings that are illegal under `isa`.
#[must_use]
pub fn decode(raw: u32, isa: &Isa) -> Option<DecodedInstr> {
    if raw & 0x3 == 0x3 {
        decode_32bit(raw, isa)
    } else if isa.has('c') {
        let parcel = (raw & 0xFFFF) as u16;
        decode_compressed(parcel, isa.xlen)
            .map(|(op, args)| DecodedInstr::new(op, 2, u32::from(parcel), args))
    } else {
        None
    }
}

fn decode_32bit(instr: u32, isa: &Isa) -> Option<DecodedInstr> {
    let xlen = isa.xlen;
    let opcode = decode_opcode(instr);
    let funct3 = decode_funct3(instr);
    let funct7 = decode_funct7(instr);
    let rd = decode_rd(instr);
    let rs1 = decode_rs1(instr);
    let rs2 = decode_rs2(instr);
    let rv64 = xlen == Xlen::Rv64;

    let (op, args) = match opcode {
        0x37 => (
            Op::Lui,
            InstrArgs::U {
                rd,
                imm: decode_u_imm(instr),
            },
        ),
        0x17 => (
            Op::Auipc,
            InstrArgs::U {
                rd,
                imm: decode_u_imm(instr),
            },
        ),
        0x6F => (
            Op::Jal,
            InstrArgs::J {
                rd,
                imm: decode_j_imm(instr),
            },
        ),
        0x67 if funct3 == 0 => (
            Op::Jalr,
            InstrArgs::I {
                rd,
                rs1,
                imm: decode_i_imm(instr),
            },
        ),
        0x63 => decode_branch(funct3, rs1, rs2, instr)?,
        0x03 => decode_load(xlen, funct3, rd, rs1, instr)?,
        0x23 => decode_store(xlen, funct3, rs1, rs2, instr)?,
        0x13 => decode_op_imm(xlen, funct3, funct7, rd, rs1, instr)?,
        0x1B if rv64 => decode_op_imm_32(funct3, funct7, rd, rs1, instr)?,
        0x33 if funct7 == 0x01 && isa.has('m') => decode_mul(funct3, rd, rs1, rs2),
        0x33 => decode_op(funct3, funct7, rd, rs1, rs2)?,
        0x3B if rv64 && funct7 == 0x01 && isa.has('m') => decode_mul_32(funct3, rd, rs1, rs2)?,
        0x3B if rv64 => decode_op_32(funct3, funct7, rd, rs1, rs2)?,
        0x2F if isa.has('a') => decode_amo(xlen, funct3, rd, rs1, rs2, instr)?,
        0x0F if funct3 == 0 => (Op::Fence, InstrArgs::None),
        0x0F if funct3 == 1 => (Op::FenceI, InstrArgs::None),
        0x73 if funct3 == 0 => decode_system(instr, funct7, rd)?,
        0x73 => decode_csr_op(funct3, rd, rs1, instr)?,
        _ => return None,
    };

    Some(DecodedInstr::new(op, 4, instr, args))
}

const fn decode_branch(funct3: u8, rs1: u8, rs2: u8, instr: u32) -> Option<(Op, InstrArgs)> {
    let imm = decode_b_imm(instr);
    let op = match funct3 {
        0 => Op::Beq,
        1 => Op::Bne,
        4 => Op::Blt,
        5 => Op::Bge,
        6 => Op::Bltu,
        7 => Op::Bgeu,
        _ => return None,
    };
    Some((op, InstrArgs::B { rs1, rs2, imm }))
}

fn decode_load(xlen: Xlen, funct3: u8, rd: u8, rs1: u8, instr: u32) -> Option<(Op, InstrArgs)> {
    let imm = decode_i_imm(instr);
    let rv64 = xlen == Xlen::Rv64;
    let op = match funct3 {
        0 => Op::Lb,
        1 => Op::Lh,
        2 => Op::Lw,
        3 if rv64 => Op::Ld,
        4 => Op::Lbu,
        5 => Op::Lhu,
        6 if rv64 => Op::Lwu,
        _ => return None,
    };
    Some((op, InstrArgs::I { rd, rs1, imm }))
}

fn decode_store(xlen: Xlen, funct3: u8, rs1: u8, rs2: u8, instr: u32) -> Option<(Op, InstrArgs)> {
    let imm = decode_s_imm(instr);
    let op = match funct3 {
        0 => Op::Sb,
        1 => Op::Sh,
        2 => Op::Sw,
        3 if xlen == Xlen::Rv64 => Op::Sd,
        _ => return None,
    };
    Some((op, InstrArgs::S { rs1, rs2, imm }))
}

fn decode_op_imm(
    xlen: Xlen,
    funct3: u8,
    funct7: u8,
    rd: u8,
    rs1: u8,
    instr: u32,
) -> Option<(Op, InstrArgs)> {
    let imm = decode_i_imm(instr);
    let shamt = (instr >> 20) & 0x3F;
    if (funct3 == 1 || funct3 == 5) && xlen == Xlen::Rv32 && shamt & 0x20 != 0 {
        return None;
    }
    let op = match funct3 {
        0 => Op::Addi,
        1 if (funct7 & 0xFE) == 0 => Op::Slli,
        2 => Op::Slti,
        3 => Op::Sltiu,
        4 => Op::Xori,
        5 if (funct7 & 0xFE) == 0 => Op::Srli,
        5 if (funct7 & 0xFE) == 0x20 => Op::Srai,
        6 => Op::Ori,
        7 => Op::Andi,
        _ => return None,
    };
    let imm = if funct3 == 1 || funct3 == 5 {
        shamt as i32
    } else {
        imm
    };
    Some((op, InstrArgs::I { rd, rs1, imm }))
}

const fn decode_op_imm_32(
    funct3: u8,
    funct7: u8,
    rd: u8,
    rs1: u8,
    instr: u32,
) -> Option<(Op, InstrArgs)> {
    let imm = decode_i_imm(instr);
    let shamt = ((instr >> 20) & 0x1F) as i32;
    let op = match funct3 {
        0 => Op::Addiw,
        1 if funct7 == 0 => Op::Slliw,
        5 if funct7 == 0 => Op::Srliw,
        5 if funct7 == 0x20 => Op::Sraiw,
        _ => return None,
    };
    let imm = if funct3 == 1 || funct3 == 5 {
        shamt
    } else {
        imm
    };
    Some((op, InstrArgs::I { rd, rs1, imm }))
}

const fn decode_op(funct3: u8, funct7: u8, rd: u8, rs1: u8, rs2: u8) -> Option<(Op, InstrArgs)> {
    let op = match (funct7, funct3) {
        (0x00, 0) => Op::Add,
        (0x20, 0) => Op::Sub,
        (0x00, 1) => Op::Sll,
        (0x00, 2) => Op::Slt,
        (0x00, 3) => Op::Sltu,
        (0x00, 4) => Op::Xor,
        (0x00, 5) => Op::Srl,
        (0x20, 5) => Op::Sra,
        (0x00, 6) => Op::Or,
        (0x00, 7) => Op::And,
        _ => return None,
    };
    Some((op, InstrArgs::R { rd, rs1, rs2 }))
}

const fn decode_op_32(
    funct3: u8,
    funct7: u8,
    rd: u8,
    rs1: u8,
    rs2: u8,
) -> Option<(Op, InstrArgs)> {
    let op = match (funct7, funct3) {
        (0x00, 0) => Op::Addw,
        (0x20, 0) => Op::Subw,
        (0x00, 1) => Op::Sllw,
        (0x00, 5) => Op::Srlw,
        (0x20, 5) => Op::Sraw,
        _ => return None,
    };
    Some((op, InstrArgs::R { rd, rs1, rs2 }))
}

const fn decode_mul(funct3: u8, rd: u8, rs1: u8, rs2: u8) -> (Op, InstrArgs) {
    let op = match funct3 {
        0 => Op::Mul,
        1 => Op::Mulh,
        2 => Op::Mulhsu,
        3 => Op::Mulhu,
        4 => Op::Div,
        5 => Op::Divu,
        6 => Op::Rem,
        _ => Op::Remu,
    };
    (op, InstrArgs::R { rd, rs1, rs2 })
}

const fn decode_mul_32(funct3: u8, rd: u8, rs1: u8, rs2: u8) -> Option<(Op, InstrArgs)> {
    let op = match funct3 {
        0 => Op::Mulw,
        4 => Op::Divw,
        5 => Op::Divuw,
        6 => Op::Remw,
        7 => Op::Remuw,
        _ => return None,
    };
    Some((op, InstrArgs::R { rd, rs1, rs2 }))
}

fn decode_amo(
    xlen: Xlen,
    funct3: u8,
    rd: u8,
    rs1: u8,
    rs2: u8,
    instr: u32,
) -> Option<(Op, InstrArgs)> {
    let double = match funct3 {
        2 => false,
        3 if xlen == Xlen::Rv64 => true,
        _ => return None,
    };
    let funct5 = (instr >> 27) & 0x1F;
    let amo = match funct5 {
        0b00010 if rs2 == 0 => {
            let op = if double { Op::LrD } else { Op::LrW };
            return Some((op, InstrArgs::Amo { rd, rs1, rs2 }));
        }
        0b00011 => {
            let op = if double { Op::ScD } else { Op::ScW };
            return Some((op, InstrArgs::Amo { rd, rs1, rs2 }));
        }
        0b00001 => AmoOp::Swap,
        0b00000 => AmoOp::Add,
        0b00100 => AmoOp::Xor,
        0b01100 => AmoOp::And,
        0b01000 => AmoOp::Or,
        0b10000 => AmoOp::Min,
        0b10100 => AmoOp::Max,
        0b11000 => AmoOp::Minu,
        0b11100 => AmoOp::Maxu,
        _ => return None,
    };
    let op = if double { Op::AmoD(amo) } else { Op::AmoW(amo) };
    Some((op, InstrArgs::Amo { rd, rs1, rs2 }))
}

const fn decode_system(instr: u32, funct7: u8, rd: u8) -> Option<(Op, InstrArgs)> {
    match instr {
        0x0000_0073 => Some((Op::Ecall, InstrArgs::None)),
        0x0010_0073 => Some((Op::Ebreak, InstrArgs::None)),
        0x3020_0073 => Some((Op::Mret, InstrArgs::None)),
        0x1020_0073 => Some((Op::Sret, InstrArgs::None)),
        0x1050_0073 => Some((Op::Wfi, InstrArgs::None)),
        _ if funct7 == 0x09 && rd == 0 => Some((Op::SfenceVma, InstrArgs::None)),
        _ => None,
    }
}

const fn decode_csr_op(funct3: u8, rd: u8, rs1: u8, instr: u32) -> Option<(Op, InstrArgs)> {
    let csr = decode_csr(instr);
    let decoded = match funct3 {
        1 => (Op::Csrrw, InstrArgs::Csr { rd, rs1, csr }),
        2 => (Op::Csrrs, InstrArgs::Csr { rd, rs1, csr }),
        3 => (Op::Csrrc, InstrArgs::Csr { rd, rs1, csr }),
        5 => (Op::Csrrwi, InstrArgs::CsrI { rd, imm: rs1, csr }),
        6 => (Op::Csrrsi, InstrArgs::CsrI { rd, imm: rs1, csr }),
        7 => (Op::Csrrci, InstrArgs::CsrI { rd, imm: rs1, csr }),
        _ => return None,
    };
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rv64() -> Isa {
        Isa::parse("rv64gc").unwrap()
    }

    #[test]
    fn test_decode_addi() {
        let instr = decode(0x0641_0093, &rv64()).unwrap();
        assert_eq!(instr.op, Op::Addi);
        assert_eq!(instr.size, 4);
        assert_eq!(
            instr.args,
            InstrArgs::I {
                rd: 1,
                rs1: 2,
                imm: 100
            }
        );
    }

    #[test]
    fn test_decode_system_ops() {
        let isa = rv64();
        assert_eq!(decode(0x3020_0073, &isa).unwrap().op, Op::Mret);
        assert_eq!(decode(0x1020_0073, &isa).unwrap().op, Op::Sret);
        assert_eq!(decode(0x0000_0073, &isa).unwrap().op, Op::Ecall);
        // URET is not implemented
        assert!(decode(0x0020_0073, &isa).is_none());
    }

    #[test]
    fn test_decode_csr() {
        let instr = decode(0x3002_9073, &rv64()).unwrap();
        assert_eq!(instr.op, Op::Csrrw);
        assert_eq!(
            instr.args,
            InstrArgs::Csr {
                rd: 0,
                rs1: 5,
                csr: 0x300
            }
        );
    }

    #[test]
    fn test_decode_respects_extensions() {
        let base = Isa::parse("rv32i").unwrap();
        // mul x1, x2, x3
        assert!(decode(0x0231_00B3, &base).is_none());
        assert_eq!(decode(0x0231_00B3, &rv64()).unwrap().op, Op::Mul);
        // ld is RV64 only
        assert!(decode(0x0001_3083, &base).is_none());
        // c.li a0, 0
        assert!(decode(0x4501, &base).is_none());
        assert_eq!(decode(0x4501, &rv64()).unwrap().size, 2);
        // slli x1, x1, 32 is illegal on RV32
        assert!(decode(0x0200_9093, &base).is_none());
    }

    #[test]
    fn test_decode_amo() {
        // amoadd.w x1, x2, (x3)
        let instr = decode(0x0021_A0AF, &rv64()).unwrap();
        assert_eq!(instr.op, Op::AmoW(AmoOp::Add));
        // lr.d x1, (x3)
        let instr = decode(0x1001_B0AF, &rv64()).unwrap();
        assert_eq!(instr.op, Op::LrD);
    }
}
