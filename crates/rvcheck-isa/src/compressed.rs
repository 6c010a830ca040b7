//! RVC decoder. Each parcel expands to the base-ISA operation it stands for.

use crate::decode::{InstrArgs, Op};
use crate::Xlen;

/// Decode a 16-bit parcel into its expanded operation.
pub fn decode_compressed(instr: u16, xlen: Xlen) -> Option<(Op, InstrArgs)> {
    let quadrant = instr & 0x3;
    let funct3 = ((instr >> 13) & 0x7) as u8;
    match quadrant {
        0b00 => decode_q0(instr, funct3, xlen),
        0b01 => decode_q1(instr, funct3, xlen),
        0b10 => decode_q2(instr, funct3, xlen),
        _ => None,
    }
}

const fn creg(bits: u16) -> u8 {
    (bits & 0x7) as u8 + 8
}

fn decode_q0(instr: u16, funct3: u8, xlen: Xlen) -> Option<(Op, InstrArgs)> {
    let rd = creg(instr >> 2);
    let rs1 = creg(instr >> 7);
    match funct3 {
        // c.addi4spn
        0b000 => {
            let nzuimm = decode_addi4spn_imm(instr);
            if nzuimm == 0 {
                return None;
            }
            Some((
                Op::Addi,
                InstrArgs::I {
                    rd,
                    rs1: 2,
                    imm: i32::from(nzuimm),
                },
            ))
        }
        0b010 => Some((
            Op::Lw,
            InstrArgs::I {
                rd,
                rs1,
                imm: i32::from(decode_cl_lw_offset(instr)),
            },
        )),
        0b011 if xlen == Xlen::Rv64 => Some((
            Op::Ld,
            InstrArgs::I {
                rd,
                rs1,
                imm: i32::from(decode_cl_ld_offset(instr)),
            },
        )),
        0b110 => Some((
            Op::Sw,
            InstrArgs::S {
                rs1,
                rs2: rd,
                imm: i32::from(decode_cl_lw_offset(instr)),
            },
        )),
        0b111 if xlen == Xlen::Rv64 => Some((
            Op::Sd,
            InstrArgs::S {
                rs1,
                rs2: rd,
                imm: i32::from(decode_cl_ld_offset(instr)),
            },
        )),
        _ => None,
    }
}

fn decode_q1(instr: u16, funct3: u8, xlen: Xlen) -> Option<(Op, InstrArgs)> {
    let rd = ((instr >> 7) & 0x1F) as u8;
    match funct3 {
        // c.addi / c.nop
        0b000 => Some((
            Op::Addi,
            InstrArgs::I {
                rd,
                rs1: rd,
                imm: i32::from(decode_ci_imm(instr)),
            },
        )),
        0b001 if xlen == Xlen::Rv64 => {
            if rd == 0 {
                return None;
            }
            Some((
                Op::Addiw,
                InstrArgs::I {
                    rd,
                    rs1: rd,
                    imm: i32::from(decode_ci_imm(instr)),
                },
            ))
        }
        // c.jal (RV32 only)
        0b001 => Some((
            Op::Jal,
            InstrArgs::J {
                rd: 1,
                imm: i32::from(decode_cj_imm(instr)),
            },
        )),
        // c.li
        0b010 => Some((
            Op::Addi,
            InstrArgs::I {
                rd,
                rs1: 0,
                imm: i32::from(decode_ci_imm(instr)),
            },
        )),
        0b011 if rd == 2 => {
            let imm = decode_ci16sp_imm(instr);
            if imm == 0 {
                return None;
            }
            Some((
                Op::Addi,
                InstrArgs::I {
                    rd: 2,
                    rs1: 2,
                    imm: i32::from(imm),
                },
            ))
        }
        0b011 => {
            let imm = decode_ci_lui_imm(instr);
            if imm == 0 || rd == 0 {
                return None;
            }
            Some((Op::Lui, InstrArgs::U { rd, imm }))
        }
        0b100 => decode_misc_alu(instr, xlen),
        // c.j
        0b101 => Some((
            Op::Jal,
            InstrArgs::J {
                rd: 0,
                imm: i32::from(decode_cj_imm(instr)),
            },
        )),
        0b110 | 0b111 => {
            let op = if funct3 == 0b110 { Op::Beq } else { Op::Bne };
            Some((
                op,
                InstrArgs::B {
                    rs1: creg(instr >> 7),
                    rs2: 0,
                    imm: i32::from(decode_cb_imm(instr)),
                },
            ))
        }
        _ => None,
    }
}

fn decode_misc_alu(instr: u16, xlen: Xlen) -> Option<(Op, InstrArgs)> {
    let funct2 = ((instr >> 10) & 0x3) as u8;
    let rd = creg(instr >> 7);

    match funct2 {
        0b00 | 0b01 => {
            let shamt = decode_ci_shamt(instr, xlen)?;
            let op = if funct2 == 0b00 { Op::Srli } else { Op::Srai };
            Some((
                op,
                InstrArgs::I {
                    rd,
                    rs1: rd,
                    imm: i32::from(shamt),
                },
            ))
        }
        0b10 => Some((
            Op::Andi,
            InstrArgs::I {
                rd,
                rs1: rd,
                imm: i32::from(decode_ci_imm(instr)),
            },
        )),
        _ => {
            let rs2 = creg(instr >> 2);
            let wide = (instr >> 12) & 0x1 == 1;
            let op = match (wide, (instr >> 5) & 0x3) {
                (false, 0b00) => Op::Sub,
                (false, 0b01) => Op::Xor,
                (false, 0b10) => Op::Or,
                (false, _) => Op::And,
                (true, 0b00) if xlen == Xlen::Rv64 => Op::Subw,
                (true, 0b01) if xlen == Xlen::Rv64 => Op::Addw,
                _ => return None,
            };
            Some((op, InstrArgs::R { rd, rs1: rd, rs2 }))
        }
    }
}

fn decode_q2(instr: u16, funct3: u8, xlen: Xlen) -> Option<(Op, InstrArgs)> {
    let rd = ((instr >> 7) & 0x1F) as u8;
    let rs2 = ((instr >> 2) & 0x1F) as u8;
    match funct3 {
        0b000 => {
            let shamt = decode_ci_shamt(instr, xlen)?;
            if rd == 0 {
                return None;
            }
            Some((
                Op::Slli,
                InstrArgs::I {
                    rd,
                    rs1: rd,
                    imm: i32::from(shamt),
                },
            ))
        }
        0b010 => {
            if rd == 0 {
                return None;
            }
            Some((
                Op::Lw,
                InstrArgs::I {
                    rd,
                    rs1: 2,
                    imm: i32::from(decode_ci_lwsp_offset(instr)),
                },
            ))
        }
        0b011 if xlen == Xlen::Rv64 => {
            if rd == 0 {
                return None;
            }
            Some((
                Op::Ld,
                InstrArgs::I {
                    rd,
                    rs1: 2,
                    imm: i32::from(decode_ci_ldsp_offset(instr)),
                },
            ))
        }
        0b100 => {
            let funct4 = (instr >> 12) & 0x1;
            match (funct4, rd, rs2) {
                (0, 0, 0) => None,
                // c.jr
                (0, rs1, 0) => Some((Op::Jalr, InstrArgs::I { rd: 0, rs1, imm: 0 })),
                // c.mv
                (0, rd, rs2) => Some((Op::Add, InstrArgs::R { rd, rs1: 0, rs2 })),
                (_, 0, 0) => Some((Op::Ebreak, InstrArgs::None)),
                // c.jalr
                (_, rs1, 0) => Some((Op::Jalr, InstrArgs::I { rd: 1, rs1, imm: 0 })),
                // c.add
                (_, rd, rs2) => Some((Op::Add, InstrArgs::R { rd, rs1: rd, rs2 })),
            }
        }
        0b110 => Some((
            Op::Sw,
            InstrArgs::S {
                rs1: 2,
                rs2,
                imm: i32::from(decode_css_swsp_offset(instr)),
            },
        )),
        0b111 if xlen == Xlen::Rv64 => Some((
            Op::Sd,
            InstrArgs::S {
                rs1: 2,
                rs2,
                imm: i32::from(decode_css_sdsp_offset(instr)),
            },
        )),
        _ => None,
    }
}

// Immediate decoders

const fn decode_addi4spn_imm(instr: u16) -> u16 {
    (((instr >> 6) & 0x1) << 2)
        | (((instr >> 5) & 0x1) << 3)
        | (((instr >> 11) & 0x3) << 4)
        | (((instr >> 7) & 0xF) << 6)
}

const fn decode_cl_lw_offset(instr: u16) -> u8 {
    ((((instr >> 6) & 0x1) << 2) | (((instr >> 10) & 0x7) << 3) | (((instr >> 5) & 0x1) << 6)) as u8
}

const fn decode_cl_ld_offset(instr: u16) -> u8 {
    ((((instr >> 10) & 0x7) << 3) | (((instr >> 5) & 0x3) << 6)) as u8
}

const fn decode_ci_imm(instr: u16) -> i8 {
    let imm = (((instr >> 2) & 0x1F) | (((instr >> 12) & 0x1) << 5)) as u8;
    ((imm as i8) << 2) >> 2
}

const fn decode_cj_imm(instr: u16) -> i16 {
    let imm = (((instr >> 3) & 0x7) << 1)
        | (((instr >> 11) & 0x1) << 4)
        | (((instr >> 2) & 0x1) << 5)
        | (((instr >> 7) & 0x1) << 6)
        | (((instr >> 6) & 0x1) << 7)
        | (((instr >> 9) & 0x3) << 8)
        | (((instr >> 8) & 0x1) << 10)
        | (((instr >> 12) & 0x1) << 11);
    ((imm as i16) << 4) >> 4
}

const fn decode_ci16sp_imm(instr: u16) -> i16 {
    let imm = (((instr >> 6) & 0x1) << 4)
        | (((instr >> 2) & 0x1) << 5)
        | (((instr >> 5) & 0x1) << 6)
        | (((instr >> 3) & 0x3) << 7)
        | (((instr >> 12) & 0x1) << 9);
    ((imm as i16) << 6) >> 6
}

const fn decode_ci_lui_imm(instr: u16) -> i32 {
    let imm = (((instr >> 2) & 0x1F) | (((instr >> 12) & 0x1) << 5)) as u32;
    let imm = imm << 12;
    ((imm as i32) << 14) >> 14
}

/// Shift amount; `shamt[5]` is reserved on RV32.
const fn decode_ci_shamt(instr: u16, xlen: Xlen) -> Option<u8> {
    let shamt = (((instr >> 2) & 0x1F) | (((instr >> 12) & 0x1) << 5)) as u8;
    if shamt & 0x20 != 0 && matches!(xlen, Xlen::Rv32) {
        None
    } else {
        Some(shamt)
    }
}

const fn decode_cb_imm(instr: u16) -> i16 {
    let imm = (((instr >> 3) & 0x3) << 1)
        | (((instr >> 10) & 0x3) << 3)
        | (((instr >> 2) & 0x1) << 5)
        | (((instr >> 5) & 0x3) << 6)
        | (((instr >> 12) & 0x1) << 8);
    ((imm as i16) << 7) >> 7
}

const fn decode_ci_lwsp_offset(instr: u16) -> u8 {
    ((((instr >> 4) & 0x7) << 2) | (((instr >> 12) & 0x1) << 5) | (((instr >> 2) & 0x3) << 6)) as u8
}

const fn decode_css_swsp_offset(instr: u16) -> u8 {
    ((((instr >> 9) & 0xF) << 2) | (((instr >> 7) & 0x3) << 6)) as u8
}

const fn decode_ci_ldsp_offset(instr: u16) -> u16 {
    (((instr >> 5) & 0x3) << 3) | (((instr >> 12) & 0x1) << 5) | (((instr >> 2) & 0x7) << 6)
}

const fn decode_css_sdsp_offset(instr: u16) -> u16 {
    (((instr >> 10) & 0x7) << 3) | (((instr >> 7) & 0x7) << 6)
}
