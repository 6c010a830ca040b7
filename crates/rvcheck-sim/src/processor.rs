//! Instruction-accurate reference processor.
//!
//! One call to [`Processor::step`] retires exactly one instruction or takes
//! one exception. Every architectural register write of the step is recorded
//! in a write log that is cleared at the start of the next step.

use rvcheck_isa::csr::{
    CSR_MCAUSE, CSR_MEPC, CSR_MSTATUS, CSR_MTVAL, CSR_SCAUSE, CSR_SEPC, CSR_SSTATUS, CSR_STVAL,
};
use rvcheck_isa::{
    AmoOp, DecodedInstr, InstrArgs, Isa, IsaError, NUM_REGS, Op, Privileges, RegTarget,
    RegWrite, Xlen, decode, instruction_length,
};
use tracing::trace;

use crate::bus::Bus;
use crate::csr::*;
use crate::trap::{Exception, Privilege, Trap};

/// PC after reset.
pub const RESET_PC: u64 = 0x1000;

/// Construction parameters for a [`Processor`].
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    /// ISA string, e.g. `rv64gc`.
    pub isa: String,
    /// Implemented privilege modes, e.g. `msu`.
    pub privilege: String,
    pub hart_id: u64,
}

/// Why a step did not retire normally.
enum Abort<E> {
    Trap(Trap),
    Bus(E),
}

impl<E> From<Trap> for Abort<E> {
    fn from(trap: Trap) -> Self {
        Self::Trap(trap)
    }
}

type Exec<T, E> = Result<T, Abort<E>>;

/// Reference RISC-V hart.
#[derive(Clone, Debug)]
pub struct Processor {
    isa: Isa,
    xlen: Xlen,
    regs: [u64; NUM_REGS],
    pc: u64,
    prv: Privilege,
    csrs: CsrFile,
    reservation: Option<u64>,
    last_instruction: u64,
    writes: Vec<RegWrite>,
}

impl Processor {
    /// Create a hart in its reset state.
    ///
    /// # Errors
    ///
    /// Returns an error if the ISA or privilege string is malformed.
    pub fn new(config: &ProcessorConfig) -> Result<Self, IsaError> {
        let isa = Isa::parse(&config.isa)?;
        let privileges = Privileges::parse(&config.privilege)?;
        let csrs = CsrFile::new(&isa, privileges, config.hart_id);
        Ok(Self {
            xlen: isa.xlen,
            isa,
            regs: [0; NUM_REGS],
            pc: RESET_PC,
            prv: Privilege::Machine,
            csrs,
            reservation: None,
            last_instruction: 0,
            writes: Vec::new(),
        })
    }

    #[must_use]
    pub const fn pc(&self) -> u64 {
        self.pc
    }

    pub const fn set_pc(&mut self, pc: u64) {
        self.pc = self.xlen.truncate(pc);
    }

    #[must_use]
    pub const fn xlen(&self) -> Xlen {
        self.xlen
    }

    #[must_use]
    pub const fn privilege(&self) -> Privilege {
        self.prv
    }

    /// Integer register value.
    #[must_use]
    pub fn reg(&self, index: u8) -> u64 {
        self.regs[usize::from(index) % NUM_REGS]
    }

    /// Set an integer register without logging it.
    pub fn set_reg(&mut self, index: u8, value: u64) {
        if index != 0 {
            self.regs[usize::from(index) % NUM_REGS] = self.xlen.truncate(value);
        }
    }

    /// CSR value without access checks.
    #[must_use]
    pub fn csr(&self, addr: u16) -> Option<u64> {
        self.csrs.peek(addr)
    }

    /// Raw bits of the instruction fetched by the last step (0 if the fetch faulted).
    #[must_use]
    pub const fn last_instruction(&self) -> u64 {
        self.last_instruction
    }

    /// Register writes of the last step, one entry per target.
    #[must_use]
    pub fn register_writes(&self) -> &[RegWrite] {
        &self.writes
    }

    /// Execute one instruction.
    ///
    /// Architectural exceptions are taken as traps and complete the step.
    ///
    /// # Errors
    ///
    /// Returns the bus error if a bus transaction aborted the step. The
    /// processor state is then unspecified.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        self.writes.clear();
        self.last_instruction = 0;
        let pc = self.pc;

        let outcome = self.fetch(bus, pc).and_then(|raw| {
            self.last_instruction = u64::from(raw);
            let instr = decode(raw, &self.isa).ok_or(Trap::illegal(u64::from(raw)))?;
            self.execute(bus, &instr, pc)
        });

        // A trapping instruction does not retire.
        let retired = match outcome {
            Ok(next_pc) => {
                self.pc = self.xlen.truncate(next_pc);
                true
            }
            Err(Abort::Trap(trap)) => {
                self.take_trap(trap, pc);
                false
            }
            Err(Abort::Bus(err)) => return Err(err),
        };
        self.csrs.tick(retired);
        Ok(())
    }

    fn fetch<B: Bus>(&self, bus: &mut B, pc: u64) -> Exec<u32, B::Error> {
        let align = if self.isa.has('c') { 1 } else { 3 };
        if pc & align != 0 {
            return Err(Trap::new(Exception::InstructionAddressMisaligned, pc).into());
        }
        let low = Self::fetch_parcel(bus, pc, pc)?;
        if instruction_length(low) == 2 {
            return Ok(u32::from(low));
        }
        let high = Self::fetch_parcel(bus, self.xlen.truncate(pc.wrapping_add(2)), pc)?;
        Ok(u32::from(low) | (u32::from(high) << 16))
    }

    fn fetch_parcel<B: Bus>(bus: &mut B, addr: u64, pc: u64) -> Exec<u16, B::Error> {
        let mut buf = [0u8; 2];
        if bus.fetch(addr, &mut buf).map_err(Abort::Bus)?.is_fault() {
            return Err(Trap::new(Exception::InstructionAccessFault, pc).into());
        }
        Ok(u16::from_le_bytes(buf))
    }

    fn log(&mut self, target: RegTarget, value: u64) {
        match self.writes.iter_mut().find(|w| w.target == target) {
            Some(write) => write.value = value,
            None => self.writes.push(RegWrite { target, value }),
        }
    }

    fn x(&self, reg: u8) -> u64 {
        self.regs[usize::from(reg)]
    }

    fn set_x(&mut self, rd: u8, value: u64) {
        let value = self.xlen.truncate(value);
        if rd != 0 {
            self.regs[usize::from(rd)] = value;
        }
        self.log(RegTarget::integer(rd), value);
    }

    fn set_csr_logged(&mut self, addr: u16, value: u64) {
        let value = self.xlen.truncate(value);
        self.log(RegTarget::csr(addr), value);
    }

    const fn imm(&self, imm: i32) -> u64 {
        self.xlen.from_signed(imm as i64)
    }

    fn jump_target(&self, target: u64) -> Result<u64, Trap> {
        let target = self.xlen.truncate(target);
        if !self.isa.has('c') && target & 2 != 0 {
            return Err(Trap::new(Exception::InstructionAddressMisaligned, target));
        }
        Ok(target)
    }

    #[allow(clippy::too_many_lines)]
    fn execute<B: Bus>(
        &mut self,
        bus: &mut B,
        instr: &DecodedInstr,
        pc: u64,
    ) -> Exec<u64, B::Error> {
        let xlen = self.xlen;
        let next = pc.wrapping_add(u64::from(instr.size));
        let raw = u64::from(instr.raw);

        match (instr.op, instr.args) {
            (Op::Lui, InstrArgs::U { rd, imm }) => self.set_x(rd, self.imm(imm)),
            (Op::Auipc, InstrArgs::U { rd, imm }) => {
                self.set_x(rd, pc.wrapping_add(self.imm(imm)));
            }
            (Op::Jal, InstrArgs::J { rd, imm }) => {
                let target = self.jump_target(pc.wrapping_add(self.imm(imm)))?;
                self.set_x(rd, next);
                return Ok(target);
            }
            (Op::Jalr, InstrArgs::I { rd, rs1, imm }) => {
                let target = self.jump_target(self.x(rs1).wrapping_add(self.imm(imm)) & !1)?;
                self.set_x(rd, next);
                return Ok(target);
            }
            (
                op @ (Op::Beq | Op::Bne | Op::Blt | Op::Bge | Op::Bltu | Op::Bgeu),
                InstrArgs::B { rs1, rs2, imm },
            ) => {
                let (a, b) = (self.x(rs1), self.x(rs2));
                let (sa, sb) = (xlen.to_signed(a), xlen.to_signed(b));
                let taken = match op {
                    Op::Beq => a == b,
                    Op::Bne => a != b,
                    Op::Blt => sa < sb,
                    Op::Bge => sa >= sb,
                    Op::Bltu => a < b,
                    _ => a >= b,
                };
                if taken {
                    return Ok(self.jump_target(pc.wrapping_add(self.imm(imm)))?);
                }
            }
            (
                op @ (Op::Lb | Op::Lh | Op::Lw | Op::Ld | Op::Lbu | Op::Lhu | Op::Lwu),
                InstrArgs::I { rd, rs1, imm },
            ) => {
                let addr = xlen.truncate(self.x(rs1).wrapping_add(self.imm(imm)));
                let (size, signed) = match op {
                    Op::Lb => (1, true),
                    Op::Lh => (2, true),
                    Op::Lw => (4, true),
                    Op::Lbu => (1, false),
                    Op::Lhu => (2, false),
                    Op::Lwu => (4, false),
                    _ => (8, false),
                };
                let value = Self::load(
                    bus,
                    addr,
                    size,
                    Exception::LoadAddressMisaligned,
                    Exception::LoadAccessFault,
                )?;
                let value = if signed { sign_extend(value, size) } else { value };
                self.set_x(rd, value);
            }
            (op @ (Op::Sb | Op::Sh | Op::Sw | Op::Sd), InstrArgs::S { rs1, rs2, imm }) => {
                let addr = xlen.truncate(self.x(rs1).wrapping_add(self.imm(imm)));
                let size = match op {
                    Op::Sb => 1,
                    Op::Sh => 2,
                    Op::Sw => 4,
                    _ => 8,
                };
                Self::store(bus, addr, size, self.x(rs2))?;
            }
            (op, InstrArgs::I { rd, rs1, imm }) if is_op_imm(op) => {
                let value = self.op_imm(op, self.x(rs1), imm);
                self.set_x(rd, value);
            }
            (op, InstrArgs::R { rd, rs1, rs2 }) if is_alu(op) => {
                let value = self.alu(op, self.x(rs1), self.x(rs2));
                self.set_x(rd, value);
            }
            (op, InstrArgs::Amo { rd, rs1, rs2 }) => self.atomic(bus, op, rd, rs1, rs2)?,
            (Op::Csrrw | Op::Csrrs | Op::Csrrc, InstrArgs::Csr { rd, rs1, csr }) => {
                let src = self.x(rs1);
                self.csr_op(instr.op, rd, csr, src, rs1 != 0, raw)?;
            }
            (Op::Csrrwi | Op::Csrrsi | Op::Csrrci, InstrArgs::CsrI { rd, imm, csr }) => {
                self.csr_op(instr.op, rd, csr, u64::from(imm), imm != 0, raw)?;
            }
            (Op::Fence | Op::FenceI, _) => {}
            (Op::Ecall, _) => return Err(Trap::new(Exception::ecall_from(self.prv), 0).into()),
            (Op::Ebreak, _) => return Err(Trap::new(Exception::Breakpoint, pc).into()),
            (Op::Mret, _) => return Ok(self.mret(raw)?),
            (Op::Sret, _) => return Ok(self.sret(raw)?),
            (Op::Wfi, _) => {
                let tw = self.csrs.mstatus & MSTATUS_TW != 0;
                if self.prv == Privilege::User || (self.prv == Privilege::Supervisor && tw) {
                    return Err(Trap::illegal(raw).into());
                }
            }
            (Op::SfenceVma, _) => {
                let tvm = self.csrs.mstatus & MSTATUS_TVM != 0;
                if self.prv == Privilege::User || (self.prv == Privilege::Supervisor && tvm) {
                    return Err(Trap::illegal(raw).into());
                }
            }
            _ => return Err(Trap::illegal(raw).into()),
        }

        Ok(next)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    fn op_imm(&self, op: Op, a: u64, imm: i32) -> u64 {
        let xlen = self.xlen;
        let b = self.imm(imm);
        let shamt = (imm as u32) & xlen.shift_mask();
        match op {
            Op::Addi => a.wrapping_add(b),
            Op::Slti => u64::from(xlen.to_signed(a) < i64::from(imm)),
            Op::Sltiu => u64::from(a < b),
            Op::Xori => a ^ b,
            Op::Ori => a | b,
            Op::Andi => a & b,
            Op::Slli => a << shamt,
            Op::Srli => a >> shamt,
            Op::Srai => xlen.from_signed(xlen.to_signed(a) >> shamt),
            Op::Addiw => sext32(a.wrapping_add(b) as u32),
            Op::Slliw => sext32((a as u32) << (shamt & 0x1F)),
            Op::Srliw => sext32((a as u32) >> (shamt & 0x1F)),
            _ => sext32(((a as i32) >> (shamt & 0x1F)) as u32),
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    fn alu(&self, op: Op, a: u64, b: u64) -> u64 {
        let xlen = self.xlen;
        let bits = u32::from(xlen.bits());
        let shamt = (b as u32) & xlen.shift_mask();
        let (sa, sb) = (xlen.to_signed(a), xlen.to_signed(b));
        let (wa, wb) = (a as u32, b as u32);
        match op {
            Op::Add => a.wrapping_add(b),
            Op::Sub => a.wrapping_sub(b),
            Op::Sll => a << shamt,
            Op::Slt => u64::from(sa < sb),
            Op::Sltu => u64::from(a < b),
            Op::Xor => a ^ b,
            Op::Srl => a >> shamt,
            Op::Sra => xlen.from_signed(sa >> shamt),
            Op::Or => a | b,
            Op::And => a & b,
            Op::Addw => sext32(wa.wrapping_add(wb)),
            Op::Subw => sext32(wa.wrapping_sub(wb)),
            Op::Sllw => sext32(wa << (wb & 0x1F)),
            Op::Srlw => sext32(wa >> (wb & 0x1F)),
            Op::Sraw => sext32(((wa as i32) >> (wb & 0x1F)) as u32),
            Op::Mul => a.wrapping_mul(b),
            Op::Mulh => ((i128::from(sa) * i128::from(sb)) >> bits) as u64,
            Op::Mulhsu => ((i128::from(sa) * i128::from(b)) >> bits) as u64,
            Op::Mulhu => ((u128::from(a) * u128::from(b)) >> bits) as u64,
            Op::Div if sb == 0 => u64::MAX,
            Op::Div => xlen.from_signed(sa.wrapping_div(sb)),
            Op::Divu if b == 0 => u64::MAX,
            Op::Divu => a / b,
            Op::Rem if sb == 0 => a,
            Op::Rem => xlen.from_signed(sa.wrapping_rem(sb)),
            Op::Remu if b == 0 => a,
            Op::Remu => a % b,
            Op::Mulw => sext32(wa.wrapping_mul(wb)),
            Op::Divw if wb == 0 => u64::MAX,
            Op::Divw => sext32((wa as i32).wrapping_div(wb as i32) as u32),
            Op::Divuw if wb == 0 => u64::MAX,
            Op::Divuw => sext32(wa / wb),
            Op::Remw if wb == 0 => sext32(wa),
            Op::Remw => sext32((wa as i32).wrapping_rem(wb as i32) as u32),
            Op::Remuw if wb == 0 => sext32(wa),
            _ => sext32(wa % wb),
        }
    }

    fn load<B: Bus>(
        bus: &mut B,
        addr: u64,
        size: usize,
        misaligned: Exception,
        fault: Exception,
    ) -> Exec<u64, B::Error> {
        if addr % size as u64 != 0 {
            return Err(Trap::new(misaligned, addr).into());
        }
        let mut buf = [0u8; 8];
        if bus.load(addr, &mut buf[..size]).map_err(Abort::Bus)?.is_fault() {
            return Err(Trap::new(fault, addr).into());
        }
        Ok(u64::from_le_bytes(buf))
    }

    fn store<B: Bus>(bus: &mut B, addr: u64, size: usize, value: u64) -> Exec<(), B::Error> {
        if addr % size as u64 != 0 {
            return Err(Trap::new(Exception::StoreAddressMisaligned, addr).into());
        }
        let bytes = value.to_le_bytes();
        if bus.store(addr, &bytes[..size]).map_err(Abort::Bus)?.is_fault() {
            return Err(Trap::new(Exception::StoreAccessFault, addr).into());
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn atomic<B: Bus>(
        &mut self,
        bus: &mut B,
        op: Op,
        rd: u8,
        rs1: u8,
        rs2: u8,
    ) -> Exec<(), B::Error> {
        let addr = self.x(rs1);
        let (size, amo) = match op {
            Op::LrW => {
                let value = Self::load(
                    bus,
                    addr,
                    4,
                    Exception::LoadAddressMisaligned,
                    Exception::LoadAccessFault,
                )?;
                self.reservation = Some(addr);
                self.set_x(rd, sign_extend(value, 4));
                return Ok(());
            }
            Op::LrD => {
                let value = Self::load(
                    bus,
                    addr,
                    8,
                    Exception::LoadAddressMisaligned,
                    Exception::LoadAccessFault,
                )?;
                self.reservation = Some(addr);
                self.set_x(rd, value);
                return Ok(());
            }
            Op::ScW | Op::ScD => {
                let size = if op == Op::ScW { 4 } else { 8 };
                if addr % size as u64 != 0 {
                    return Err(Trap::new(Exception::StoreAddressMisaligned, addr).into());
                }
                let success = self.reservation.take() == Some(addr);
                if success {
                    Self::store(bus, addr, size, self.x(rs2))?;
                }
                self.set_x(rd, u64::from(!success));
                return Ok(());
            }
            Op::AmoW(amo) => (4, amo),
            Op::AmoD(amo) => (8, amo),
            _ => return Err(Trap::illegal(self.last_instruction).into()),
        };

        let loaded = Self::load(
            bus,
            addr,
            size,
            Exception::StoreAddressMisaligned,
            Exception::StoreAccessFault,
        )?;
        let (old, src) = if size == 4 {
            (sign_extend(loaded, 4), sign_extend(self.x(rs2) & 0xFFFF_FFFF, 4))
        } else {
            (loaded, self.x(rs2))
        };
        let (so, ss) = (old as i64, src as i64);
        let result = match amo {
            AmoOp::Swap => src,
            AmoOp::Add => old.wrapping_add(src),
            AmoOp::Xor => old ^ src,
            AmoOp::And => old & src,
            AmoOp::Or => old | src,
            AmoOp::Min => so.min(ss) as u64,
            AmoOp::Max => so.max(ss) as u64,
            AmoOp::Minu if size == 4 => u64::from((old as u32).min(src as u32)),
            AmoOp::Maxu if size == 4 => u64::from((old as u32).max(src as u32)),
            AmoOp::Minu => old.min(src),
            AmoOp::Maxu => old.max(src),
        };
        Self::store(bus, addr, size, result)?;
        self.set_x(rd, old);
        Ok(())
    }

    fn csr_op(
        &mut self,
        op: Op,
        rd: u8,
        csr: u16,
        src: u64,
        writes_nonzero: bool,
        raw: u64,
    ) -> Result<(), Trap> {
        let prv = self.prv;
        let old = self.csrs.read(csr, prv).ok_or(Trap::illegal(raw))?;
        let new = match op {
            Op::Csrrw | Op::Csrrwi => Some(src),
            Op::Csrrs | Op::Csrrsi if writes_nonzero => Some(old | src),
            Op::Csrrc | Op::Csrrci if writes_nonzero => Some(old & !src),
            _ => None,
        };
        if let Some(new) = new {
            let stored = self.csrs.write(csr, new, prv).ok_or(Trap::illegal(raw))?;
            self.set_csr_logged(csr, stored);
        }
        self.set_x(rd, old);
        Ok(())
    }

    fn mret(&mut self, raw: u64) -> Result<u64, Trap> {
        if self.prv < Privilege::Machine {
            return Err(Trap::illegal(raw));
        }
        let mpp = self.csrs.mpp();
        let mut mstatus = self.csrs.mstatus;
        mstatus = set_bit(mstatus, MSTATUS_MIE, mstatus & MSTATUS_MPIE != 0);
        mstatus |= MSTATUS_MPIE;
        let lowest = self.csrs.legalize_privilege(Privilege::User.bits());
        mstatus = (mstatus & !MSTATUS_MPP) | (lowest.bits() << MSTATUS_MPP_SHIFT);
        if mpp != Privilege::Machine {
            mstatus &= !MSTATUS_MPRV;
        }
        self.csrs.mstatus = mstatus;
        self.prv = mpp;
        self.set_csr_logged(CSR_MSTATUS, mstatus);
        Ok(self.csrs.mepc & self.csrs.epc_mask())
    }

    fn sret(&mut self, raw: u64) -> Result<u64, Trap> {
        let tsr = self.csrs.mstatus & MSTATUS_TSR != 0;
        if !self.csrs.supervisor()
            || self.prv < Privilege::Supervisor
            || (self.prv == Privilege::Supervisor && tsr)
        {
            return Err(Trap::illegal(raw));
        }
        let mut mstatus = self.csrs.mstatus;
        let spp = if mstatus & MSTATUS_SPP != 0 {
            Privilege::Supervisor
        } else {
            Privilege::User
        };
        mstatus = set_bit(mstatus, MSTATUS_SIE, mstatus & MSTATUS_SPIE != 0);
        mstatus |= MSTATUS_SPIE;
        mstatus &= !(MSTATUS_SPP | MSTATUS_MPRV);
        self.csrs.mstatus = mstatus;
        self.prv = self.csrs.legalize_privilege(spp.bits());
        let sstatus = self.csrs.peek(CSR_SSTATUS).unwrap_or_default();
        self.set_csr_logged(CSR_SSTATUS, sstatus);
        Ok(self.csrs.sepc & self.csrs.epc_mask())
    }

    /// Enter the trap handler for `trap` raised by the instruction at `epc`.
    fn take_trap(&mut self, trap: Trap, epc: u64) {
        let cause = trap.cause.code();
        let delegated = self.prv <= Privilege::Supervisor
            && self.csrs.supervisor()
            && (self.csrs.medeleg >> cause) & 1 != 0;
        trace!(pc = %format_args!("{epc:#x}"), %trap, delegated, "exception");

        let csrs = &mut self.csrs;
        if delegated {
            csrs.sepc = epc & !1;
            csrs.scause = cause;
            csrs.stval = self.xlen.truncate(trap.tval);
            let mut mstatus = csrs.mstatus;
            mstatus = set_bit(mstatus, MSTATUS_SPIE, mstatus & MSTATUS_SIE != 0);
            mstatus = set_bit(mstatus, MSTATUS_SPP, self.prv == Privilege::Supervisor);
            mstatus &= !MSTATUS_SIE;
            csrs.mstatus = mstatus;
            self.pc = csrs.stvec & !3;
            self.prv = Privilege::Supervisor;

            let (sepc, scause, stval) = (csrs.sepc, csrs.scause, csrs.stval);
            let sstatus = csrs.peek(CSR_SSTATUS).unwrap_or_default();
            self.set_csr_logged(CSR_SEPC, sepc);
            self.set_csr_logged(CSR_SCAUSE, scause);
            self.set_csr_logged(CSR_STVAL, stval);
            self.set_csr_logged(CSR_SSTATUS, sstatus);
        } else {
            csrs.mepc = epc & !1;
            csrs.mcause = cause;
            csrs.mtval = self.xlen.truncate(trap.tval);
            let mut mstatus = csrs.mstatus;
            mstatus = set_bit(mstatus, MSTATUS_MPIE, mstatus & MSTATUS_MIE != 0);
            mstatus = (mstatus & !MSTATUS_MPP) | (self.prv.bits() << MSTATUS_MPP_SHIFT);
            mstatus &= !MSTATUS_MIE;
            csrs.mstatus = mstatus;
            self.pc = csrs.mtvec & !3;
            self.prv = Privilege::Machine;

            let (mepc, mcause, mtval) = (csrs.mepc, csrs.mcause, csrs.mtval);
            self.set_csr_logged(CSR_MEPC, mepc);
            self.set_csr_logged(CSR_MCAUSE, mcause);
            self.set_csr_logged(CSR_MTVAL, mtval);
            self.set_csr_logged(CSR_MSTATUS, mstatus);
        }
    }
}

const fn set_bit(value: u64, mask: u64, on: bool) -> u64 {
    if on { value | mask } else { value & !mask }
}

const fn sext32(value: u32) -> u64 {
    value as i32 as i64 as u64
}

const fn sign_extend(value: u64, size: usize) -> u64 {
    let shift = 64 - size as u32 * 8;
    (((value << shift) as i64) >> shift) as u64
}

const fn is_op_imm(op: Op) -> bool {
    matches!(
        op,
        Op::Addi
            | Op::Slti
            | Op::Sltiu
            | Op::Xori
            | Op::Ori
            | Op::Andi
            | Op::Slli
            | Op::Srli
            | Op::Srai
            | Op::Addiw
            | Op::Slliw
            | Op::Srliw
            | Op::Sraiw
    )
}

const fn is_alu(op: Op) -> bool {
    matches!(
        op,
        Op::Add
            | Op::Sub
            | Op::Sll
            | Op::Slt
            | Op::Sltu
            | Op::Xor
            | Op::Srl
            | Op::Sra
            | Op::Or
            | Op::And
            | Op::Addw
            | Op::Subw
            | Op::Sllw
            | Op::Srlw
            | Op::Sraw
            | Op::Mul
            | Op::Mulh
            | Op::Mulhsu
            | Op::Mulhu
            | Op::Div
            | Op::Divu
            | Op::Rem
            | Op::Remu
            | Op::Mulw
            | Op::Divw
            | Op::Divuw
            | Op::Remw
            | Op::Remuw
    )
}
