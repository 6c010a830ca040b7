//! Control and status registers of the reference processor.
//!
//! Only the machine and supervisor registers needed for trap handling and
//! counters are implemented. PMP registers are storage only. Accesses to
//! anything else are illegal.

use rvcheck_isa::csr::*;
use rvcheck_isa::{Isa, Privileges, Xlen};

use crate::trap::Privilege;

// mstatus fields
pub const MSTATUS_SIE: u64 = 1 << 1;
pub const MSTATUS_MIE: u64 = 1 << 3;
pub const MSTATUS_SPIE: u64 = 1 << 5;
pub const MSTATUS_UBE: u64 = 1 << 6;
pub const MSTATUS_MPIE: u64 = 1 << 7;
pub const MSTATUS_SPP: u64 = 1 << 8;
pub const MSTATUS_MPP_SHIFT: u32 = 11;
pub const MSTATUS_MPP: u64 = 3 << MSTATUS_MPP_SHIFT;
pub const MSTATUS_FS: u64 = 3 << 13;
pub const MSTATUS_MPRV: u64 = 1 << 17;
pub const MSTATUS_SUM: u64 = 1 << 18;
pub const MSTATUS_MXR: u64 = 1 << 19;
pub const MSTATUS_TVM: u64 = 1 << 20;
pub const MSTATUS_TW: u64 = 1 << 21;
pub const MSTATUS_TSR: u64 = 1 << 22;
pub const MSTATUS_UXL: u64 = 3 << 32;
pub const MSTATUS_SXL: u64 = 3 << 34;

const SSTATUS_READ_MASK: u64 = MSTATUS_SIE
    | MSTATUS_SPIE
    | MSTATUS_UBE
    | MSTATUS_SPP
    | MSTATUS_FS
    | MSTATUS_SUM
    | MSTATUS_MXR
    | MSTATUS_UXL;
const SSTATUS_WRITE_MASK: u64 =
    MSTATUS_SIE | MSTATUS_SPIE | MSTATUS_SPP | MSTATUS_SUM | MSTATUS_MXR;

// Interrupt bits delegable to S-mode (SSIP, STIP, SEIP).
const S_INTERRUPTS: u64 = 0x222;
const M_INTERRUPTS: u64 = 0x888;

// Exceptions that may be delegated (everything except ECALL from M).
const DELEGABLE_EXCEPTIONS: u64 = 0xB3FF;

// CY, TM and IR bits of the counter-enable and inhibit registers.
const COUNTEREN_MASK: u64 = 0b111;
const COUNTINHIBIT_MASK: u64 = 0b101;
const NUM_PMP_ADDR: usize = 64;
const NUM_PMP_CFG: usize = 16;

/// CSR state of one hart.
#[derive(Clone, Debug)]
pub struct CsrFile {
    xlen: Xlen,
    supervisor: bool,
    user: bool,
    compressed: bool,
    misa: u64,
    pub(crate) mstatus: u64,
    pub(crate) medeleg: u64,
    mideleg: u64,
    mie: u64,
    mip: u64,
    pub(crate) mtvec: u64,
    mcounteren: u64,
    mcountinhibit: u64,
    menvcfg: u64,
    mscratch: u64,
    pub(crate) mepc: u64,
    pub(crate) mcause: u64,
    pub(crate) mtval: u64,
    pub(crate) stvec: u64,
    scounteren: u64,
    senvcfg: u64,
    sscratch: u64,
    pub(crate) sepc: u64,
    pub(crate) scause: u64,
    pub(crate) stval: u64,
    satp: u64,
    mcycle: u64,
    minstret: u64,
    mhartid: u64,
    pmpcfg: [u64; NUM_PMP_CFG],
    pmpaddr: [u64; NUM_PMP_ADDR],
}

impl CsrFile {
    /// Reset state for a hart.
    #[must_use]
    pub fn new(isa: &Isa, privileges: Privileges, hart_id: u64) -> Self {
        let xlen = isa.xlen;
        let mut mstatus = 0;
        if xlen == Xlen::Rv64 {
            if privileges.user {
                mstatus |= 2 << 32;
            }
            if privileges.supervisor {
                mstatus |= 2 << 34;
            }
        }
        let mut misa = isa.misa();
        if privileges.supervisor {
            misa |= 1 << (b's' - b'a');
        }
        if privileges.user {
            misa |= 1 << (b'u' - b'a');
        }
        Self {
            xlen,
            supervisor: privileges.supervisor,
            user: privileges.user,
            compressed: isa.has('c'),
            misa,
            mstatus,
            medeleg: 0,
            mideleg: 0,
            mie: 0,
            mip: 0,
            mtvec: 0,
            mcounteren: 0,
            mcountinhibit: 0,
            menvcfg: 0,
            mscratch: 0,
            mepc: 0,
            mcause: 0,
            mtval: 0,
            stvec: 0,
            scounteren: 0,
            senvcfg: 0,
            sscratch: 0,
            sepc: 0,
            scause: 0,
            stval: 0,
            satp: 0,
            mcycle: 0,
            minstret: 0,
            mhartid: hart_id,
            pmpcfg: [0; NUM_PMP_CFG],
            pmpaddr: [0; NUM_PMP_ADDR],
        }
    }

    #[must_use]
    pub const fn supervisor(&self) -> bool {
        self.supervisor
    }

    #[must_use]
    pub const fn user(&self) -> bool {
        self.user
    }

    /// Mask applied to `xepc` on read (bit 1 is cleared without RVC).
    #[must_use]
    pub const fn epc_mask(&self) -> u64 {
        if self.compressed { !1 } else { !3 }
    }

    /// Advance `mcycle` by one step and `minstret` when the step retired an
    /// instruction, unless inhibited.
    pub fn tick(&mut self, retired: bool) {
        if self.mcountinhibit & 0b001 == 0 {
            self.mcycle = self.mcycle.wrapping_add(1);
        }
        if retired && self.mcountinhibit & 0b100 == 0 {
            self.minstret = self.minstret.wrapping_add(1);
        }
    }

    /// Map an illegal or unsupported MPP/SPP value to a supported mode.
    #[must_use]
    pub const fn legalize_privilege(&self, bits: u64) -> Privilege {
        match Privilege::from_bits(bits) {
            _ if !self.user => Privilege::Machine,
            Some(Privilege::Machine) => Privilege::Machine,
            Some(Privilege::Supervisor) if self.supervisor => Privilege::Supervisor,
            _ => Privilege::User,
        }
    }

    /// Read a CSR on behalf of an instruction executing at `prv`.
    ///
    /// Returns `None` when the access is illegal.
    #[must_use]
    pub fn read(&self, addr: u16, prv: Privilege) -> Option<u64> {
        self.check_access(addr, prv, false)?;
        self.peek(addr)
    }

    /// Write a CSR on behalf of an instruction executing at `prv`.
    ///
    /// Returns the value a subsequent read observes, or `None` when the
    /// access is illegal.
    pub fn write(&mut self, addr: u16, value: u64, prv: Privilege) -> Option<u64> {
        self.check_access(addr, prv, true)?;
        self.poke(addr, value)?;
        self.peek(addr)
    }

    fn check_access(&self, addr: u16, prv: Privilege, write: bool) -> Option<()> {
        if u64::from(csr_min_privilege(addr)) > prv.bits() {
            return None;
        }
        if write && csr_is_read_only(addr) {
            return None;
        }
        if addr == CSR_SATP && prv == Privilege::Supervisor && self.mstatus & MSTATUS_TVM != 0 {
            return None;
        }
        match Self::counter_bit(addr) {
            Some(bit) if prv < Privilege::Machine && self.mcounteren & bit == 0 => None,
            Some(bit)
                if prv == Privilege::User && self.supervisor && self.scounteren & bit == 0 =>
            {
                None
            }
            _ => Some(()),
        }
    }

    /// Counter-enable bit guarding an unprivileged counter CSR.
    const fn counter_bit(addr: u16) -> Option<u64> {
        match addr {
            0xC00..=0xC1F | 0xC80..=0xC9F => Some(1 << (addr & 0x1F)),
            _ => None,
        }
    }

    const fn rv32(&self) -> bool {
        matches!(self.xlen, Xlen::Rv32)
    }

    /// Current value without access checks. `None` if not implemented.
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub fn peek(&self, addr: u16) -> Option<u64> {
        let s = self.supervisor;
        let value = match addr {
            CSR_CYCLE | CSR_TIME => self.mcycle,
            CSR_INSTRET => self.minstret,
            CSR_CYCLEH | CSR_TIMEH if self.rv32() => self.mcycle >> 32,
            CSR_INSTRETH if self.rv32() => self.minstret >> 32,
            0xC03..=0xC1F => 0,
            0xC83..=0xC9F if self.rv32() => 0,

            CSR_SSTATUS if s => self.mstatus & SSTATUS_READ_MASK,
            CSR_SIE if s => self.mie & self.mideleg,
            CSR_SIP if s => self.mip & self.mideleg,
            CSR_STVEC if s => self.stvec,
            CSR_SCOUNTEREN if s => self.scounteren,
            CSR_SENVCFG if s => self.senvcfg,
            CSR_SSCRATCH if s => self.sscratch,
            CSR_SEPC if s => self.sepc & self.epc_mask(),
            CSR_SCAUSE if s => self.scause,
            CSR_STVAL if s => self.stval,
            CSR_SATP if s => self.satp,

            CSR_MSTATUS => self.mstatus,
            CSR_MSTATUSH if self.rv32() => 0,
            CSR_MISA => self.misa,
            CSR_MEDELEG if s => self.medeleg,
            CSR_MIDELEG if s => self.mideleg,
            CSR_MIE => self.mie,
            CSR_MIP => self.mip,
            CSR_MTVEC => self.mtvec,
            CSR_MCOUNTEREN if self.user => self.mcounteren,
            CSR_MENVCFG if self.user => self.menvcfg,
            CSR_MCOUNTINHIBIT => self.mcountinhibit,
            0x323..=0x33F => 0,
            CSR_MSCRATCH => self.mscratch,
            CSR_MEPC => self.mepc & self.epc_mask(),
            CSR_MCAUSE => self.mcause,
            CSR_MTVAL => self.mtval,
            0x3A0..=0x3AF => *self.pmpcfg.get(self.pmpcfg_index(addr)?)?,
            0x3B0..=0x3EF => self.pmpaddr[usize::from(addr - CSR_PMPADDR0)],
            CSR_MCYCLE => self.mcycle,
            CSR_MINSTRET => self.minstret,
            CSR_MCYCLEH if self.rv32() => self.mcycle >> 32,
            CSR_MINSTRETH if self.rv32() => self.minstret >> 32,
            0xB03..=0xB1F => 0,
            0xB83..=0xB9F if self.rv32() => 0,
            CSR_MVENDORID | CSR_MARCHID | CSR_MIMPID => 0,
            CSR_MHARTID => self.mhartid,
            _ => return None,
        };
        Some(self.xlen.truncate(value))
    }

    /// RV64 only has the even `pmpcfg` registers.
    fn pmpcfg_index(&self, addr: u16) -> Option<usize> {
        let index = usize::from(addr - CSR_PMPCFG0);
        if !self.rv32() && index % 2 == 1 {
            None
        } else {
            Some(index)
        }
    }

    /// Store a legalized value. `None` if not implemented.
    fn poke(&mut self, addr: u16, value: u64) -> Option<()> {
        self.peek(addr)?;
        let value = self.xlen.truncate(value);
        match addr {
            CSR_SSTATUS => {
                let mstatus = (self.mstatus & !SSTATUS_WRITE_MASK) | (value & SSTATUS_WRITE_MASK);
                self.write_mstatus(mstatus);
            }
            CSR_SIE => self.mie = (self.mie & !self.mideleg) | (value & self.mideleg),
            CSR_SIP => {
                let mask = self.mideleg & 0x2;
                self.mip = (self.mip & !mask) | (value & mask);
            }
            CSR_STVEC => self.stvec = value & !2,
            CSR_SCOUNTEREN => self.scounteren = value & COUNTEREN_MASK,
            CSR_SENVCFG => self.senvcfg = value & 1,
            CSR_SSCRATCH => self.sscratch = value,
            CSR_SEPC => self.sepc = value & !1,
            CSR_SCAUSE => self.scause = value,
            CSR_STVAL => self.stval = value,
            // Only Bare translation is supported; other modes leave satp unchanged.
            CSR_SATP => {
                let mode = if self.rv32() { value >> 31 } else { value >> 60 };
                if mode == 0 {
                    self.satp = value;
                }
            }
            CSR_MSTATUS => self.write_mstatus(value),
            CSR_MEDELEG => self.medeleg = value & DELEGABLE_EXCEPTIONS,
            CSR_MIDELEG => self.mideleg = value & S_INTERRUPTS,
            CSR_MIE => {
                let mask = if self.supervisor {
                    S_INTERRUPTS | M_INTERRUPTS
                } else {
                    M_INTERRUPTS
                };
                self.mie = value & mask;
            }
            CSR_MIP => {
                let mask = if self.supervisor { S_INTERRUPTS } else { 0 };
                self.mip = (self.mip & !mask) | (value & mask);
            }
            CSR_MTVEC => self.mtvec = value & !2,
            CSR_MCOUNTEREN => self.mcounteren = value & COUNTEREN_MASK,
            CSR_MENVCFG => self.menvcfg = value & 1,
            CSR_MCOUNTINHIBIT => self.mcountinhibit = value & COUNTINHIBIT_MASK,
            CSR_MSCRATCH => self.mscratch = value,
            CSR_MEPC => self.mepc = value & !1,
            CSR_MCAUSE => self.mcause = value,
            CSR_MTVAL => self.mtval = value,
            0x3A0..=0x3AF => {
                let index = self.pmpcfg_index(addr)?;
                self.pmpcfg[index] = value;
            }
            0x3B0..=0x3EF => {
                let mask = if self.rv32() { u64::from(u32::MAX) } else { (1 << 54) - 1 };
                self.pmpaddr[usize::from(addr - CSR_PMPADDR0)] = value & mask;
            }
            CSR_MCYCLE if self.rv32() => self.mcycle = (self.mcycle & !0xFFFF_FFFF) | value,
            CSR_MCYCLE => self.mcycle = value,
            CSR_MINSTRET if self.rv32() => self.minstret = (self.minstret & !0xFFFF_FFFF) | value,
            CSR_MINSTRET => self.minstret = value,
            CSR_MCYCLEH => self.mcycle = (self.mcycle & 0xFFFF_FFFF) | (value << 32),
            CSR_MINSTRETH => self.minstret = (self.minstret & 0xFFFF_FFFF) | (value << 32),
            // misa, mstatush and the hardwired performance counters ignore writes.
            _ => {}
        }
        Some(())
    }

    /// Apply the `mstatus` WARL rules.
    pub(crate) fn write_mstatus(&mut self, value: u64) {
        let mut mask = MSTATUS_MIE | MSTATUS_MPIE | MSTATUS_MPP;
        if self.supervisor {
            mask |= MSTATUS_SIE
                | MSTATUS_SPIE
                | MSTATUS_SPP
                | MSTATUS_SUM
                | MSTATUS_MXR
                | MSTATUS_TVM
                | MSTATUS_TSR;
        }
        if self.user {
            mask |= MSTATUS_MPRV | MSTATUS_TW;
        }
        let mpp = self.legalize_privilege(value >> MSTATUS_MPP_SHIFT).bits() << MSTATUS_MPP_SHIFT;
        let value = (value & !MSTATUS_MPP) | mpp;
        self.mstatus = (self.mstatus & !mask) | (value & mask);
    }

    /// `mstatus.MPP` as a privilege level.
    #[must_use]
    pub const fn mpp(&self) -> Privilege {
        self.legalize_privilege((self.mstatus & MSTATUS_MPP) >> MSTATUS_MPP_SHIFT)
    }
}
