//! Per-hart reconciliation of DUT trace events against the reference.
//!
//! Between two commits the DUT may report at most one integer register
//! write and any number of accesses to a single CSR. A commit steps the
//! reference executor once and checks every register write it reports
//! against that pending state.

use std::io::Write;

use rvcheck_isa::csr::{CSR_MATCH_MASK, is_csr_access, is_privilege_return};
use rvcheck_isa::{RegFile, RegWrite};
use rvcheck_sim::Memory;
use tracing::{debug, trace};

use crate::config::MemoryMap;
use crate::error::{Error, Result};
use crate::event::TraceIo;
use crate::executor::{MemoryPort, ReferenceExecutor};
use crate::metrics;
use crate::mmio::MmioQueue;

/// Register effects reported by the DUT and not yet matched by a commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingWrites {
    pub integer: Option<u64>,
    pub csr_address: u32,
    pub csr_write: Option<u64>,
    pub csr_read: Option<u64>,
}

impl PendingWrites {
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.integer.is_none() && self.csr_write.is_none() && self.csr_read.is_none()
    }

    const fn csr_pending(&self) -> bool {
        self.csr_write.is_some() || self.csr_read.is_some()
    }

    fn claim_csr(&mut self, address: u32) -> Result<()> {
        if self.csr_pending() && self.csr_address != address {
            return Err(Error::DuplicatedCsrAccess {
                pending: self.csr_address,
                address,
            });
        }
        self.csr_address = address;
        Ok(())
    }

    fn record_write(&mut self, kind: RegFile, address: u32, data: u64) -> Result<()> {
        match kind {
            RegFile::Integer => {
                if let Some(pending) = self.integer {
                    return Err(Error::DuplicatedIntegerWrite { pending, data });
                }
                self.integer = Some(data);
            }
            RegFile::Csr => {
                self.claim_csr(address)?;
                self.csr_write = Some(data);
            }
            other => return Err(Error::UnknownRegisterFile(other)),
        }
        Ok(())
    }

    fn record_read(&mut self, kind: RegFile, address: u32, data: u64) -> Result<()> {
        match kind {
            RegFile::Csr => {
                self.claim_csr(address)?;
                self.csr_read = Some(data);
                Ok(())
            }
            other => Err(Error::UnknownRegisterFile(other)),
        }
    }

    /// Match one reference register write against the pending state.
    fn retire(&mut self, write: &RegWrite, raw: u64, compare_csr_data: bool) -> Result<()> {
        let index = write.target.index;
        match write.target.kind {
            RegFile::Integer if index == 0 => {}
            RegFile::Integer => {
                let Some(dut) = self.integer.take() else {
                    return Err(Error::IntegerWriteMissing {
                        reg: index,
                        reference: write.value,
                    });
                };
                if dut != write.value {
                    return Err(Error::IntegerWriteMismatch {
                        reg: index,
                        dut,
                        reference: write.value,
                    });
                }
            }
            RegFile::Csr => {
                if !is_privilege_return(raw) && is_csr_access(raw) {
                    let Some(dut) = self.csr_write else {
                        return Err(Error::CsrWriteMissing { csr: index });
                    };
                    if self.csr_address & CSR_MATCH_MASK != index & CSR_MATCH_MASK {
                        return Err(Error::CsrWriteAddress {
                            dut: self.csr_address,
                            reference: index,
                        });
                    }
                    if compare_csr_data && dut != write.value {
                        return Err(Error::CsrWriteData {
                            csr: index,
                            dut,
                            reference: write.value,
                        });
                    }
                }
                self.csr_write = None;
                self.csr_read = None;
            }
            other => return Err(Error::UnknownRegisterFile(other)),
        }
        Ok(())
    }
}

/// One hardware thread under verification.
pub struct Hart<E> {
    id: u32,
    isa: String,
    privilege: String,
    executor: E,
    mmio: MmioQueue,
    pending: PendingWrites,
    compare_csr_data: bool,
    commits: u64,
}

impl<E: ReferenceExecutor> Hart<E> {
    pub fn new(id: u32, isa: impl Into<String>, privilege: impl Into<String>, executor: E) -> Self {
        Self {
            id,
            isa: isa.into(),
            privilege: privilege.into(),
            executor,
            mmio: MmioQueue::new(),
            pending: PendingWrites::default(),
            compare_csr_data: false,
            commits: 0,
        }
    }

    /// Also compare CSR write data at commit.
    #[must_use]
    pub fn with_compare_csr_data(mut self, enabled: bool) -> Self {
        self.compare_csr_data = enabled;
        self
    }

    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub fn isa(&self) -> &str {
        &self.isa
    }

    #[must_use]
    pub fn privilege(&self) -> &str {
        &self.privilege
    }

    #[must_use]
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    #[must_use]
    pub const fn mmio(&self) -> &MmioQueue {
        &self.mmio
    }

    #[must_use]
    pub const fn pending(&self) -> &PendingWrites {
        &self.pending
    }

    /// Number of commits verified so far.
    #[must_use]
    pub const fn commits(&self) -> u64 {
        self.commits
    }

    /// Force the reference PC.
    pub fn set_pc(&mut self, pc: u64) {
        trace!(hart = self.id, pc = format!("{:#x}", pc), "set pc");
        self.executor.set_pc(pc);
    }

    /// Record a register write observed on the DUT.
    ///
    /// # Errors
    ///
    /// Fails on a second integer write before a commit, on a CSR access to a
    /// different address than the pending one, or on an unknown register
    /// file.
    pub fn write_rf(&mut self, kind: RegFile, address: u32, data: u64) -> Result<()> {
        self.pending.record_write(kind, address, data)
    }

    /// Record a register read observed on the DUT. Only CSR reads are valid.
    ///
    /// # Errors
    ///
    /// Fails on a CSR access to a different address than the pending one, or
    /// on any register file other than CSR.
    pub fn read_rf(&mut self, kind: RegFile, address: u32, data: u64) -> Result<()> {
        self.pending.record_read(kind, address, data)
    }

    /// Queue an expected MMIO transaction.
    pub fn io_access(&mut self, io: TraceIo) {
        self.mmio.push(io);
    }

    /// Verify that the DUT committed the instruction at `pc`.
    ///
    /// Steps the reference once, matches its register writes against the
    /// pending DUT writes and appends the PC to `audit`.
    ///
    /// # Errors
    ///
    /// Returns the first divergence found, or an I/O error from `audit`.
    pub fn commit(
        &mut self,
        pc: u64,
        memory: &mut Memory,
        map: MemoryMap,
        audit: &mut dyn Write,
    ) -> Result<()> {
        let reference = self.executor.pc();
        if pc != reference {
            return Err(Error::PcMismatch { dut: pc, reference });
        }

        let mut port = MemoryPort::new(memory, &mut self.mmio, map);
        self.executor.step(&mut port)?;

        let raw = self.executor.last_instruction();
        for write in self.executor.register_writes() {
            self.pending.retire(write, raw, self.compare_csr_data)?;
        }
        if let Some(data) = self.pending.integer {
            return Err(Error::IntegerWriteSpawned { data });
        }
        // A commit retires the instruction's CSR access even when the
        // reference logged no CSR write for it (plain CSR reads).
        self.pending = PendingWrites::default();

        self.commits += 1;
        metrics::record_commit(self.id);
        debug!(
            hart = self.id,
            pc = format!("{:#x}", pc),
            raw = format!("{:#010x}", raw),
            "commit"
        );
        writeln!(audit, "{pc:016x}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvcheck_isa::RegTarget;

    const CSRRW: u64 = 0x3000_9073; // csrrw x0, mstatus, x1
    const ADDI: u64 = 0x0010_0293; // addi x5, x0, 1

    /// Executor that replays a fixed list of steps.
    #[derive(Default)]
    struct Scripted {
        pc: u64,
        steps: Vec<(u64, Vec<RegWrite>)>,
        raw: u64,
        writes: Vec<RegWrite>,
    }

    impl Scripted {
        fn then(mut self, raw: u64, writes: Vec<RegWrite>) -> Self {
            self.steps.push((raw, writes));
            self
        }
    }

    impl ReferenceExecutor for Scripted {
        fn set_pc(&mut self, pc: u64) {
            self.pc = pc;
        }

        fn pc(&self) -> u64 {
            self.pc
        }

        fn step(&mut self, _port: &mut MemoryPort<'_>) -> Result<()> {
            let (raw, writes) = self.steps.remove(0);
            self.raw = raw;
            self.writes = writes;
            self.pc += 4;
            Ok(())
        }

        fn last_instruction(&self) -> u64 {
            self.raw
        }

        fn register_writes(&self) -> &[RegWrite] {
            &self.writes
        }
    }

    fn int(index: u8, value: u64) -> RegWrite {
        RegWrite {
            target: RegTarget::integer(index),
            value,
        }
    }

    fn csr(address: u16, value: u64) -> RegWrite {
        RegWrite {
            target: RegTarget::csr(address),
            value,
        }
    }

    fn new_hart(executor: Scripted) -> Hart<Scripted> {
        let mut hart = Hart::new(0, "rv64gc", "msu", executor);
        hart.set_pc(0x8000_0000);
        hart
    }

    fn commit(hart: &mut Hart<Scripted>, pc: u64) -> Result<Vec<u8>> {
        let mut memory = Memory::new();
        let mut audit = Vec::new();
        hart.commit(pc, &mut memory, MemoryMap::default(), &mut audit)?;
        Ok(audit)
    }

    #[test]
    fn test_commit_matches_integer_write() {
        let mut hart = new_hart(Scripted::default().then(ADDI, vec![int(5, 1)]));
        hart.write_rf(RegFile::Integer, 5, 1).unwrap();
        let audit = commit(&mut hart, 0x8000_0000).unwrap();
        assert_eq!(audit, b"0000000080000000\n");
        assert!(hart.pending().is_idle());
        assert_eq!(hart.commits(), 1);
        assert_eq!(hart.executor().pc(), 0x8000_0004);
    }

    #[test]
    fn test_zero_register_write_is_ignored() {
        let mut hart = new_hart(Scripted::default().then(0x0000_0013, vec![int(0, 0)]));
        assert!(commit(&mut hart, 0x8000_0000).is_ok());
    }

    #[test]
    fn test_pc_mismatch() {
        let mut hart = new_hart(Scripted::default().then(ADDI, vec![]));
        let err = commit(&mut hart, 0x8000_0004).unwrap_err();
        assert!(matches!(
            err,
            Error::PcMismatch {
                dut: 0x8000_0004,
                reference: 0x8000_0000
            }
        ));
    }

    #[test]
    fn test_integer_write_missing_and_mismatch() {
        let mut hart1 = new_hart(Scripted::default().then(ADDI, vec![int(5, 1)]));
        assert!(matches!(
            commit(&mut hart1, 0x8000_0000).unwrap_err(),
            Error::IntegerWriteMissing { reg: 5, reference: 1 }
        ));

        let mut hart2 = new_hart(Scripted::default().then(ADDI, vec![int(5, 1)]));
        hart2.write_rf(RegFile::Integer, 5, 2).unwrap();
        assert!(matches!(
            commit(&mut hart2, 0x8000_0000).unwrap_err(),
            Error::IntegerWriteMismatch {
                reg: 5,
                dut: 2,
                reference: 1
            }
        ));
    }

    #[test]
    fn test_integer_write_spawned() {
        let mut hart = new_hart(Scripted::default().then(0x0000_0013, vec![]));
        hart.write_rf(RegFile::Integer, 5, 0x2a).unwrap();
        assert!(matches!(
            commit(&mut hart, 0x8000_0000).unwrap_err(),
            Error::IntegerWriteSpawned { data: 0x2a }
        ));
    }

    #[test]
    fn test_duplicated_integer_write() {
        let mut hart = new_hart(Scripted::default());
        hart.write_rf(RegFile::Integer, 5, 1).unwrap();
        assert!(matches!(
            hart.write_rf(RegFile::Integer, 6, 2).unwrap_err(),
            Error::DuplicatedIntegerWrite { pending: 1, data: 2 }
        ));
    }

    #[test]
    fn test_csr_accesses_must_share_address() {
        let mut hart = new_hart(Scripted::default());
        hart.write_rf(RegFile::Csr, 0x300, 0x1800).unwrap();
        hart.write_rf(RegFile::Csr, 0x300, 0x1880).unwrap();
        hart.read_rf(RegFile::Csr, 0x300, 0x1800).unwrap();
        assert_eq!(hart.pending().csr_write, Some(0x1880));
        assert!(matches!(
            hart.write_rf(RegFile::Csr, 0x304, 0).unwrap_err(),
            Error::DuplicatedCsrAccess {
                pending: 0x300,
                address: 0x304
            }
        ));
        assert!(hart.read_rf(RegFile::Csr, 0x341, 0).is_err());
    }

    #[test]
    fn test_unknown_register_files() {
        let mut hart = new_hart(Scripted::default());
        assert!(matches!(
            hart.write_rf(RegFile::Float, 1, 0).unwrap_err(),
            Error::UnknownRegisterFile(RegFile::Float)
        ));
        assert!(matches!(
            hart.read_rf(RegFile::Integer, 1, 0).unwrap_err(),
            Error::UnknownRegisterFile(RegFile::Integer)
        ));

        let mut hart = new_hart(Scripted::default().then(
            0x0000_0053,
            vec![RegWrite {
                target: RegTarget::new(RegFile::Float, 1),
                value: 0,
            }],
        ));
        assert!(matches!(
            commit(&mut hart, 0x8000_0000).unwrap_err(),
            Error::UnknownRegisterFile(RegFile::Float)
        ));
    }

    #[test]
    fn test_csr_write_checks_address_not_data() {
        let mut hart = new_hart(
            Scripted::default()
                .then(CSRRW, vec![csr(0x300, 0x1800)])
                .then(CSRRW, vec![csr(0x300, 0x1800)]),
        );
        hart.write_rf(RegFile::Csr, 0x300, 0xDEAD).unwrap();
        commit(&mut hart, 0x8000_0000).unwrap();
        assert!(hart.pending().is_idle());

        hart.write_rf(RegFile::Csr, 0x341, 0x1800).unwrap();
        assert!(matches!(
            commit(&mut hart, 0x8000_0004).unwrap_err(),
            Error::CsrWriteAddress {
                dut: 0x341,
                reference: 0x300
            }
        ));
    }

    #[test]
    fn test_csr_address_compare_is_masked() {
        // sstatus (0x100) aliases mstatus (0x300) under the match mask.
        let mut hart = new_hart(Scripted::default().then(CSRRW, vec![csr(0x300, 0)]));
        hart.write_rf(RegFile::Csr, 0x100, 0).unwrap();
        assert!(commit(&mut hart, 0x8000_0000).is_ok());
    }

    #[test]
    fn test_system_op_with_funct3_four_is_not_a_csr_access() {
        // hlv.b on a core without H traps and logs the trap CSRs.
        let mut hart = new_hart(
            Scripted::default().then(0x6000_4073, vec![csr(0x341, 0x8000_0000), csr(0x342, 2)]),
        );
        commit(&mut hart, 0x8000_0000).unwrap();
        assert!(hart.pending().is_idle());
    }

    #[test]
    fn test_csr_data_compare_when_enabled() {
        let mut hart = new_hart(Scripted::default().then(CSRRW, vec![csr(0x300, 0x1800)]))
            .with_compare_csr_data(true);
        hart.write_rf(RegFile::Csr, 0x300, 0x1880).unwrap();
        assert!(matches!(
            commit(&mut hart, 0x8000_0000).unwrap_err(),
            Error::CsrWriteData {
                csr: 0x300,
                dut: 0x1880,
                reference: 0x1800
            }
        ));
    }

    #[test]
    fn test_csr_write_missing() {
        let mut hart = new_hart(Scripted::default().then(CSRRW, vec![csr(0x300, 0)]));
        assert!(matches!(
            commit(&mut hart, 0x8000_0000).unwrap_err(),
            Error::CsrWriteMissing { csr: 0x300 }
        ));
    }

    #[test]
    fn test_trap_and_return_csr_writes_are_exempt() {
        let ecall = 0x0000_0073;
        let mret = 0x3020_0073;
        let mut hart = new_hart(
            Scripted::default()
                .then(ecall, vec![csr(0x341, 0x8000_0000), csr(0x342, 11)])
                .then(mret, vec![csr(0x300, 0x80)]),
        );
        commit(&mut hart, 0x8000_0000).unwrap();
        commit(&mut hart, 0x8000_0004).unwrap();
        assert_eq!(hart.commits(), 2);
    }

    #[test]
    fn test_commit_clears_pending_csr_read() {
        let csrr = 0x3000_22F3; // csrrs x5, mstatus, x0
        let mut hart = new_hart(
            Scripted::default()
                .then(csrr, vec![int(5, 0x1800)])
                .then(ADDI, vec![int(5, 1)]),
        );
        hart.read_rf(RegFile::Csr, 0x300, 0x1800).unwrap();
        hart.write_rf(RegFile::Integer, 5, 0x1800).unwrap();
        commit(&mut hart, 0x8000_0000).unwrap();
        hart.read_rf(RegFile::Csr, 0x341, 0).unwrap();
        assert_eq!(hart.pending().csr_address, 0x341);
    }
}
