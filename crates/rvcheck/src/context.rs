//! Verification context: memory, harts and event dispatch.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use rvcheck_elf::ElfImage;
use rvcheck_sim::Memory;
use tracing::{info, trace};

use crate::config::{CheckConfig, MemoryMap};
use crate::error::{Error, Result};
use crate::event::TraceEvent;
use crate::executor::{ExecutorFactory, ProcessorFactory};
use crate::hart::Hart;
use crate::metrics;

/// Owns the memory store and every hart of one verification run.
pub struct Context<F: ExecutorFactory = ProcessorFactory> {
    memory: Memory,
    harts: BTreeMap<u32, Hart<F::Executor>>,
    factory: F,
    map: MemoryMap,
    compare_csr_data: bool,
    audit: Box<dyn Write>,
    image_bytes: u64,
}

impl Context<ProcessorFactory> {
    /// Context backed by the bundled reference processor.
    ///
    /// # Errors
    ///
    /// Returns an error if the audit destination cannot be opened.
    pub fn new(config: &CheckConfig) -> Result<Self> {
        Self::with_factory(config, ProcessorFactory)
    }
}

impl<F: ExecutorFactory> Context<F> {
    /// Context using `factory` to build each hart's executor.
    ///
    /// # Errors
    ///
    /// Returns an error if the audit destination cannot be opened.
    pub fn with_factory(config: &CheckConfig, factory: F) -> Result<Self> {
        let audit = config.audit.open()?;
        Ok(Self::with_audit_writer(config, factory, audit))
    }

    /// Context writing audit records to `audit` instead of the configured sink.
    pub fn with_audit_writer(config: &CheckConfig, factory: F, audit: Box<dyn Write>) -> Self {
        Self {
            memory: Memory::new(),
            harts: BTreeMap::new(),
            factory,
            map: config.memory_map,
            compare_csr_data: config.compare_csr_data,
            audit,
            image_bytes: 0,
        }
    }

    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }

    pub const fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    #[must_use]
    pub fn hart(&self, id: u32) -> Option<&Hart<F::Executor>> {
        self.harts.get(&id)
    }

    /// Harts created so far, in id order.
    pub fn harts(&self) -> impl Iterator<Item = &Hart<F::Executor>> {
        self.harts.values()
    }

    #[must_use]
    pub fn hart_count(&self) -> usize {
        self.harts.len()
    }

    /// Total commits verified across all harts.
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.harts().map(Hart::commits).sum()
    }

    /// Total bytes written by image loads.
    #[must_use]
    pub const fn image_bytes(&self) -> u64 {
        self.image_bytes
    }

    /// Create hart `id`, replacing any previous hart with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the executor rejects the ISA or privilege string.
    pub fn new_hart(&mut self, id: u32, isa: &str, privilege: &str) -> Result<()> {
        let executor = self.factory.create(id, isa, privilege)?;
        let hart = Hart::new(id, isa, privilege, executor)
            .with_compare_csr_data(self.compare_csr_data);
        self.harts.insert(id, hart);
        info!(hart = id, isa, privilege, "hart created");
        Ok(())
    }

    /// Load an ELF image with every byte placed at its address plus `offset`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid image.
    pub fn load_elf(&mut self, path: &Path, offset: u64) -> Result<u64> {
        let image = ElfImage::load(path)?;
        let mut count = 0u64;
        for (byte, address) in image.bytes() {
            self.memory.write_byte(address.wrapping_add(offset), byte);
            count += 1;
        }
        self.image_bytes += count;
        metrics::record_image_bytes(count);
        info!(
            path = %path.display(),
            offset = format!("{:#x}", offset),
            bytes = count,
            entry = format!("{:#x}", image.entry_point),
            "image loaded"
        );
        Ok(count)
    }

    /// Route one trace event.
    ///
    /// # Errors
    ///
    /// Returns the first protocol violation or divergence, or an error for
    /// an event addressed to a hart that does not exist.
    pub fn apply(&mut self, event: TraceEvent) -> Result<()> {
        trace!(?event, "event");
        metrics::record_event(event.kind());
        match event {
            TraceEvent::NewHart {
                hart_id,
                isa,
                privilege,
            } => self.new_hart(hart_id, &isa, &privilege),
            TraceEvent::SetPc { hart_id, pc } => {
                self.hart_mut(hart_id)?.set_pc(pc);
                Ok(())
            }
            TraceEvent::Commit { hart_id, pc } => self.commit(hart_id, pc),
            TraceEvent::RegisterWrite {
                hart_id,
                kind,
                address,
                data,
            } => self.hart_mut(hart_id)?.write_rf(kind, address, data),
            TraceEvent::RegisterRead {
                hart_id,
                kind,
                address,
                data,
            } => self.hart_mut(hart_id)?.read_rf(kind, address, data),
            TraceEvent::IoAccess { hart_id, io } => {
                self.hart_mut(hart_id)?.io_access(io);
                Ok(())
            }
            TraceEvent::ImageLoad { path, offset } => self.load_elf(&path, offset).map(|_| ()),
        }
    }

    /// Verify a commit of hart `id` at `pc`.
    ///
    /// # Errors
    ///
    /// Returns the divergence detected by the hart.
    pub fn commit(&mut self, id: u32, pc: u64) -> Result<()> {
        let hart = self.harts.get_mut(&id).ok_or(Error::UnknownHart(id))?;
        hart.commit(pc, &mut self.memory, self.map, self.audit.as_mut())
    }

    /// Flush the audit stream.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the audit sink.
    pub fn flush(&mut self) -> Result<()> {
        self.audit.flush()?;
        Ok(())
    }

    fn hart_mut(&mut self, id: u32) -> Result<&mut Hart<F::Executor>> {
        self.harts.get_mut(&id).ok_or(Error::UnknownHart(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditSink;
    use crate::event::parse_line;
    use rvcheck_isa::RegFile;

    fn context() -> Context {
        let config = CheckConfig::new().with_audit(AuditSink::Disabled);
        Context::new(&config).unwrap()
    }

    fn apply(context: &mut Context, line: &str) -> Result<()> {
        context.apply(parse_line(line)?.unwrap())
    }

    #[test]
    fn test_harts_grow_lazily() {
        let mut context = context();
        apply(&mut context, "rv new 2 rv64imac msu").unwrap();
        assert_eq!(context.hart_count(), 1);
        assert!(context.hart(0).is_none());
        assert_eq!(context.hart(2).unwrap().isa(), "rv64imac");

        apply(&mut context, "rv new 0 rv32imac m").unwrap();
        assert_eq!(context.hart_count(), 2);
        let ids: Vec<u32> = context.harts().map(Hart::id).collect();
        assert_eq!(ids, [0, 2]);
    }

    #[test]
    fn test_sparse_hart_ids() {
        let mut context = context();
        apply(&mut context, "rv new 4294967295 rv64gc msu").unwrap();
        apply(&mut context, "rv new 7 rv64gc msu").unwrap();
        assert_eq!(context.hart_count(), 2);
        let ids: Vec<u32> = context.harts().map(Hart::id).collect();
        assert_eq!(ids, [7, u32::MAX]);
        apply(&mut context, "rv set pc 4294967295 0x80000000").unwrap();
    }

    #[test]
    fn test_new_hart_replaces_existing() {
        let mut context = context();
        apply(&mut context, "rv new 0 rv64gc msu").unwrap();
        apply(&mut context, "rv rf w 0 0 5 0x2a").unwrap();
        apply(&mut context, "rv new 0 rv64gc msu").unwrap();
        assert!(context.hart(0).unwrap().pending().is_idle());
    }

    #[test]
    fn test_unknown_hart() {
        let mut context = context();
        for line in [
            "rv set pc 1 0x80000000",
            "rv commit 1 0x80000000",
            "rv rf w 1 0 5 0x2a",
            "rv rf r 1 4 768 0",
            "rv io 1 0 0x10000000 0 0xff 1 0",
        ] {
            assert!(
                matches!(apply(&mut context, line), Err(Error::UnknownHart(1))),
                "{line}"
            );
        }
    }

    #[test]
    fn test_invalid_isa_is_reported() {
        let mut context = context();
        let err = apply(&mut context, "rv new 0 x86 msu").unwrap_err();
        assert!(matches!(err, Error::Isa(_)));
    }

    #[test]
    fn test_events_reach_hart_state() {
        let mut context = context();
        apply(&mut context, "rv new 0 rv64gc msu").unwrap();
        apply(&mut context, "rv set pc 0 0x80000000").unwrap();
        apply(&mut context, "rv rf w 0 4 0x300 0x1800").unwrap();
        apply(&mut context, "rv io 0 1 0x10000004 0x7 0xffffffff 4 0").unwrap();

        let hart = context.hart(0).unwrap();
        assert_eq!(hart.pending().csr_address, 0x300);
        assert_eq!(hart.pending().csr_write, Some(0x1800));
        assert_eq!(hart.mmio().len(), 1);
        assert_eq!(
            crate::executor::ReferenceExecutor::pc(hart.executor()),
            0x8000_0000
        );

        let err = context
            .hart_mut(0)
            .unwrap()
            .write_rf(RegFile::Csr, 0x304, 0)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicatedCsrAccess { .. }));
    }

    #[test]
    fn test_missing_image() {
        let mut context = context();
        let err = apply(&mut context, "elf load /nonexistent/image.elf 0").unwrap_err();
        assert!(matches!(err, Error::Elf(_)));
    }
}
