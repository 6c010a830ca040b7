//! Memory-mapped I/O routing and expectation matching.

mod common;

use common::{Workspace, asm, prologue};
use rvcheck::{Direction, Error, ErrorClass, MemoryMap};
use rvcheck_isa::csr::CSR_MCAUSE;
use rvcheck_sim::Exception;

/// x1 = 0x1000_0000, then `rest`.
fn program(rest: &[u32]) -> Vec<u32> {
    let mut code = vec![asm::lui(1, 0x10000)];
    code.extend_from_slice(rest);
    code
}

fn trace(ws: &Workspace, code: &[u32], body: &str) -> String {
    let image = ws.program(code);
    format!(
        "{}rv rf w 0 0 1 0x10000000\nrv commit 0 0x80000000\n{body}",
        prologue(&image, "rv64gc")
    )
}

#[test]
fn test_store_and_load_consume_expectations() {
    let ws = Workspace::new();
    let code = program(&[asm::addi(2, 0, 7), asm::sw(2, 1, 4), asm::lw(3, 1, 0)]);
    let body = "rv rf w 0 0 2 0x7\n\
                rv commit 0 0x80000004\n\
                rv io 0 1 0x10000004 0x7 0xffffffff 4 0\n\
                rv commit 0 0x80000008\n\
                rv io 0 0 0x10000000 0xcafe 0xffffffff 4 0\n\
                rv rf w 0 0 3 0xcafe\n\
                rv commit 0 0x8000000c\n";

    let config = ws.config();
    let mut checker = rvcheck::Checker::new(&config).unwrap();
    let stats = checker
        .check_reader(trace(&ws, &code, body).as_bytes(), |_| {})
        .unwrap();
    assert_eq!(stats.commits, 4);

    let hart = checker.context().hart(0).unwrap();
    assert!(hart.mmio().is_empty());
    assert_eq!(hart.executor().reg(3), 0xcafe);
    // Stores to the window never reach memory.
    assert_eq!(checker.context().memory().read_le(0x1000_0004, 4), 0);
}

#[test]
fn test_expectations_are_consumed_in_order() {
    let ws = Workspace::new();
    let code = program(&[asm::lw(3, 1, 0), asm::lw(4, 1, 4)]);
    let queued = "rv io 0 0 0x10000000 0x11 0xffffffff 4 0\n\
                  rv io 0 0 0x10000004 0x22 0xffffffff 4 0\n";

    let body = format!(
        "{queued}\
         rv rf w 0 0 3 0x11\n\
         rv commit 0 0x80000004\n\
         rv rf w 0 0 4 0x22\n\
         rv commit 0 0x80000008\n"
    );
    ws.check(&trace(&ws, &code, &body)).unwrap();

    let swapped = program(&[asm::lw(4, 1, 4), asm::lw(3, 1, 0)]);
    let body = format!("{queued}rv rf w 0 0 4 0x22\nrv commit 0 0x80000004\n");
    let err = ws.check(&trace(&ws, &swapped, &body)).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Mmio);
    assert!(matches!(
        err.root(),
        Error::MmioAddress {
            dut: 0x1000_0000,
            reference: 0x1000_0004
        }
    ));
}

#[test]
fn test_direction_mismatch() {
    let ws = Workspace::new();
    let code = program(&[asm::lw(3, 1, 4)]);
    let body = "rv io 0 1 0x10000004 0x7 0xffffffff 4 0\n\
                rv rf w 0 0 3 0x7\n\
                rv commit 0 0x80000004\n";

    let err = ws.check(&trace(&ws, &code, body)).unwrap_err();
    assert_eq!(err.line(), Some(8));
    assert!(matches!(
        err.root(),
        Error::MmioDirection {
            address: 0x1000_0004,
            dut: Direction::Write,
            reference: Direction::Read
        }
    ));
}

#[test]
fn test_missing_expectation() {
    let ws = Workspace::new();
    let code = program(&[asm::lw(3, 1, 0)]);
    let body = "rv rf w 0 0 3 0x0\nrv commit 0 0x80000004\n";

    let err = ws.check(&trace(&ws, &code, body)).unwrap_err();
    assert!(matches!(
        err.root(),
        Error::MissingMmio {
            direction: Direction::Read,
            address: 0x1000_0000,
            size: 4
        }
    ));
}

#[test]
fn test_store_data_mismatch() {
    let ws = Workspace::new();
    let code = program(&[asm::addi(2, 0, 7), asm::sw(2, 1, 0)]);
    let body = "rv rf w 0 0 2 0x7\n\
                rv commit 0 0x80000004\n\
                rv io 0 1 0x10000000 0x8 0xffffffff 4 0\n\
                rv commit 0 0x80000008\n";

    let err = ws.check(&trace(&ws, &code, body)).unwrap_err();
    assert!(matches!(
        err.root(),
        Error::MmioData {
            address: 0x1000_0000,
            dut: 8,
            reference: 7
        }
    ));
}

#[test]
fn test_injected_error_faults_the_access() {
    let ws = Workspace::new();
    let code = program(&[asm::lw(3, 1, 0)]);
    // The DUT took an access fault, so it reports no register write.
    let body = "rv io 0 0 0x10000000 0x0 0xffffffff 4 1\nrv commit 0 0x80000004\n";

    let config = ws.config();
    let mut checker = rvcheck::Checker::new(&config).unwrap();
    checker
        .check_reader(trace(&ws, &code, body).as_bytes(), |_| {})
        .unwrap();

    let hart = checker.context().hart(0).unwrap();
    assert!(hart.mmio().is_empty());
    assert_eq!(
        hart.executor().csr(CSR_MCAUSE),
        Some(Exception::LoadAccessFault.code())
    );
}

#[test]
fn test_unmapped_access_faults_without_consuming() {
    let ws = Workspace::new();
    let code = [asm::lui(1, 0x1), asm::lw(3, 1, 0)];
    let image = ws.program(&code);
    let trace = format!(
        "{}\
         rv io 0 0 0x10000000 0x0 0xffffffff 4 0\n\
         rv rf w 0 0 1 0x1000\n\
         rv commit 0 0x80000000\n\
         rv commit 0 0x80000004\n",
        prologue(&image, "rv64gc")
    );

    let config = ws.config();
    let mut checker = rvcheck::Checker::new(&config).unwrap();
    checker.check_reader(trace.as_bytes(), |_| {}).unwrap();

    let hart = checker.context().hart(0).unwrap();
    assert_eq!(hart.mmio().len(), 1);
    assert_eq!(
        hart.executor().csr(CSR_MCAUSE),
        Some(Exception::LoadAccessFault.code())
    );
}

#[test]
fn test_custom_window() {
    let ws = Workspace::new();
    let code = [asm::lui(1, 0x1), asm::lw(3, 1, 0)];
    let image = ws.program(&code);
    let trace = format!(
        "{}\
         rv rf w 0 0 1 0x1000\n\
         rv commit 0 0x80000000\n\
         rv io 0 0 0x1000 0x5a 0xffffffff 4 0\n\
         rv rf w 0 0 3 0x5a\n\
         rv commit 0 0x80000004\n",
        prologue(&image, "rv64gc")
    );

    let map = MemoryMap {
        mmio_start: 0x1000,
        mmio_end: 0x1fff,
        ..MemoryMap::default()
    };
    let config = ws.config().with_memory_map(map);
    ws.check_with(&config, &trace).unwrap();
}
