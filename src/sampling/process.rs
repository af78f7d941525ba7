//! OS process table access.
//!
//! # Responsibilities
//! - Enumerate live processes with their resident set size
//! - Locate the current process and report its RSS in bytes
//!
//! # Design Decisions
//! - The table reports resident memory in kilobytes, the unit of the
//!   underlying OS accounting; conversion to bytes happens at capture
//! - One full enumeration per call; callers bound how often it runs

use std::sync::Mutex;
use sysinfo::{ProcessRefreshKind, System};

/// One row of the process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    /// Resident set size in kilobytes.
    pub resident_kb: u64,
}

/// Read-only view of the OS process table.
pub trait ProcessTable: Send + Sync {
    /// Enumerate live processes. An empty list means the table could not
    /// be read.
    fn entries(&self) -> Vec<ProcessEntry>;
}

/// Resident memory of `pid` in bytes, scanning `table` once. 0 when the
/// process is not listed.
pub fn resident_memory_bytes(table: &dyn ProcessTable, pid: u32) -> u64 {
    table
        .entries()
        .into_iter()
        .find(|entry| entry.pid == pid)
        .map(|entry| entry.resident_kb.saturating_mul(1024))
        .unwrap_or(0)
}

/// Process table backed by `sysinfo`.
///
/// The `System` is kept between scans so its internal allocations are
/// reused; the mutex is held for one refresh-and-collect only.
pub struct SysinfoProcessTable {
    system: Mutex<System>,
}

impl SysinfoProcessTable {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SysinfoProcessTable {
    fn entries(&self) -> Vec<ProcessEntry> {
        let mut system = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        system.refresh_processes_specifics(ProcessRefreshKind::new().with_memory());

        system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                // sysinfo reports bytes
                resident_kb: process.memory() / 1024,
            })
            .collect()
    }
}
