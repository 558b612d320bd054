//! Simulator hook - gem5 m5 "magic instruction" bridge.
//!
//! Emits work begin/end and checkpoint markers consumed by an external
//! measurement system when the harness runs inside a gem5 full-system
//! simulation. Uses address-mode m5 ops: the op range of physical memory is
//! mapped through `/dev/mem` and an op fires as a volatile load from
//! `base + (op << 8)` with its arguments in the architectural argument
//! registers.
//!
//! Instrumentation is a measurement aid, not a correctness requirement:
//! missing root privilege or a failed mapping degrades every op to a silent
//! no-op instead of aborting the run.

use std::ffi::CString;

use nix::unistd::Uid;

use crate::error::HookError;

/// Base physical address of the m5 op range.
#[cfg(target_arch = "aarch64")]
const M5OP_BASE_ADDR: u64 = 0x1001_0000;
/// Base physical address of the m5 op range.
#[cfg(not(target_arch = "aarch64"))]
const M5OP_BASE_ADDR: u64 = 0xFFFF_0000;

/// Size of the m5 op range in bytes.
const M5OP_RANGE: usize = 0x10000;

/// m5 op numbers (gem5 `m5ops.h`).
const M5OP_FAIL: u64 = 0x22;
const M5OP_WORK_BEGIN: u64 = 0x5a;
const M5OP_WORK_END: u64 = 0x5b;

/// Checkpoint codes understood by the measurement scripts.
pub mod codes {
    /// Connection to the target service established.
    pub const CONNECTION_ESTABLISHED: u64 = 20;
    /// Warm-up phase starts.
    pub const WARMUP_BEGIN: u64 = 31;
    /// Warm-up phase ends.
    pub const WARMUP_END: u64 = 32;
}

/// Capability interface for instrumentation markers.
///
/// All operations are infallible and must stay safe to call when the hook is
/// degraded or already closed.
pub trait SimulatorHook {
    /// Mark the start of one unit of work.
    fn work_begin(&self, work_id: u64, thread_id: u64);

    /// Mark the end of one unit of work.
    fn work_end(&self, work_id: u64, thread_id: u64);

    /// Emit a coarse milestone marker (see [`codes`]).
    fn checkpoint(&self, code: u64);

    /// Release the hook resource. Calling this twice must be a no-op.
    fn close(&mut self);
}

/// Hook used when instrumentation is disabled. Every operation is empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl SimulatorHook for NoopHook {
    fn work_begin(&self, _work_id: u64, _thread_id: u64) {}
    fn work_end(&self, _work_id: u64, _thread_id: u64) {}
    fn checkpoint(&self, _code: u64) {}
    fn close(&mut self) {}
}

/// Real m5 op hook backed by a `/dev/mem` mapping of the op range.
///
/// Owns the mapping and unmaps it on [`SimulatorHook::close`] or drop.
#[derive(Debug)]
pub struct M5Ops {
    /// Pointer to the mapped op range; null when degraded.
    base: *mut u8,
    /// File descriptor for `/dev/mem`.
    fd: libc::c_int,
    /// Whether the op range is currently mapped.
    mapped: bool,
}

impl M5Ops {
    /// Create the hook, mapping the m5 op range.
    ///
    /// On missing privilege or mapping failure this logs one warning and
    /// returns a degraded instance whose operations are silent no-ops.
    pub fn new() -> Self {
        match Self::map_op_range() {
            Ok(ops) => ops,
            Err(err) => {
                tracing::warn!(error = %err, "m5 instrumentation degraded to no-ops");
                Self {
                    base: std::ptr::null_mut(),
                    fd: -1,
                    mapped: false,
                }
            }
        }
    }

    /// Whether the op range is mapped (false means every op is a no-op).
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    fn map_op_range() -> Result<Self, HookError> {
        if !Uid::effective().is_root() {
            return Err(HookError::InsufficientPrivilege);
        }

        let dev_mem = CString::new("/dev/mem").map_err(|e| HookError::OpenFailed {
            path: "/dev/mem",
            reason: e.to_string(),
        })?;

        // SAFETY: dev_mem is a valid CString, flags are valid open flags.
        let fd = unsafe { libc::open(dev_mem.as_ptr(), libc::O_RDWR | libc::O_SYNC) };
        if fd < 0 {
            return Err(HookError::OpenFailed {
                path: "/dev/mem",
                reason: std::io::Error::last_os_error().to_string(),
            });
        }

        // Map the op range at its fixed physical address.
        // SAFETY: fd is a valid descriptor, M5OP_RANGE and the offset are
        // page-aligned constants.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                M5OP_RANGE,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                M5OP_BASE_ADDR as libc::off_t,
            )
        };

        if ptr == libc::MAP_FAILED {
            let errno = std::io::Error::last_os_error();
            // SAFETY: fd was opened above.
            unsafe { libc::close(fd) };
            return Err(HookError::MapFailed {
                reason: format!("mmap failed: {}", errno),
            });
        }

        tracing::info!(
            addr = %format!("{:#x}", M5OP_BASE_ADDR),
            "Initialized m5 magic instructions"
        );

        Ok(Self {
            base: ptr as *mut u8,
            fd,
            mapped: true,
        })
    }

    /// Fire one address-mode m5 op.
    fn trigger(&self, op: u64, arg0: u64, arg1: u64) {
        if !self.mapped {
            return;
        }
        // Address-mode ops encode the op number in the accessed address.
        let offset = op_offset(op);
        debug_assert!(offset < M5OP_RANGE);
        // SAFETY: offset stays within the mapped op range for every op
        // number defined above.
        let addr = unsafe { self.base.add(offset) };
        trigger_at(addr, arg0, arg1);
    }

    fn unmap(&mut self) {
        if !self.mapped {
            return;
        }

        // SAFETY: base and M5OP_RANGE were set by a successful mmap.
        let result = unsafe { libc::munmap(self.base as *mut libc::c_void, M5OP_RANGE) };
        if result < 0 {
            tracing::error!(
                error = %std::io::Error::last_os_error(),
                "Failed to unmap m5 op range"
            );
        }

        // SAFETY: fd was opened during mapping.
        unsafe { libc::close(self.fd) };

        self.base = std::ptr::null_mut();
        self.fd = -1;
        self.mapped = false;
    }
}

impl Default for M5Ops {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorHook for M5Ops {
    fn work_begin(&self, work_id: u64, thread_id: u64) {
        self.trigger(M5OP_WORK_BEGIN, work_id, thread_id);
    }

    fn work_end(&self, work_id: u64, thread_id: u64) {
        self.trigger(M5OP_WORK_END, work_id, thread_id);
    }

    fn checkpoint(&self, code: u64) {
        // Checkpoints are the m5 "fail" op with delay 0, matching the codes
        // the measurement scripts key on.
        self.trigger(M5OP_FAIL, 0, code);
    }

    fn close(&mut self) {
        self.unmap();
    }
}

impl Drop for M5Ops {
    fn drop(&mut self) {
        self.unmap();
    }
}

/// Byte offset of an op within the mapped range.
const fn op_offset(op: u64) -> usize {
    (op << 8) as usize
}

/// Perform the magic load with the op arguments in the argument registers.
#[cfg(target_arch = "x86_64")]
fn trigger_at(addr: *mut u8, arg0: u64, arg1: u64) {
    // SAFETY: addr lies within the mapped op range; gem5 intercepts the load
    // and the value read is discarded.
    unsafe {
        core::arch::asm!(
            "mov {scratch}, qword ptr [{addr}]",
            addr = in(reg) addr,
            scratch = out(reg) _,
            in("rdi") arg0,
            in("rsi") arg1,
            options(nostack, preserves_flags, readonly),
        );
    }
}

/// Perform the magic load with the op arguments in the argument registers.
#[cfg(target_arch = "aarch64")]
fn trigger_at(addr: *mut u8, arg0: u64, arg1: u64) {
    // SAFETY: addr lies within the mapped op range; gem5 intercepts the load
    // and the value read is discarded.
    unsafe {
        core::arch::asm!(
            "ldr {scratch}, [{addr}]",
            addr = in(reg) addr,
            scratch = out(reg) _,
            in("x0") arg0,
            in("x1") arg1,
            options(nostack, preserves_flags, readonly),
        );
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn trigger_at(addr: *mut u8, arg0: u64, arg1: u64) {
    // Unsupported architecture: instrumentation is a no-op.
    let _ = (addr, arg0, arg1);
}
