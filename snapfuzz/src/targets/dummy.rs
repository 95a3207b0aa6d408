//! A minimal example target, demonstrating the four-callback contract
//! against an arbitrary [`Backend`] implementation. Useful for exercising
//! the coordinator/worker plumbing without a real snapshot.

use log::debug;

use snapfuzz_core::engine::{classify_boundary, BoundaryKind};
use snapfuzz_core::{Backend, Register, Target};

/// Guest virtual address the dummy target writes its input buffer to.
const INPUT_BUFFER_ADDR: u64 = 0x1000;
/// Address of the function-under-test's return, i.e. the boundary
/// breakpoint that ends a normal run.
const RETURN_ADDR: u64 = 0x2000;
/// Address a deliberately-buggy build of the target jumps to on crash.
const BUGCHECK_ADDR: u64 = 0x3000;

/// Builds the `dummy` target.
pub fn build() -> Target {
    Target::new(
        "dummy",
        Box::new(|_opts, _cpu_state, backend| {
            backend.install_breakpoint(
                RETURN_ADDR,
                Box::new(|_backend| classify_boundary(BoundaryKind::End)),
            );
            backend.install_breakpoint(
                BUGCHECK_ADDR,
                Box::new(|_backend| {
                    classify_boundary(BoundaryKind::Bugcheck("dummy-bugcheck".to_string()))
                }),
            );
            debug!("dummy target initialized");
            true
        }),
        Box::new(|backend: &mut dyn Backend, buf: &[u8]| {
            if backend.write_virtual_memory(INPUT_BUFFER_ADDR, buf).is_err() {
                return false;
            }
            backend.write_register(Register::Rdi, INPUT_BUFFER_ADDR);
            backend.write_register(Register::Rsi, buf.len() as u64);
            true
        }),
    )
}
