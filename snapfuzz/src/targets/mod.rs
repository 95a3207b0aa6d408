//! Target registration. Every target this binary knows how to drive is
//! registered explicitly from [`register_targets`]; there is no
//! global/static constructor magic, so the set of available targets is
//! always exactly what this function builds.

mod dummy;

use snapfuzz_core::TargetRegistry;

/// Populates `registry` with every target this binary ships.
pub fn register_targets(registry: &mut TargetRegistry) {
    registry.register(dummy::build());
}
