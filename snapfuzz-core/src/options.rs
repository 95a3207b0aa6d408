//! The configuration record shared by the coordinator and worker binaries.
//!
//! This struct carries no `clap` dependency itself — the binary crate wraps
//! it behind a derive-based CLI layer — so it stays usable from tests and
//! from any future embedder that wants to build one programmatically.

use std::path::PathBuf;

use crate::error::Error;
use crate::mutators::MutatorKind;

/// The wire-visible trace format a target may emit per run, if it emits one
/// at all. Out of scope to interpret here; the core only threads the choice
/// through to the Backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceType {
    /// No per-run trace is collected.
    None,
    /// A flat list of executed Gvas, one per line.
    Gva,
    /// A full instruction trace in the Backend's native format.
    Full,
}

/// Every knob recognized by the fuzzer, independent of how it was parsed.
#[derive(Debug, Clone)]
pub struct Options {
    /// Directory of seed inputs replayed before mutation begins.
    pub inputs_path: PathBuf,
    /// Directory accepted corpus entries are persisted under.
    pub outputs_path: PathBuf,
    /// Directory named crashes are persisted under.
    pub crashes_path: PathBuf,
    /// The coordinator's listening endpoint (`host:port`).
    pub address: String,
    /// The master RNG seed; identical seeds must reproduce identical runs.
    pub seed: u64,
    /// The number of mutations the coordinator issues before terminating
    /// (once the replay queue is also exhausted).
    pub runs: u64,
    /// The largest testcase, in bytes, ever stored or sent.
    pub testcase_buffer_max_size: usize,
    /// The name of the registered target to drive.
    pub target_name: String,
    /// Optional directory a worker writes a per-run trace file under.
    pub base_trace_path: Option<PathBuf>,
    /// What kind of trace to collect, if any.
    pub trace_type: TraceType,
    /// Which mutation engine the coordinator builds by default.
    pub mutator_kind: MutatorKind,
    /// Upper bound on mutators applied per libFuzzer-style call.
    pub mutate_depth: usize,
    /// Mangling passes applied per Honggfuzz-style call.
    pub honggfuzz_mutations_per_run: usize,
    /// Where the stats line is mirrored to, in addition to stdout.
    pub log_path: PathBuf,
}

/// Preallocated receive buffer size; must exceed the configured maximum
/// testcase size plus serialization overhead.
pub const SCRATCH_BUFFER_SIZE: usize = 1024 * 1024;

impl Options {
    /// Validates the combination of options a coordinator startup needs,
    /// independent of how they were obtained (CLI, embedding, tests).
    pub fn validate(&self) -> Result<(), Error> {
        if self.target_name.is_empty() {
            return Err(Error::illegal_argument("target name must not be empty"));
        }
        if self.testcase_buffer_max_size == 0 {
            return Err(Error::illegal_argument(
                "testcase buffer max size must be > 0",
            ));
        }
        if self.testcase_buffer_max_size >= SCRATCH_BUFFER_SIZE {
            return Err(Error::illegal_argument(format!(
                "testcase buffer max size ({}) must be smaller than the scratch buffer ({})",
                self.testcase_buffer_max_size, SCRATCH_BUFFER_SIZE
            )));
        }
        if self.mutate_depth == 0 {
            return Err(Error::illegal_argument("mutate depth must be > 0"));
        }
        if self.honggfuzz_mutations_per_run == 0 {
            return Err(Error::illegal_argument(
                "honggfuzz mutations per run must be > 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_options() -> Options {
        Options {
            inputs_path: PathBuf::new(),
            outputs_path: PathBuf::new(),
            crashes_path: PathBuf::new(),
            address: "127.0.0.1:9999".to_string(),
            seed: 1,
            runs: 0,
            testcase_buffer_max_size: 4096,
            target_name: "dummy".to_string(),
            base_trace_path: None,
            trace_type: TraceType::None,
            mutator_kind: MutatorKind::Libfuzzer,
            mutate_depth: 5,
            honggfuzz_mutations_per_run: 5,
            log_path: PathBuf::from("master.log"),
        }
    }

    #[test]
    fn rejects_empty_target_name() {
        let mut opts = base_options();
        opts.target_name.clear();
        assert!(opts.validate().is_err());
    }

    #[test]
    fn rejects_max_size_not_smaller_than_scratch_buffer() {
        let mut opts = base_options();
        opts.testcase_buffer_max_size = SCRATCH_BUFFER_SIZE;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn accepts_sane_defaults() {
        assert!(base_options().validate().is_ok());
    }
}
