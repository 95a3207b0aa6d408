//! The `clap`-derived command-line surface shared by both subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use snapfuzz_core::{MutatorKind, Options, TraceType};

/// Distributed snapshot-based coverage-guided fuzzer.
#[derive(Debug, Parser)]
#[command(name = "snapfuzz", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// The two roles a `snapfuzz` process can take on.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the coordinator: own the corpus, mutator, and coverage set, and
    /// serve testcases to workers.
    Master(MasterArgs),
    /// Run a worker: connect to a coordinator and drive the execution engine.
    Worker(WorkerArgs),
}

/// Options common to both `master` and `worker`.
#[derive(Debug, Parser, Clone)]
pub struct CommonArgs {
    /// Name of the registered target to drive. An unknown name prints the
    /// registry and exits non-zero before any socket is touched.
    #[arg(long)]
    pub target: String,

    /// Coordinator listening endpoint (`host:port`).
    #[arg(long, default_value = "127.0.0.1:31337")]
    pub address: String,

    /// 64-bit RNG seed. Identical seeds reproduce identical runs given an
    /// identical corpus and target.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Largest testcase, in bytes, ever stored or sent.
    #[arg(long, default_value_t = 8192)]
    pub testcase_buffer_max_size: usize,

    /// Directory a per-run trace is written under, if any.
    #[arg(long)]
    pub base_trace_path: Option<PathBuf>,

    /// Kind of per-run trace to collect.
    #[arg(long, value_enum, default_value_t = CliTraceType::None)]
    pub trace_type: CliTraceType,
}

/// Arguments specific to `snapfuzz master`.
#[derive(Debug, Parser)]
pub struct MasterArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Directory of seed inputs replayed before mutation begins.
    #[arg(long, default_value = "inputs")]
    pub inputs_path: PathBuf,

    /// Directory accepted corpus entries are persisted under.
    #[arg(long, default_value = "outputs")]
    pub outputs_path: PathBuf,

    /// Directory named crashes are persisted under.
    #[arg(long, default_value = "crashes")]
    pub crashes_path: PathBuf,

    /// Number of mutations to issue before terminating (once the replay
    /// queue is also exhausted). 0 means "replay queue only".
    #[arg(long, default_value_t = 0)]
    pub runs: u64,

    /// Which mutation engine to build.
    #[arg(long, value_enum, default_value_t = CliMutatorKind::Libfuzzer)]
    pub mutator_kind: CliMutatorKind,

    /// Upper bound on mutators applied per libFuzzer-style call.
    #[arg(long, default_value_t = 5)]
    pub mutate_depth: usize,

    /// Mangling passes applied per Honggfuzz-style call.
    #[arg(long, default_value_t = 5)]
    pub honggfuzz_mutations_per_run: usize,

    /// File the stats line is mirrored to, in addition to stdout.
    #[arg(long, default_value = "master.log")]
    pub log_path: PathBuf,
}

/// Arguments specific to `snapfuzz worker`.
#[derive(Debug, Parser)]
pub struct WorkerArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Path to the snapshot the Backend should load.
    #[arg(long)]
    pub snapshot_path: PathBuf,
}

/// `clap`-friendly mirror of [`TraceType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliTraceType {
    None,
    Gva,
    Full,
}

impl From<CliTraceType> for TraceType {
    fn from(v: CliTraceType) -> Self {
        match v {
            CliTraceType::None => TraceType::None,
            CliTraceType::Gva => TraceType::Gva,
            CliTraceType::Full => TraceType::Full,
        }
    }
}

/// `clap`-friendly mirror of [`MutatorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliMutatorKind {
    Libfuzzer,
    Honggfuzz,
}

impl From<CliMutatorKind> for MutatorKind {
    fn from(v: CliMutatorKind) -> Self {
        match v {
            CliMutatorKind::Libfuzzer => MutatorKind::Libfuzzer,
            CliMutatorKind::Honggfuzz => MutatorKind::Honggfuzz,
        }
    }
}

impl MasterArgs {
    /// Builds the core [`Options`] record from these parsed arguments.
    #[must_use]
    pub fn to_options(&self) -> Options {
        Options {
            inputs_path: self.inputs_path.clone(),
            outputs_path: self.outputs_path.clone(),
            crashes_path: self.crashes_path.clone(),
            address: self.common.address.clone(),
            seed: self.common.seed,
            runs: self.runs,
            testcase_buffer_max_size: self.common.testcase_buffer_max_size,
            target_name: self.common.target.clone(),
            base_trace_path: self.common.base_trace_path.clone(),
            trace_type: self.common.trace_type.into(),
            mutator_kind: self.mutator_kind.into(),
            mutate_depth: self.mutate_depth,
            honggfuzz_mutations_per_run: self.honggfuzz_mutations_per_run,
            log_path: self.log_path.clone(),
        }
    }
}

impl WorkerArgs {
    /// Builds the core [`Options`] record from these parsed arguments. A
    /// worker has no corpus of its own, so the path fields are empty.
    #[must_use]
    pub fn to_options(&self) -> Options {
        Options {
            inputs_path: PathBuf::new(),
            outputs_path: PathBuf::new(),
            crashes_path: PathBuf::new(),
            address: self.common.address.clone(),
            seed: self.common.seed,
            runs: 0,
            testcase_buffer_max_size: self.common.testcase_buffer_max_size,
            target_name: self.common.target.clone(),
            base_trace_path: self.common.base_trace_path.clone(),
            trace_type: self.common.trace_type.into(),
            mutator_kind: MutatorKind::Libfuzzer,
            mutate_depth: 5,
            honggfuzz_mutations_per_run: 5,
            log_path: PathBuf::new(),
        }
    }
}
