//! Corpus, mutator engines, target registry, execution engine, wire
//! protocol, and stats for the snapfuzz distributed snapshot fuzzer.
//!
//! This crate is the Backend-agnostic core: it consumes a [`backend::Backend`]
//! implementation from the binary crate (or from an embedder) and never
//! touches a concrete CPU emulator itself.

pub mod backend;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod mutators;
pub mod options;
pub mod proto;
pub mod rand;
pub mod stats;
pub mod targets;
pub mod testcase;

pub use backend::{Action, Backend, BreakpointHandler, CpuState, Register};
pub use corpus::Corpus;
pub use engine::{BoundaryKind, EngineState, ExecutionEngine, IterationReport};
pub use error::Error;
pub use mutators::{Mutator, MutatorKind};
pub use options::{Options, TraceType};
pub use rand::{Rand, StdRand};
pub use stats::StatsAggregator;
pub use targets::{Target, TargetRegistry};
pub use testcase::{CoverageSet, Gva, Testcase, Verdict};
