//! Pluggable mutation engines.
//!
//! The coordinator only ever sees the [`Mutator`] capability trait; the two
//! concrete engines ([`libfuzzer::LibfuzzerMutator`] and
//! [`honggfuzz::HonggfuzzMutator`]) are interchangeable values behind
//! `Box<dyn Mutator>`, selected once at startup by [`MutatorKind`].

pub mod dictionary;
pub mod honggfuzz;
pub mod libfuzzer;
mod ops;

use crate::corpus::Corpus;
use crate::rand::Rand;
use crate::testcase::Testcase;

/// The minimal capability set the coordinator drives a mutation engine
/// through. Mutators never fail: a zero-sized result is legal (and will
/// typically be rejected downstream by the target's `InsertTestcase`).
pub trait Mutator {
    /// Produces one new candidate input, derived from `corpus` and `rand`,
    /// clamped to at most `max_size` bytes.
    fn get_new_testcase(&mut self, corpus: &Corpus, rand: &mut dyn Rand, max_size: usize)
        -> Vec<u8>;

    /// Called by the coordinator whenever `testcase` is accepted into the
    /// corpus for producing novel coverage. Engines use this to set up the
    /// next cross-over partner and to reward the mutators that led here.
    fn on_new_coverage(&mut self, testcase: &Testcase);
}

/// Which mutation engine to instantiate; selected once at startup from
/// configuration, mirroring the target's optional `create_mutator` factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutatorKind {
    /// The libFuzzer-style `MutationDispatcher`.
    Libfuzzer,
    /// The Honggfuzz-style dynamic-file mangler.
    Honggfuzz,
}

impl MutatorKind {
    /// Builds the selected engine, seeded from the same stream the
    /// coordinator threads through corpus selection.
    #[must_use]
    pub fn build(self, mutate_depth: usize, honggfuzz_mutations_per_run: usize) -> Box<dyn Mutator> {
        match self {
            MutatorKind::Libfuzzer => {
                Box::new(libfuzzer::LibfuzzerMutator::new(mutate_depth))
            }
            MutatorKind::Honggfuzz => {
                Box::new(honggfuzz::HonggfuzzMutator::new(honggfuzz_mutations_per_run))
            }
        }
    }
}
