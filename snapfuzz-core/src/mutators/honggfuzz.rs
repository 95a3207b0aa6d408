//! The Honggfuzz-style mangler: mutates a single "dynamic file" buffer in
//! place with a fixed number of mangling passes, cross-over sourced from the
//! last testcase reported via [`Mutator::on_new_coverage`].

use super::ops;
use super::Mutator;
use crate::corpus::Corpus;
use crate::rand::Rand;
use crate::testcase::Testcase;

/// Default number of mangling operations applied per call.
pub const DEFAULT_MUTATIONS_PER_RUN: usize = 5;

/// The set of mangling operations this engine cycles through. Unlike the
/// libFuzzer-style engine, Honggfuzz carries no dictionaries.
#[derive(Debug, Clone, Copy)]
enum Mangle {
    InsertByte,
    InsertRepeatedByte,
    EraseBytes,
    ChangeByte,
    ChangeBit,
    CopyPart,
    CrossOver,
}

const MANGLES: &[Mangle] = &[
    Mangle::InsertByte,
    Mangle::InsertRepeatedByte,
    Mangle::EraseBytes,
    Mangle::ChangeByte,
    Mangle::ChangeBit,
    Mangle::CopyPart,
    Mangle::CrossOver,
];

/// The Honggfuzz-style mutation engine.
pub struct HonggfuzzMutator {
    mutations_per_run: usize,
    dyn_file: Vec<u8>,
    cross_over_with: Option<Vec<u8>>,
}

impl HonggfuzzMutator {
    /// Creates a new engine applying `mutations_per_run` mangling passes per
    /// call.
    #[must_use]
    pub fn new(mutations_per_run: usize) -> Self {
        Self {
            mutations_per_run: mutations_per_run.max(1),
            dyn_file: Vec::new(),
            cross_over_with: None,
        }
    }

    fn mangle_content(&mut self, max_size: usize, rand: &mut dyn Rand) {
        for _ in 0..self.mutations_per_run {
            let pick = MANGLES[rand.below(MANGLES.len() as u64) as usize];
            match pick {
                Mangle::InsertByte => {
                    ops::insert_byte(&mut self.dyn_file, max_size, rand);
                }
                Mangle::InsertRepeatedByte => {
                    ops::insert_repeated_byte(&mut self.dyn_file, max_size, rand);
                }
                Mangle::EraseBytes => {
                    ops::erase_bytes(&mut self.dyn_file, rand);
                }
                Mangle::ChangeByte => {
                    ops::change_byte(&mut self.dyn_file, rand);
                }
                Mangle::ChangeBit => {
                    ops::change_bit(&mut self.dyn_file, rand);
                }
                Mangle::CopyPart => {
                    ops::copy_part(&mut self.dyn_file, max_size, rand);
                }
                Mangle::CrossOver => {
                    if let Some(other) = self.cross_over_with.clone() {
                        ops::cross_over(&mut self.dyn_file, max_size, &other, rand);
                    }
                }
            }
        }
    }
}

impl Mutator for HonggfuzzMutator {
    fn get_new_testcase(
        &mut self,
        corpus: &Corpus,
        rand: &mut dyn Rand,
        max_size: usize,
    ) -> Vec<u8> {
        self.dyn_file = match corpus.pick(rand) {
            Some(tc) => tc.bytes().to_vec(),
            None => Vec::new(),
        };
        self.dyn_file.truncate(max_size);

        self.mangle_content(max_size, rand);
        self.dyn_file.truncate(max_size);
        self.dyn_file.clone()
    }

    fn on_new_coverage(&mut self, testcase: &Testcase) {
        self.cross_over_with = Some(testcase.bytes().to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rand::StdRand;
    use crate::testcase::Verdict;

    #[test]
    fn output_never_exceeds_max_size() {
        let mut corpus = Corpus::new("");
        corpus
            .save(&Verdict::Ok, Testcase::new(vec![7; 40]))
            .unwrap();
        let mut mutator = HonggfuzzMutator::new(5);
        let mut rand = StdRand::with_seed(11);
        for _ in 0..200 {
            let out = mutator.get_new_testcase(&corpus, &mut rand, 16);
            assert!(out.len() <= 16);
        }
    }

    #[test]
    fn determinism_given_same_seed() {
        let mut corpus = Corpus::new("");
        corpus
            .save(&Verdict::Ok, Testcase::new(b"seed".to_vec()))
            .unwrap();

        let mut mutator_a = HonggfuzzMutator::new(5);
        let mut rand_a = StdRand::with_seed(3);
        let mut out_a = Vec::new();
        for _ in 0..500 {
            out_a = mutator_a.get_new_testcase(&corpus, &mut rand_a, 64);
        }

        let mut mutator_b = HonggfuzzMutator::new(5);
        let mut rand_b = StdRand::with_seed(3);
        let mut out_b = Vec::new();
        for _ in 0..500 {
            out_b = mutator_b.get_new_testcase(&corpus, &mut rand_b, 64);
        }

        assert_eq!(out_a, out_b);
    }

    #[test]
    fn cross_over_source_updates_on_new_coverage() {
        let corpus = Corpus::new("");
        let mut mutator = HonggfuzzMutator::new(5);
        mutator.on_new_coverage(&Testcase::new(b"novel".to_vec()));
        assert_eq!(mutator.cross_over_with.as_deref(), Some(&b"novel"[..]));
        let _ = corpus;
    }
}
