//! The libFuzzer-style `MutationDispatcher`: applies a short random
//! sequence of low-level byte mutators per call, backed by three coexisting
//! dictionaries and a table-of-recent-compares (TORC).

use std::collections::VecDeque;

use super::dictionary::{DictEntry, Dictionary};
use super::ops;
use super::Mutator;
use crate::corpus::Corpus;
use crate::rand::Rand;
use crate::testcase::Testcase;

/// Capacity of the table-of-recent-compares deque.
const TORC_CAPACITY: usize = 16;

/// Default number of mutators applied per call when not overridden.
pub const DEFAULT_MUTATE_DEPTH: usize = 5;

/// A single step this engine can apply to a candidate buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    ShuffleBytes,
    EraseBytes,
    InsertByte,
    InsertRepeatedBytes,
    ChangeByte,
    ChangeBit,
    CopyPart,
    CrossOver,
    AddWordFromManualDict,
    AddWordFromTorc,
    AddWordFromPersistentAutoDict,
    ChangeAsciiInteger,
    ChangeBinaryInteger,
}

/// All steps this engine may pick from, in the order the source enables
/// them in.
const ALL_STEPS: &[Step] = &[
    Step::ShuffleBytes,
    Step::EraseBytes,
    Step::InsertByte,
    Step::InsertRepeatedBytes,
    Step::ChangeByte,
    Step::ChangeBit,
    Step::CopyPart,
    Step::CrossOver,
    Step::AddWordFromManualDict,
    Step::AddWordFromTorc,
    Step::AddWordFromPersistentAutoDict,
    Step::ChangeAsciiInteger,
    Step::ChangeBinaryInteger,
];

/// The libFuzzer-style mutation engine.
pub struct LibfuzzerMutator {
    mutate_depth: usize,
    manual_dict: Dictionary,
    temp_auto_dict: Dictionary,
    persistent_auto_dict: Dictionary,
    torc: VecDeque<DictEntry>,
    cross_over_with: Option<Vec<u8>>,
    /// Steps applied during the most recent `get_new_testcase`, so
    /// `on_new_coverage` can promote them into the persistent dictionary.
    last_mutation_log: Vec<Step>,
}

impl LibfuzzerMutator {
    /// Creates a new engine applying between 1 and `mutate_depth` mutators
    /// per call.
    #[must_use]
    pub fn new(mutate_depth: usize) -> Self {
        Self {
            mutate_depth: mutate_depth.max(1),
            manual_dict: Dictionary::new(),
            temp_auto_dict: Dictionary::new(),
            persistent_auto_dict: Dictionary::new(),
            torc: VecDeque::with_capacity(TORC_CAPACITY),
            cross_over_with: None,
            last_mutation_log: Vec::new(),
        }
    }

    /// Seeds the user-provided dictionary, e.g. from a `-dict=` file.
    pub fn add_dictionary_word(&mut self, word: Vec<u8>) {
        self.manual_dict.push(DictEntry::new(word));
    }

    /// Records a value observed at a comparison instruction (harvested by
    /// the Backend's comparison hooks), feeding the TORC.
    pub fn record_compare(&mut self, word: Vec<u8>) {
        if self.torc.len() == TORC_CAPACITY {
            self.torc.pop_front();
        }
        self.torc.push_back(DictEntry::new(word));
    }

    fn apply_step(
        &mut self,
        step: Step,
        buf: &mut Vec<u8>,
        max_size: usize,
        rand: &mut dyn Rand,
    ) -> bool {
        match step {
            Step::ShuffleBytes => ops::shuffle_bytes(buf, rand),
            Step::EraseBytes => ops::erase_bytes(buf, rand),
            Step::InsertByte => ops::insert_byte(buf, max_size, rand),
            Step::InsertRepeatedBytes => ops::insert_repeated_byte(buf, max_size, rand),
            Step::ChangeByte => ops::change_byte(buf, rand),
            Step::ChangeBit => ops::change_bit(buf, rand),
            Step::CopyPart => ops::copy_part(buf, max_size, rand),
            Step::CrossOver => match &self.cross_over_with {
                Some(other) => ops::cross_over(buf, max_size, other, rand),
                None => false,
            },
            Step::AddWordFromManualDict => {
                ops::add_word_from_dict(buf, max_size, &mut self.manual_dict, rand)
            }
            Step::AddWordFromTorc => {
                if self.torc.is_empty() {
                    false
                } else {
                    let idx = rand.below(self.torc.len() as u64) as usize;
                    let word = self.torc[idx].word().to_vec();
                    self.torc[idx].record_use();
                    if buf.len() >= max_size {
                        false
                    } else {
                        let pos = rand.below((buf.len() + 1) as u64) as usize;
                        let room = max_size - buf.len();
                        let word = if word.len() > room {
                            word[..room].to_vec()
                        } else {
                            word
                        };
                        buf.splice(pos..pos, word);
                        true
                    }
                }
            }
            Step::AddWordFromPersistentAutoDict => {
                ops::add_word_from_dict(buf, max_size, &mut self.persistent_auto_dict, rand)
            }
            Step::ChangeAsciiInteger => ops::change_ascii_integer(buf, rand),
            Step::ChangeBinaryInteger => ops::change_binary_integer(buf, rand),
        }
    }
}

impl Mutator for LibfuzzerMutator {
    fn get_new_testcase(
        &mut self,
        corpus: &Corpus,
        rand: &mut dyn Rand,
        max_size: usize,
    ) -> Vec<u8> {
        let mut buf = match corpus.pick(rand) {
            Some(tc) => tc.bytes().to_vec(),
            None => Vec::new(),
        };
        buf.truncate(max_size);

        let num_steps = 1 + rand.below(self.mutate_depth as u64) as usize;
        self.last_mutation_log.clear();
        for _ in 0..num_steps {
            let step = ALL_STEPS[rand.below(ALL_STEPS.len() as u64) as usize];
            if self.apply_step(step, &mut buf, max_size, rand) {
                self.last_mutation_log.push(step);
            }
        }

        buf.truncate(max_size);
        buf
    }

    fn on_new_coverage(&mut self, testcase: &Testcase) {
        self.cross_over_with = Some(testcase.bytes().to_vec());

        // Promote the mutation sequence that led here: any dictionary word
        // this run just consumed is rewarded with a success in the
        // persistent auto-dictionary so future runs favor it.
        if !self.last_mutation_log.is_empty() {
            let entry = DictEntry::new(testcase.bytes().to_vec());
            self.persistent_auto_dict.push(entry);
            if let Some(last) = self.persistent_auto_dict.get_mut(
                self.persistent_auto_dict.len().saturating_sub(1),
            ) {
                last.record_success();
            }
        }
    }
}
