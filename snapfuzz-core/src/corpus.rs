//! The in-memory, content-addressed corpus store.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::Error;
use crate::rand::Rand;
use crate::testcase::{Testcase, Verdict};

/// An append-only collection of accepted testcases, optionally mirrored to
/// disk under a content-addressed filename.
///
/// The corpus never shrinks for the lifetime of a run: [`Corpus::save`] only
/// ever appends. Selection in [`Corpus::pick`] draws from the RNG handed to
/// [`Corpus::new`], which is expected to be the same deterministic stream
/// driving the mutator so that two runs with an identical seed pick an
/// identical sequence of seeds.
pub struct Corpus {
    testcases: Vec<Testcase>,
    bytes: u64,
    outputs_path: PathBuf,
}

impl Corpus {
    /// Creates an empty corpus that persists accepted testcases under
    /// `outputs_path`. An empty path disables on-disk persistence entirely.
    #[must_use]
    pub fn new(outputs_path: impl Into<PathBuf>) -> Self {
        Self {
            testcases: Vec::new(),
            bytes: 0,
            outputs_path: outputs_path.into(),
        }
    }

    /// The number of testcases currently held.
    #[must_use]
    pub fn size(&self) -> usize {
        self.testcases.len()
    }

    /// The sum of the sizes of all testcases currently held.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Picks a testcase uniformly at random, or `None` if the corpus is
    /// empty. Draws exactly one `Rand` value when non-empty.
    pub fn pick<R: Rand>(&self, rand: &mut R) -> Option<&Testcase> {
        if self.testcases.is_empty() {
            return None;
        }
        let idx = rand.below(self.testcases.len() as u64) as usize;
        self.testcases.get(idx)
    }

    /// All currently accepted testcases, in acceptance order.
    #[must_use]
    pub fn testcases(&self) -> &[Testcase] {
        &self.testcases
    }

    /// Filename (relative to the outputs directory) that `testcase` would be
    /// persisted under for `verdict`: `<tag>-<hash>`, tag omitted for `Ok`.
    #[must_use]
    pub fn filename_for(verdict: &Verdict, testcase: &Testcase) -> String {
        let hash = testcase.hash_hex();
        let tag = verdict.tag();
        if tag.is_empty() {
            hash
        } else {
            format!("{tag}-{hash}")
        }
    }

    /// Accepts `testcase` into the corpus.
    ///
    /// If persistence is enabled (a non-empty outputs path) and no file of
    /// the computed name exists yet, the bytes are written to disk first; a
    /// write failure is surfaced as an error and the testcase is *not*
    /// inserted in memory. Otherwise (persistence disabled, or the file
    /// already exists) the testcase is appended unconditionally.
    ///
    /// Returns `true` if the testcase was newly written to disk, `false` if
    /// it was only appended in memory (persistence disabled, or the file was
    /// already present from a previous run).
    pub fn save(&mut self, verdict: &Verdict, testcase: Testcase) -> Result<bool, Error> {
        let mut wrote_file = false;

        if !self.outputs_path.as_os_str().is_empty() {
            let filename = Self::filename_for(verdict, &testcase);
            let path = self.outputs_path.join(&filename);

            if !path.exists() {
                write_new_file(&path, testcase.bytes())?;
                info!("saving output in {}", path.display());
                wrote_file = true;
            }
        }

        self.bytes += testcase.len() as u64;
        self.testcases.push(testcase);
        Ok(wrote_file)
    }
}

/// Writes `bytes` to `path`. The corpus is single-writer (owned exclusively
/// by the coordinator), so a plain existence check followed by a write is
/// race-free here.
fn write_new_file(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    fs::write(path, bytes).map_err(Error::from)
}

/// Reads every regular file directly inside `dir`, skipping anything empty
/// or larger than `max_size`; each skip is logged once. Returns paths sorted
/// *descending* by size so that callers that `pop()` from the back consume
/// them smallest-first.
pub fn load_replay_queue(dir: &Path, max_size: u64) -> Result<Vec<PathBuf>, Error> {
    let mut entries: Vec<(PathBuf, u64)> = Vec::new();

    if !dir.as_os_str().is_empty() && dir.exists() {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let size = entry.metadata()?.len();
            if size == 0 || size > max_size {
                warn!(
                    "skipping {} because its size is zero or bigger than the max ({} vs {})",
                    path.display(),
                    size,
                    max_size
                );
                continue;
            }
            entries.push((path, size));
        }
    }

    entries.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(entries.into_iter().map(|(path, _)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rand::StdRand;

    #[test]
    fn pick_on_empty_corpus_is_none() {
        let corpus = Corpus::new("");
        let mut rand = StdRand::with_seed(1);
        assert!(corpus.pick(&mut rand).is_none());
    }

    #[test]
    fn save_without_persistence_still_appends() {
        let mut corpus = Corpus::new("");
        let wrote = corpus
            .save(&Verdict::Ok, Testcase::new(b"A".to_vec()))
            .unwrap();
        assert!(!wrote);
        assert_eq!(corpus.size(), 1);
        assert_eq!(corpus.bytes(), 1);
    }

    #[test]
    fn save_persists_with_tagged_filename() {
        let dir = tempfile::tempdir().unwrap();
        let mut corpus = Corpus::new(dir.path());
        let tc = Testcase::new(b"A".to_vec());
        let expected_name = Corpus::filename_for(&Verdict::Ok, &tc);
        let wrote = corpus.save(&Verdict::Ok, tc).unwrap();
        assert!(wrote);
        assert!(dir.path().join(&expected_name).exists());
    }

    #[test]
    fn save_same_bytes_twice_writes_one_file_two_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut corpus = Corpus::new(dir.path());
        corpus
            .save(&Verdict::Ok, Testcase::new(b"A".to_vec()))
            .unwrap();
        let wrote_second = corpus
            .save(&Verdict::Ok, Testcase::new(b"A".to_vec()))
            .unwrap();
        assert!(!wrote_second);
        assert_eq!(corpus.size(), 2);
        let mut files = fs::read_dir(dir.path()).unwrap();
        assert!(files.next().is_some());
        assert!(files.next().is_none());
    }

    #[test]
    fn crash_filename_carries_tag_prefix() {
        let tc = Testcase::new(b"A".to_vec());
        let name = Corpus::filename_for(&Verdict::Crash("bug-1".to_string()), &tc);
        assert!(name.starts_with("Crash-"));
    }

    #[test]
    fn replay_queue_sorted_descending_by_size() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("small"), vec![0u8; 1]).unwrap();
        fs::write(dir.path().join("medium"), vec![0u8; 100]).unwrap();
        fs::write(dir.path().join("large"), vec![0u8; 10_000]).unwrap();
        let queue = load_replay_queue(dir.path(), u64::MAX).unwrap();
        let sizes: Vec<u64> = queue
            .iter()
            .map(|p| fs::metadata(p).unwrap().len())
            .collect();
        assert_eq!(sizes, vec![10_000, 100, 1]);
    }

    #[test]
    fn replay_queue_skips_empty_and_oversized() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("empty"), Vec::<u8>::new()).unwrap();
        fs::write(dir.path().join("ok"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("huge"), vec![0u8; 1000]).unwrap();
        let queue = load_replay_queue(dir.path(), 100).unwrap();
        assert_eq!(queue.len(), 1);
    }
}
