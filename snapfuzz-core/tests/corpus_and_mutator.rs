//! Black-box exercise of the corpus/mutator/RNG triangle: the pieces the
//! coordinator threads together every iteration.

use snapfuzz_core::{Corpus, MutatorKind, Rand, StdRand, Testcase, Verdict};

#[test]
fn interesting_testcases_accumulate_and_feed_future_mutations() {
    let dir = tempfile::tempdir().unwrap();
    let mut corpus = Corpus::new(dir.path());
    let mut rand = StdRand::with_seed(42);
    let mut mutator = MutatorKind::Libfuzzer.build(5, 5);

    corpus.save(&Verdict::Ok, Testcase::new(b"seed".to_vec())).unwrap();

    for _ in 0..50 {
        let candidate = mutator.get_new_testcase(&corpus, &mut rand, 64);
        assert!(candidate.len() <= 64);
    }

    let novel = Testcase::new(b"novel-coverage-input".to_vec());
    mutator.on_new_coverage(&novel);
    let wrote = corpus.save(&Verdict::Ok, novel).unwrap();
    assert!(wrote);
    assert_eq!(corpus.size(), 2);
}

#[test]
fn identical_seed_and_corpus_reproduce_the_nth_mutation() {
    let run_once = |seed: u64| {
        let mut corpus = Corpus::new("");
        corpus.save(&Verdict::Ok, Testcase::new(b"A".to_vec())).unwrap();
        let mut rand = StdRand::with_seed(seed);
        let mut mutator = MutatorKind::Honggfuzz.build(5, 5);
        let mut last = Vec::new();
        for _ in 0..1000 {
            last = mutator.get_new_testcase(&corpus, &mut rand, 32);
        }
        last
    };

    assert_eq!(run_once(7), run_once(7));
}

#[test]
fn save_same_bytes_twice_with_persistence_writes_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut corpus = Corpus::new(dir.path());
    let first = corpus.save(&Verdict::Ok, Testcase::new(b"dup".to_vec())).unwrap();
    let second = corpus.save(&Verdict::Ok, Testcase::new(b"dup".to_vec())).unwrap();
    assert!(first);
    assert!(!second);
    assert_eq!(corpus.size(), 2);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn pick_is_reproducible_for_a_fixed_rng_stream() {
    let mut corpus = Corpus::new("");
    for b in [b"one".to_vec(), b"two".to_vec(), b"three".to_vec()] {
        corpus.save(&Verdict::Ok, Testcase::new(b)).unwrap();
    }

    let mut rand_a = StdRand::with_seed(5);
    let mut rand_b = StdRand::with_seed(5);
    for _ in 0..20 {
        assert_eq!(corpus.pick(&mut rand_a), corpus.pick(&mut rand_b));
    }
}
