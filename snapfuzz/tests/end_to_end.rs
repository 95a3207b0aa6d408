//! Black-box coordinator tests: a real TCP loopback connection, a mock
//! worker driven directly from the test thread, and the coordinator's own
//! event loop running as it would in production.

use std::net::TcpStream;
use std::path::PathBuf;
use std::thread;

use snapfuzz::coordinator;
use snapfuzz_core::options::TraceType;
use snapfuzz_core::proto::{read_frame, write_frame, ResultMessage, TestcaseMessage};
use snapfuzz_core::{CoverageSet, MutatorKind, Options, Verdict};

fn base_options(outputs: PathBuf, crashes: PathBuf, runs: u64) -> Options {
    Options {
        inputs_path: PathBuf::new(),
        outputs_path: outputs,
        crashes_path: crashes,
        address: "127.0.0.1:0".to_string(),
        seed: 1,
        runs,
        testcase_buffer_max_size: 64,
        target_name: "dummy".to_string(),
        base_trace_path: None,
        trace_type: TraceType::None,
        mutator_kind: MutatorKind::Libfuzzer,
        mutate_depth: 5,
        honggfuzz_mutations_per_run: 5,
        log_path: PathBuf::new(),
    }
}

/// Picks an available loopback port by briefly binding to port 0, then
/// reuses that address for the coordinator; good enough for a test that
/// doesn't race other listeners on the same machine.
fn free_loopback_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

#[test]
fn one_run_with_novel_coverage_is_persisted_to_outputs() {
    let outputs = tempfile::tempdir().unwrap();
    let crashes = tempfile::tempdir().unwrap();
    let mut opts = base_options(outputs.path().to_path_buf(), crashes.path().to_path_buf(), 1);
    opts.address = free_loopback_address();
    let address = opts.address.clone();

    let coordinator_thread = thread::spawn(move || coordinator::run(&opts));

    // Give the coordinator a moment to bind before the worker connects.
    let mut client = connect_with_retry(&address);

    let testcase: TestcaseMessage = read_frame(&mut client).unwrap();
    let mut coverage = CoverageSet::default();
    coverage.insert(0x1234);
    write_frame(
        &mut client,
        &ResultMessage {
            bytes: testcase.bytes.clone(),
            coverage,
            verdict: Verdict::Ok,
        },
    )
    .unwrap();

    coordinator_thread.join().unwrap().unwrap();

    let entries: Vec<_> = std::fs::read_dir(outputs.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn named_crash_is_persisted_under_crashes_directory() {
    let outputs = tempfile::tempdir().unwrap();
    let crashes = tempfile::tempdir().unwrap();
    let mut opts = base_options(outputs.path().to_path_buf(), crashes.path().to_path_buf(), 1);
    opts.address = free_loopback_address();
    let address = opts.address.clone();

    let coordinator_thread = thread::spawn(move || coordinator::run(&opts));
    let mut client = connect_with_retry(&address);

    let testcase: TestcaseMessage = read_frame(&mut client).unwrap();
    write_frame(
        &mut client,
        &ResultMessage {
            bytes: testcase.bytes,
            coverage: CoverageSet::default(),
            verdict: Verdict::Crash("bug-1".to_string()),
        },
    )
    .unwrap();

    coordinator_thread.join().unwrap().unwrap();

    assert!(crashes.path().join("bug-1").exists());
}

#[test]
fn malformed_result_disconnects_without_poisoning_the_coordinator() {
    let outputs = tempfile::tempdir().unwrap();
    let crashes = tempfile::tempdir().unwrap();
    let mut opts = base_options(outputs.path().to_path_buf(), crashes.path().to_path_buf(), 1);
    opts.address = free_loopback_address();
    let address = opts.address.clone();

    let coordinator_thread = thread::spawn(move || coordinator::run(&opts));
    let mut client = connect_with_retry(&address);

    // Wait for the testcase to arrive, then reply with garbage instead of a
    // well-formed ResultMessage frame.
    let _testcase: TestcaseMessage = read_frame(&mut client).unwrap();
    use std::io::Write;
    client.write_all(&[1, 2, 3]).unwrap();
    drop(client);

    coordinator_thread.join().unwrap().unwrap();

    assert_eq!(std::fs::read_dir(outputs.path()).unwrap().count(), 0);
}

fn connect_with_retry(address: &str) -> TcpStream {
    for _ in 0..200 {
        if let Ok(stream) = TcpStream::connect(address) {
            return stream;
        }
        thread::sleep(std::time::Duration::from_millis(10));
    }
    panic!("coordinator never started listening on {address}");
}
