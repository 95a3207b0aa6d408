//! The coordinator (master): a single-threaded, readiness-multiplexed event
//! loop owning the corpus, mutator, and aggregate coverage set.
//!
//! Frames are small (a length prefix plus at most `TestcaseBufferMaxSize`
//! bytes) and in practice land in a single readiness tick, so
//! `proto::read_frame`/`write_frame` are used directly against the
//! non-blocking mio streams rather than behind a partial-read buffer.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use log::{error, info, warn};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};

use snapfuzz_core::corpus::load_replay_queue;
use snapfuzz_core::proto::{self, ResultMessage, TestcaseMessage};
use snapfuzz_core::{Corpus, Error, Mutator, Options, Rand, StatsAggregator, StdRand, Verdict};

const LISTENER: Token = Token(0);

/// Where a connection sits in the strict write-then-read cycle described by
/// the wire protocol: freshly accepted sockets start in `AwaitingWrite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    AwaitingWrite,
    AwaitingRead,
}

struct WorkerConn {
    stream: TcpStream,
    state: ConnState,
}

/// Where the next testcase to send comes from.
enum NextTestcase {
    Replay(Vec<u8>),
    Mutated(Vec<u8>),
}

/// Runs the coordinator until `opts.runs` mutations have been issued and the
/// replay queue is drained, serving `opts.address`.
pub fn run(opts: &Options) -> Result<(), Error> {
    opts.validate()?;

    let mut poll = Poll::new().map_err(io_err)?;
    let mut events = Events::with_capacity(1024);

    let addr: std::net::SocketAddr = opts
        .address
        .parse()
        .map_err(|e| Error::illegal_argument(format!("invalid address '{}': {e}", opts.address)))?;
    let mut listener = TcpListener::bind(addr).map_err(io_err)?;
    poll.registry()
        .register(&mut listener, LISTENER, Interest::READABLE)
        .map_err(io_err)?;

    let mut corpus = Corpus::new(opts.outputs_path.clone());
    let mut rand = StdRand::with_seed(opts.seed);
    let mut mutator = opts.mutator_kind.build(opts.mutate_depth, opts.honggfuzz_mutations_per_run);
    let mut aggregate_coverage = snapfuzz_core::CoverageSet::default();
    let mut stats = StatsAggregator::new();
    stats.open_log(&opts.log_path)?;

    let mut replay_queue: VecDeque<PathBuf> =
        load_replay_queue(&opts.inputs_path, opts.testcase_buffer_max_size as u64)?.into();
    let mut mutations_issued: u64 = 0;

    let mut conns: HashMap<Token, WorkerConn> = HashMap::new();
    let mut next_token = 1usize;

    info!(
        "coordinator listening on {} ({} replay files queued)",
        opts.address,
        replay_queue.len()
    );

    loop {
        poll.poll(&mut events, Some(Duration::from_secs(1))).map_err(io_err)?;
        stats.print(false);

        // Scan the read-ready set first: new connections and worker results.
        // Mirrors the reference server's select() loop, which drains reads
        // (accepting new clients, handling results) before ever looking at
        // the write set.
        let mut readable: Vec<Token> = Vec::new();
        let mut writable: Vec<Token> = Vec::new();
        for event in events.iter() {
            if event.token() == LISTENER {
                accept_all(&mut poll, &mut listener, &mut conns, &mut next_token, &mut stats)?;
            } else if event.is_readable() {
                readable.push(event.token());
            } else if event.is_writable() {
                writable.push(event.token());
            }
        }

        for token in readable {
            let outcome = handle_result(
                &mut conns,
                token,
                &mut corpus,
                &mut mutator,
                &mut aggregate_coverage,
                &mut stats,
                opts,
            );
            reregister_or_disconnect(&mut poll, &mut conns, token, outcome, &mut stats);
        }

        if mutations_issued >= opts.runs && replay_queue.is_empty() {
            info!("reached {} mutations with an empty replay queue, stopping", opts.runs);
            break;
        }

        for token in writable {
            let outcome = handle_request(
                &mut conns,
                token,
                &mut corpus,
                &mut mutator,
                &mut rand,
                &mut replay_queue,
                &mut mutations_issued,
                opts,
            );
            reregister_or_disconnect(&mut poll, &mut conns, token, outcome, &mut stats);
        }
    }

    stats.print(true);
    Ok(())
}

fn accept_all(
    poll: &mut Poll,
    listener: &mut TcpListener,
    conns: &mut HashMap<Token, WorkerConn>,
    next_token: &mut usize,
    stats: &mut StatsAggregator,
) -> Result<(), Error> {
    loop {
        match listener.accept() {
            Ok((mut stream, peer)) => {
                let token = Token(*next_token);
                *next_token += 1;
                poll.registry()
                    .register(&mut stream, token, Interest::WRITABLE)
                    .map_err(io_err)?;
                conns.insert(
                    token,
                    WorkerConn {
                        stream,
                        state: ConnState::AwaitingWrite,
                    },
                );
                stats.new_client();
                info!("accepted worker {peer} as {token:?}");
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => {
                warn!("accept failed: {e}");
                return Ok(());
            }
        }
    }
}

fn reregister_or_disconnect(
    poll: &mut Poll,
    conns: &mut HashMap<Token, WorkerConn>,
    token: Token,
    outcome: Result<(), Error>,
    stats: &mut StatsAggregator,
) {
    if outcome.is_err() {
        disconnect(poll, conns, token, stats);
        return;
    }
    if let Some(conn) = conns.get_mut(&token) {
        let interest = match conn.state {
            ConnState::AwaitingRead => Interest::READABLE,
            ConnState::AwaitingWrite => Interest::WRITABLE,
        };
        let _ = poll.registry().reregister(&mut conn.stream, token, interest);
    }
}

fn handle_request(
    conns: &mut HashMap<Token, WorkerConn>,
    token: Token,
    corpus: &mut Corpus,
    mutator: &mut Box<dyn Mutator>,
    rand: &mut StdRand,
    replay_queue: &mut VecDeque<PathBuf>,
    mutations_issued: &mut u64,
    opts: &Options,
) -> Result<(), Error> {
    let bytes = match next_testcase(replay_queue, corpus, mutator, rand, opts, mutations_issued)? {
        NextTestcase::Replay(b) | NextTestcase::Mutated(b) => b,
    };

    let conn = conns
        .get_mut(&token)
        .ok_or_else(|| Error::illegal_state("handle_request on unknown connection"))?;
    proto::write_frame(&mut conn.stream, &TestcaseMessage { bytes })?;
    conn.state = ConnState::AwaitingRead;
    Ok(())
}

fn next_testcase(
    replay_queue: &mut VecDeque<PathBuf>,
    corpus: &mut Corpus,
    mutator: &mut Box<dyn Mutator>,
    rand: &mut StdRand,
    opts: &Options,
    mutations_issued: &mut u64,
) -> Result<NextTestcase, Error> {
    while let Some(path) = replay_queue.pop_back() {
        match std::fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() && bytes.len() <= opts.testcase_buffer_max_size => {
                return Ok(NextTestcase::Replay(bytes));
            }
            Ok(_) => warn!("skipping oversized/empty replay file {}", path.display()),
            Err(e) => warn!("failed to read replay file {}: {e}", path.display()),
        }
    }

    *mutations_issued += 1;
    let bytes = mutator.get_new_testcase(corpus, rand, opts.testcase_buffer_max_size);
    Ok(NextTestcase::Mutated(bytes))
}

fn handle_result(
    conns: &mut HashMap<Token, WorkerConn>,
    token: Token,
    corpus: &mut Corpus,
    mutator: &mut Box<dyn Mutator>,
    aggregate_coverage: &mut snapfuzz_core::CoverageSet,
    stats: &mut StatsAggregator,
    opts: &Options,
) -> Result<(), Error> {
    let conn = conns
        .get_mut(&token)
        .ok_or_else(|| Error::illegal_state("handle_result on unknown connection"))?;
    let result: ResultMessage = proto::read_frame(&mut conn.stream)?;

    let before = aggregate_coverage.len();
    aggregate_coverage.extend(result.coverage.iter().copied());
    let grew = aggregate_coverage.len() > before;

    if grew {
        let testcase = snapfuzz_core::Testcase::new(result.bytes.clone());
        mutator.on_new_coverage(&testcase);
        corpus.save(&result.verdict, testcase)?;
    }

    if let Some(name) = result.verdict.crash_name() {
        let path = opts.crashes_path.join(name);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        std::fs::write(&path, &result.bytes)?;
    }

    stats.record_verdict(&result.verdict, aggregate_coverage.len(), grew);
    stats.record_corpus(corpus.size(), corpus.bytes());

    if matches!(result.verdict, Verdict::Crash(_)) {
        error!("worker {token:?} reported a crash: {}", result.verdict);
    }

    conn.state = ConnState::AwaitingWrite;
    Ok(())
}

fn disconnect(poll: &mut Poll, conns: &mut HashMap<Token, WorkerConn>, token: Token, stats: &mut StatsAggregator) {
    if let Some(mut conn) = conns.remove(&token) {
        let _ = poll.registry().deregister(&mut conn.stream);
        let _ = conn.stream.shutdown(std::net::Shutdown::Both);
    }
    stats.disconnect();
    stats.print(true);
}

fn io_err(e: io::Error) -> Error {
    Error::from(e)
}
