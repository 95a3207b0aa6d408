//! The worker (client): connects to a coordinator, loads a snapshot, and
//! drives the execution engine in a plain blocking loop.

use std::net::TcpStream;

use log::{error, info};

use snapfuzz_core::backend::{Backend, CpuState};
use snapfuzz_core::engine::ExecutionEngine;
use snapfuzz_core::proto::{self, ResultMessage, TestcaseMessage};
use snapfuzz_core::{Error, Options, Target};

/// Connects to `opts.address`, initializes `target` against `backend`, then
/// loops: receive testcase → restore → insert → run → send result, until
/// the socket closes or the Backend reports a hard error.
pub fn run(opts: &Options, target: &Target, backend: &mut dyn Backend) -> Result<(), Error> {
    let mut stream = TcpStream::connect(&opts.address)?;
    info!("worker connected to {}", opts.address);

    let mut engine = ExecutionEngine::new(backend, target, opts);
    engine.initialize(&CpuState::new())?;

    loop {
        let request: TestcaseMessage = match proto::try_read_frame(&mut stream)? {
            Some(msg) => msg,
            None => {
                info!("coordinator closed the connection, worker exiting");
                return Ok(());
            }
        };

        let report = match engine.run_iteration(&request.bytes)? {
            Some(report) => report,
            None => {
                // The iteration was dropped before running; the contract
                // says this is never reported to the coordinator, so we
                // still owe it *a* response to keep the protocol's strict
                // one-outstanding-request invariant, just with an empty
                // coverage set and an `Ok` verdict.
                error!("iteration dropped (target rejected input or restore failed)");
                proto::write_frame(
                    &mut stream,
                    &ResultMessage {
                        bytes: request.bytes,
                        coverage: Default::default(),
                        verdict: snapfuzz_core::Verdict::Ok,
                    },
                )?;
                continue;
            }
        };

        proto::write_frame(
            &mut stream,
            &ResultMessage {
                bytes: request.bytes,
                coverage: report.coverage,
                verdict: report.verdict,
            },
        )?;
    }
}
