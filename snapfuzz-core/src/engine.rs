//! The worker-side execution engine: drives one Backend through repeated
//! restore/insert/run cycles and reports the resulting verdict + coverage.

use log::{debug, warn};

use crate::backend::{Action, Backend, CpuState};
use crate::error::Error;
use crate::options::Options;
use crate::targets::Target;
use crate::testcase::{CoverageSet, Verdict};

/// The engine's own view of where it is in one iteration; mirrors the
/// Idle/AwaitingTestcase/Preparing/Running/Reporting states, collapsed to
/// what's observable once a testcase buffer is already in hand (the
/// socket-level Idle/AwaitingTestcase split lives in the worker's network
/// loop, not here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No iteration in progress.
    Idle,
    /// Restore and InsertTestcase are running.
    Preparing,
    /// The Backend is executing toward a breakpoint.
    Running,
}

/// The outcome of one full iteration, ready to be wired into a
/// [`crate::proto::ResultMessage`].
#[derive(Debug, Clone)]
pub struct IterationReport {
    /// The verdict the run terminated with.
    pub verdict: Verdict,
    /// Coverage newly observed during this run.
    pub coverage: CoverageSet,
}

/// Drives a single Backend instance against one registered target for the
/// lifetime of a worker process.
pub struct ExecutionEngine<'a> {
    backend: &'a mut dyn Backend,
    target: &'a Target,
    opts: &'a Options,
    state: EngineState,
    initialized: bool,
}

impl<'a> ExecutionEngine<'a> {
    /// Creates an engine bound to `backend` and `target`.
    #[must_use]
    pub fn new(backend: &'a mut dyn Backend, target: &'a Target, opts: &'a Options) -> Self {
        Self {
            backend,
            target,
            opts,
            state: EngineState::Idle,
            initialized: false,
        }
    }

    /// This engine's current state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Calls the target's `Init` callback exactly once. Must be called
    /// before the first [`ExecutionEngine::run_iteration`].
    pub fn initialize(&mut self, cpu_state: &CpuState) -> Result<(), Error> {
        if self.initialized {
            return Err(Error::illegal_state(
                "ExecutionEngine::initialize called more than once",
            ));
        }
        if !self.target.init(self.opts, cpu_state, self.backend) {
            return Err(Error::illegal_state(format!(
                "target '{}' failed to initialize",
                self.target.name()
            )));
        }
        self.initialized = true;
        Ok(())
    }

    /// Runs one Restore → InsertTestcase → Run-to-terminal cycle for `buf`.
    ///
    /// Returns `Ok(None)` when the iteration was dropped before running
    /// (target rejected the input, or the backend's own restore failed) —
    /// per the contract, a dropped iteration is never reported to the
    /// coordinator. Returns `Ok(Some(report))` otherwise.
    pub fn run_iteration(&mut self, buf: &[u8]) -> Result<Option<IterationReport>, Error> {
        if !self.initialized {
            return Err(Error::illegal_state(
                "ExecutionEngine::run_iteration called before initialize",
            ));
        }
        if self.state != EngineState::Idle {
            return Err(Error::illegal_state(format!(
                "run_iteration called while engine was in {:?}",
                self.state
            )));
        }

        self.state = EngineState::Preparing;

        if self.backend.restore().is_err() {
            debug!("backend restore failed, dropping iteration");
            self.state = EngineState::Idle;
            return Ok(None);
        }
        if !self.target.restore(self.backend) {
            debug!("target restore hook rejected iteration");
            self.state = EngineState::Idle;
            return Ok(None);
        }
        if !self.target.insert_testcase(self.backend, buf) {
            warn!("target '{}' rejected testcase of {} bytes", self.target.name(), buf.len());
            self.state = EngineState::Idle;
            return Ok(None);
        }

        self.state = EngineState::Running;
        let verdict = self.backend.run_until_terminal()?;
        let coverage = self.backend.coverage_since_restore();

        self.state = EngineState::Idle;
        Ok(Some(IterationReport { verdict, coverage }))
    }
}

/// Classifies a breakpoint hit into the `Action` a handler should return,
/// given the kind of boundary it represents. Centralized here so every
/// target's handlers agree on the mapping described in the execution
/// engine's contract.
#[must_use]
pub fn classify_boundary(kind: BoundaryKind) -> Action {
    match kind {
        BoundaryKind::End => Action::Stop(Verdict::Ok),
        BoundaryKind::Bugcheck(name) => Action::Stop(Verdict::Crash(name)),
        BoundaryKind::ContextSwitch => Action::Stop(Verdict::Cr3Change),
        BoundaryKind::Continue => Action::Continue,
    }
}

/// The kind of breakpoint a target's `Init` callback may install.
#[derive(Debug, Clone)]
pub enum BoundaryKind {
    /// The function under test returned normally.
    End,
    /// A fatal exception or bugcheck fired; carries the crash name.
    Bugcheck(String),
    /// The guest performed a context switch (cr3 changed).
    ContextSwitch,
    /// An intermediate breakpoint that doesn't end the run.
    Continue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Register;
    use crate::testcase::Gva;

    struct StubBackend {
        verdict: Verdict,
        coverage: CoverageSet,
        restore_fails: bool,
    }

    impl Backend for StubBackend {
        fn read_register(&self, _reg: Register) -> u64 {
            0
        }
        fn write_register(&mut self, _reg: Register, _value: u64) {}
        fn read_virtual_memory(&self, _addr: Gva, _buf: &mut [u8]) -> Result<(), Error> {
            Ok(())
        }
        fn write_virtual_memory(&mut self, _addr: Gva, _buf: &[u8]) -> Result<(), Error> {
            Ok(())
        }
        fn install_breakpoint(&mut self, _address: Gva, _handler: crate::backend::BreakpointHandler) {}
        fn restore(&mut self) -> Result<(), Error> {
            if self.restore_fails {
                Err(Error::illegal_state("stub restore failure"))
            } else {
                Ok(())
            }
        }
        fn run_until_terminal(&mut self) -> Result<Verdict, Error> {
            Ok(self.verdict.clone())
        }
        fn coverage_since_restore(&self) -> CoverageSet {
            self.coverage.clone()
        }
    }

    fn always_accept_target() -> Target {
        Target::new(
            "stub",
            Box::new(|_opts, _cpu, _backend| true),
            Box::new(|_backend, _buf| true),
        )
    }

    fn opts() -> Options {
        Options {
            inputs_path: Default::default(),
            outputs_path: Default::default(),
            crashes_path: Default::default(),
            address: "127.0.0.1:0".to_string(),
            seed: 1,
            runs: 1,
            testcase_buffer_max_size: 4096,
            target_name: "stub".to_string(),
            base_trace_path: None,
            trace_type: crate::options::TraceType::None,
            mutator_kind: crate::mutators::MutatorKind::Libfuzzer,
            mutate_depth: 5,
            honggfuzz_mutations_per_run: 5,
            log_path: Default::default(),
        }
    }

    #[test]
    fn successful_iteration_reports_verdict_and_coverage() {
        let target = always_accept_target();
        let o = opts();
        let mut coverage = CoverageSet::default();
        coverage.insert(0x1000);
        let mut backend = StubBackend {
            verdict: Verdict::Ok,
            coverage: coverage.clone(),
            restore_fails: false,
        };
        let mut engine = ExecutionEngine::new(&mut backend, &target, &o);
        engine.initialize(&CpuState::new()).unwrap();
        let report = engine.run_iteration(b"AAAA").unwrap().unwrap();
        assert_eq!(report.verdict, Verdict::Ok);
        assert_eq!(report.coverage, coverage);
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn backend_restore_failure_drops_iteration_without_error() {
        let target = always_accept_target();
        let o = opts();
        let mut backend = StubBackend {
            verdict: Verdict::Ok,
            coverage: CoverageSet::default(),
            restore_fails: true,
        };
        let mut engine = ExecutionEngine::new(&mut backend, &target, &o);
        engine.initialize(&CpuState::new()).unwrap();
        let report = engine.run_iteration(b"AAAA").unwrap();
        assert!(report.is_none());
    }

    #[test]
    fn rejecting_target_drops_iteration() {
        let target = Target::new(
            "reject",
            Box::new(|_opts, _cpu, _backend| true),
            Box::new(|_backend, _buf| false),
        );
        let o = opts();
        let mut backend = StubBackend {
            verdict: Verdict::Ok,
            coverage: CoverageSet::default(),
            restore_fails: false,
        };
        let mut engine = ExecutionEngine::new(&mut backend, &target, &o);
        engine.initialize(&CpuState::new()).unwrap();
        assert!(engine.run_iteration(b"AAAA").unwrap().is_none());
    }

    #[test]
    fn running_before_initialize_is_an_error() {
        let target = always_accept_target();
        let o = opts();
        let mut backend = StubBackend {
            verdict: Verdict::Ok,
            coverage: CoverageSet::default(),
            restore_fails: false,
        };
        let mut engine = ExecutionEngine::new(&mut backend, &target, &o);
        assert!(engine.run_iteration(b"AAAA").is_err());
    }

    #[test]
    fn double_initialize_is_an_error() {
        let target = always_accept_target();
        let o = opts();
        let mut backend = StubBackend {
            verdict: Verdict::Ok,
            coverage: CoverageSet::default(),
            restore_fails: false,
        };
        let mut engine = ExecutionEngine::new(&mut backend, &target, &o);
        engine.initialize(&CpuState::new()).unwrap();
        assert!(engine.initialize(&CpuState::new()).is_err());
    }

    #[test]
    fn boundary_kinds_map_to_expected_actions() {
        match classify_boundary(BoundaryKind::End) {
            Action::Stop(Verdict::Ok) => {}
            _ => panic!("expected Ok"),
        }
        match classify_boundary(BoundaryKind::ContextSwitch) {
            Action::Stop(Verdict::Cr3Change) => {}
            _ => panic!("expected Cr3Change"),
        }
        match classify_boundary(BoundaryKind::Bugcheck("x".to_string())) {
            Action::Stop(Verdict::Crash(name)) => assert_eq!(name, "x"),
            _ => panic!("expected Crash"),
        }
        match classify_boundary(BoundaryKind::Continue) {
            Action::Continue => {}
            _ => panic!("expected Continue"),
        }
    }
}
