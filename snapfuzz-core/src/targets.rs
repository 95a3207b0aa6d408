//! The target registry and the target plug-in contract.

use crate::backend::{Backend, CpuState};
use crate::mutators::Mutator;
use crate::options::Options;

/// Called once, after the snapshot is loaded and before any run. Installs
/// breakpoints describing the testcase's terminal boundary and returns
/// whether initialization succeeded.
pub type InitFn = Box<dyn Fn(&Options, &CpuState, &mut dyn Backend) -> bool>;

/// Called by the Execution Engine after every `Restore`. Writes `buf` into
/// guest memory and fixes up registers to describe it to the code under
/// test. Returning `false` aborts the iteration without reporting coverage.
pub type InsertTestcaseFn = Box<dyn Fn(&mut dyn Backend, &[u8]) -> bool>;

/// An optional per-iteration hook run after the Backend's own snapshot
/// restore. Defaults to identity (always succeeds).
pub type RestoreFn = Box<dyn Fn(&mut dyn Backend) -> bool>;

/// An optional factory the target supplies to build a custom mutator
/// instead of the coordinator's configured default.
pub type CreateMutatorFn = Box<dyn Fn(u64) -> Box<dyn Mutator>>;

/// A registered fuzzing target: a name plus the four lifecycle callbacks.
pub struct Target {
    name: String,
    init: InitFn,
    insert_testcase: InsertTestcaseFn,
    restore: RestoreFn,
    create_mutator: Option<CreateMutatorFn>,
}

impl Target {
    /// Creates a target with an identity `restore` hook and no custom
    /// mutator factory.
    pub fn new(
        name: impl Into<String>,
        init: InitFn,
        insert_testcase: InsertTestcaseFn,
    ) -> Self {
        Self {
            name: name.into(),
            init,
            insert_testcase,
            restore: Box::new(|_backend| true),
            create_mutator: None,
        }
    }

    /// Overrides the per-iteration restore hook.
    #[must_use]
    pub fn with_restore(mut self, restore: RestoreFn) -> Self {
        self.restore = restore;
        self
    }

    /// Supplies a custom mutator factory, used instead of the coordinator's
    /// configured default mutator kind.
    #[must_use]
    pub fn with_mutator_factory(mut self, create_mutator: CreateMutatorFn) -> Self {
        self.create_mutator = Some(create_mutator);
        self
    }

    /// This target's registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the target's `Init` callback.
    #[must_use]
    pub fn init(&self, opts: &Options, cpu_state: &CpuState, backend: &mut dyn Backend) -> bool {
        (self.init)(opts, cpu_state, backend)
    }

    /// Runs the target's `InsertTestcase` callback.
    #[must_use]
    pub fn insert_testcase(&self, backend: &mut dyn Backend, buf: &[u8]) -> bool {
        (self.insert_testcase)(backend, buf)
    }

    /// Runs the target's per-iteration `Restore` hook.
    #[must_use]
    pub fn restore(&self, backend: &mut dyn Backend) -> bool {
        (self.restore)(backend)
    }

    /// Builds this target's custom mutator, if it supplies one.
    #[must_use]
    pub fn create_mutator(&self, seed: u64) -> Option<Box<dyn Mutator>> {
        self.create_mutator.as_ref().map(|f| f(seed))
    }
}

/// The process-wide table of registered targets. Read-only once populated by
/// `register_targets()`-style startup code; there is no global/static
/// self-registration.
#[derive(Default)]
pub struct TargetRegistry {
    targets: Vec<Target>,
}

impl TargetRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `target` to the registry.
    pub fn register(&mut self, target: Target) {
        self.targets.push(target);
    }

    /// Looks up a target by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name() == name)
    }

    /// A human-readable listing of every registered target's name, one per
    /// line, suitable for printing when an unknown target is requested.
    #[must_use]
    pub fn display_registered(&self) -> String {
        let mut out = String::from("Existing targets:\n");
        for target in &self.targets {
            out.push_str("  - ");
            out.push_str(target.name());
            out.push('\n');
        }
        out
    }
}
