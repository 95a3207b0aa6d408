//! Binary entry point: parses the command line, wires up logging, and
//! dispatches to the coordinator or worker role.

use clap::Parser;
use log::error;

use snapfuzz::cli::{Cli, Command};
use snapfuzz::{coordinator, targets};
use snapfuzz_core::TargetRegistry;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut registry = TargetRegistry::new();
    targets::register_targets(&mut registry);

    let exit_code = match run(&cli, &registry) {
        Ok(()) => 0,
        Err(e) => {
            error!("{e}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli, registry: &TargetRegistry) -> Result<(), snapfuzz_core::Error> {
    match &cli.command {
        Command::Master(args) => {
            require_registered(registry, &args.common.target)?;
            let opts = args.to_options();
            coordinator::run(&opts)
        }
        Command::Worker(args) => {
            require_registered(registry, &args.common.target)?;
            let opts = args.to_options();
            let target = registry.get(&args.common.target).expect("checked above");
            let _ = (&opts, target);

            // The concrete Backend (snapshot loading, register/memory
            // access, single-stepping) is an external collaborator this
            // crate does not implement; a deployable worker plugs one in
            // here before calling `worker::run(&opts, target, &mut backend)`.
            Err(snapfuzz_core::Error::not_implemented(format!(
                "no Backend wired up to load snapshot '{}'",
                args.snapshot_path.display()
            )))
        }
    }
}

fn require_registered(registry: &TargetRegistry, name: &str) -> Result<(), snapfuzz_core::Error> {
    if registry.get(name).is_some() {
        return Ok(());
    }
    eprintln!("unknown target '{name}'\n{}", registry.display_registered());
    Err(snapfuzz_core::Error::not_found(format!(
        "target '{name}' is not registered"
    )))
}
