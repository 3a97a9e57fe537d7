//! vfkit CLI entry point.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vfkit::{DryRunEngine, Engine, VirtualMachine, VirtualMachineSpec};

/// vfkit - assemble and start a virtual machine from a JSON description
#[derive(Parser, Debug)]
#[command(name = "vfkit")]
#[command(version)]
struct Cli {
    /// Virtual machine description (JSON)
    #[arg(long, short = 'c')]
    config: PathBuf,

    /// Hypervisor engine to run the machine on
    #[arg(long, value_enum, default_value_t = EngineKind::DryRun)]
    engine: EngineKind,

    /// Also write logs to <DIR>/vfkit.log
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Print the validated engine configuration as JSON
    #[arg(long)]
    print_config: bool,

    /// Refuse nested virtualization, as a host without support would
    #[arg(long)]
    no_nested: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum EngineKind {
    /// Validate structure only; nothing boots
    DryRun,
}

fn load_spec(path: &Path) -> anyhow::Result<VirtualMachineSpec> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let spec = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(spec)
}

fn make_engine(cli: &Cli) -> Arc<dyn Engine> {
    match cli.engine {
        EngineKind::DryRun => {
            Arc::new(DryRunEngine::new().nested_virtualization_supported(!cli.no_nested))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let spec = load_spec(&cli.config)?;
    let mut vm = VirtualMachine::new(spec, make_engine(&cli))?;

    vm.start().await.context("failed to start virtual machine")?;

    if cli.print_config {
        let config = vm
            .configuration()
            .context("virtual machine has no configuration")?;
        println!("{}", serde_json::to_string_pretty(config)?);
    }

    vm.stop().await.context("failed to stop virtual machine")?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_guard = match vfkit::logging::init_logging(cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    tracing::debug!(version = vfkit::VERSION, "starting vfkit");

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {:#}", e);
        drop(log_guard);
        std::process::exit(1);
    }
}
