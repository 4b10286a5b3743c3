//! SONiC Orchagent entry point.
//!
//! Drives a simulated switch: desired-state documents are applied in order
//! through the update loop, and the adapter contents can be saved to a
//! snapshot so that a later `--warm-boot` run picks them up again.

use anyhow::{bail, Context};
use clap::Parser;
use log::{error, info, warn};
use sonic_orchagent::config::AgentConfig;
use sonic_orchagent::daemon::{DaemonError, OrchDaemon};
use sonic_orchagent::hw_switch::{BootType, HwSwitch};
use sonic_orchagent::state::SwitchState;
use sonic_sai::FakeSai;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// SONiC Switch Orchestration Agent
#[derive(Parser, Debug)]
#[command(name = "orchagent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Agent configuration file (TOML)
    #[arg(short = 'c', long, default_value = "/etc/sonic/orchagent.toml")]
    config: PathBuf,

    /// Desired-state JSON document; repeat to apply several in order
    #[arg(short = 's', long = "state")]
    states: Vec<PathBuf>,

    /// Reload hardware state instead of starting from empty hardware
    #[arg(long)]
    warm_boot: bool,

    /// Adapter snapshot, loaded on warm boot and written on exit
    #[arg(long)]
    adapter_snapshot: Option<PathBuf>,

    /// Keep processing until interrupted
    #[arg(long)]
    serve: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

fn load_adapter(args: &Args) -> anyhow::Result<FakeSai> {
    match (&args.adapter_snapshot, args.warm_boot) {
        (Some(path), true) if path.exists() => FakeSai::load(path)
            .with_context(|| format!("loading adapter snapshot {}", path.display())),
        (_, true) => {
            warn!("No adapter snapshot found; warm boot starts from empty hardware");
            Ok(FakeSai::new())
        }
        (_, false) => Ok(FakeSai::new()),
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = AgentConfig::load_or_default(&args.config)?;
    config.validate()?;
    info!(
        "Platform: {}, {} port groups",
        config.switch.platform,
        config.port_groups.len()
    );

    let adapter = Arc::new(load_adapter(&args)?);
    let boot = if args.warm_boot {
        BootType::Warm
    } else {
        BootType::Cold
    };
    let switch = HwSwitch::init(adapter.clone(), config.platform(), &config.groups(), boot)
        .context("initializing switch")?;

    let (mut daemon, handle) = OrchDaemon::new(config.daemon_config(args.warm_boot), switch);
    let update_loop = tokio::spawn(async move {
        daemon.run().await;
        daemon
    });

    for path in &args.states {
        let mut state = SwitchState::load(path)?;
        if state.src_mac.is_zero() {
            if let Some(mac) = config.switch.src_mac {
                state.src_mac = mac;
            }
        }
        match handle.apply_state(state).await {
            Ok(()) => info!("Applied {}", path.display()),
            Err(DaemonError::Switch(e)) if !e.class().is_fatal() => {
                error!("Rejected {}: {}", path.display(), e);
            }
            Err(e) => bail!("applying {}: {}", path.display(), e),
        }
    }

    if args.warm_boot {
        let removed = handle.finish_warm_boot().await?;
        info!("Warm boot finished, {} stale objects removed", removed);
    }

    if args.serve {
        info!("Serving until interrupted");
        match tokio::signal::ctrl_c().await {
            Ok(()) => warn!("Received SIGINT, shutting down gracefully..."),
            Err(err) => error!("Failed to listen for ctrl-c: {}", err),
        }
    }

    handle.stop().await?;
    let daemon = update_loop.await.context("update loop panicked")?;
    for line in daemon.dump() {
        info!("{}", line);
    }

    if let Some(path) = &args.adapter_snapshot {
        adapter
            .save(path)
            .with_context(|| format!("saving adapter snapshot {}", path.display()))?;
        info!("Adapter snapshot written to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    info!("====================================================================");
    info!("Starting SONiC orchagent");
    info!("====================================================================");
    info!("Config: {}", args.config.display());
    info!("Desired-state documents: {}", args.states.len());
    if args.warm_boot {
        info!("Warm boot mode: ENABLED");
    }

    let result = run(args).await;

    info!("====================================================================");
    info!("SONiC orchagent shutdown complete");
    info!("====================================================================");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("orchagent failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
