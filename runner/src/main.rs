use std::convert::Infallible;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use scheduler::channel::UnixListenerSource;
use scheduler::{Policy, SimConfig, Simulation};

/// Simulated process scheduler server
#[derive(Debug, Parser)]
#[command(name = "ossim", version)]
struct Cli {
    /// Scheduling policy: FIFO, SJF, RR or MLFQ
    policy: String,

    /// TOML file with simulation settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Socket path, overriding the one in the config
    #[arg(long)]
    socket: Option<PathBuf>,
}

/// The text printed for a policy name that is not recognised
fn unrecognized(name: &str) -> String {
    let mut text = format!("Scheduler {name} not recognized. Available options are:\n");
    for policy in Policy::ALL {
        text.push_str(&format!(" - {}\n", policy.name()));
    }
    text
}

fn load_config(cli: &Cli) -> scheduler::Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    if let Some(socket) = &cli.socket {
        config.socket_path = socket.clone();
    }

    Ok(config)
}

fn serve(policy: Policy, config: &SimConfig) -> scheduler::Result<Infallible> {
    let listener = UnixListenerSource::bind(&config.socket_path)?;
    let mut simulation = Simulation::new(listener, policy, config)?;

    info!(
        "Scheduler server listening on {}... (policy {})",
        config.socket_path.display(),
        simulation.policy_name()
    );

    simulation.run()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let policy: Policy = match cli.policy.parse() {
        Ok(policy) => policy,
        Err(_) => {
            print!("{}", unrecognized(&cli.policy));
            return ExitCode::FAILURE;
        }
    };

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match serve(policy, &config) {
        Ok(never) => match never {},
        Err(e) => {
            error!("Failed to set up the scheduler: {}", e);
            ExitCode::FAILURE
        }
    }
}
