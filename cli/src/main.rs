/*!

This is the command line interface for installing Apicurito into a cluster and verifying that the
deployment became ready.

!*/

mod install;
mod status;
mod uninstall;
mod wait;

use anyhow::{Context, Result};
use apicurito_model::config::InstallConfig;
use apicurito_model::manager::InstallManager;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use std::path::PathBuf;

/// The command line interface for deploying Apicurito to a cluster and waiting for it to become
/// ready. Settings not covered by arguments are read from `APICURITO_TEST_`-prefixed environment
/// variables.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// Path to the kubeconfig file. Also can be passed with the KUBECONFIG environment variable.
    #[clap(long = "kubeconfig")]
    kubeconfig: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Install the Apicurito operator and custom resource into the cluster.
    Install(install::Install),
    /// Uninstall Apicurito from the cluster.
    Uninstall(uninstall::Uninstall),
    /// Wait until the deployed components have the expected number of ready pods.
    Wait(wait::Wait),
    /// Print the current ready-pod count of each component.
    Status(status::Status),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = InstallConfig::from_env()
        .context("Unable to load configuration from the environment")?;
    let manager = match args.kubeconfig {
        Some(path) => InstallManager::new_from_kubeconfig_path(&path, config)
            .await
            .context(format!(
                "Unable to create apicurito client from path '{:?}'",
                path
            ))?,
        None => InstallManager::new(config)
            .await
            .context("Unable to create default apicurito client")?,
    };
    match args.command {
        Command::Install(install) => install.run(manager).await,
        Command::Uninstall(uninstall) => uninstall.run(manager).await,
        Command::Wait(wait) => wait.run(manager).await,
        Command::Status(status) => status.run(manager).await,
    }
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .init();
        }
    }
}
