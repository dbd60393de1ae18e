use anyhow::{Context, Result};
use apicurito_model::manager::InstallManager;
use clap::Parser;

/// The uninstall subcommand is responsible for removing all Apicurito components from a k8s
/// cluster.
#[derive(Debug, Parser)]
pub(crate) struct Uninstall {}

impl Uninstall {
    pub(crate) async fn run(self, manager: InstallManager) -> Result<()> {
        manager.uninstall().await.context(
            "Unable to uninstall apicurito from the cluster. (Some artifacts may be left behind)",
        )?;

        println!("apicurito components were successfully uninstalled.");

        Ok(())
    }
}
