use anyhow::{Context, Result};
use apicurito_model::constants::LABEL_COMPONENT;
use apicurito_model::manager::InstallManager;
use apicurito_model::wait::{ClusterReadyPods, Component, ReadyPods};
use clap::Parser;

/// The status subcommand prints the current ready-pod count of each Apicurito component.
#[derive(Debug, Parser)]
pub(crate) struct Status {}

impl Status {
    pub(crate) async fn run(self, manager: InstallManager) -> Result<()> {
        let pods = ClusterReadyPods::new(
            manager.k8s_client.clone(),
            &manager.config().namespace,
        );
        for component in Component::ALL {
            let ready = pods
                .count_ready(LABEL_COMPONENT, component.name())
                .await
                .context(format!(
                    "Unable to count ready pods of component '{}'",
                    component
                ))?;
            println!("{}: {} ready pod(s)", component, ready);
        }
        Ok(())
    }
}
