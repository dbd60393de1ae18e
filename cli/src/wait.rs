use anyhow::{Context, Result};
use apicurito_model::manager::InstallManager;
use apicurito_model::wait::{wait_for_ready, ClusterReadyPods, Component, WaitRequest};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

/// The wait subcommand blocks until the given components have the expected number of ready pods,
/// exiting non-zero when they do not get there within budget. Deployment pipelines use the exit
/// status to decide whether dependent tests may run.
#[derive(Debug, Parser)]
pub(crate) struct Wait {
    /// The label key selecting a component's pods.
    #[clap(long = "label-key", default_value = "component")]
    label_key: String,

    /// The number of pods that must simultaneously be ready, per component.
    #[clap(long = "expected-pods", short = 'n', default_value = "1")]
    expected_pods: usize,

    /// A component to wait for [service|ui]. Repeat for multiple components.
    #[clap(long = "component", short = 'c', required = true)]
    components: Vec<Component>,

    /// Seconds between successive readiness checks. Defaults to the configured value.
    #[clap(long = "poll-interval")]
    poll_interval: Option<u64>,

    /// Seconds allotted to a single component's check. Defaults to the configured value.
    #[clap(long = "task-timeout")]
    task_timeout: Option<u64>,

    /// Seconds allotted to the whole wait. Defaults to the configured value.
    #[clap(long = "overall-timeout")]
    overall_timeout: Option<u64>,
}

impl Wait {
    pub(crate) async fn run(self, manager: InstallManager) -> Result<()> {
        let config = manager.config();
        let request = WaitRequest {
            label_key: self.label_key,
            expected_pods: self.expected_pods,
            components: self.components.into_iter().collect(),
            poll_interval: self
                .poll_interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.poll_interval()),
            task_timeout: self
                .task_timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.task_timeout()),
            overall_timeout: self
                .overall_timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.overall_timeout()),
        };
        let pods = Arc::new(ClusterReadyPods::new(
            manager.k8s_client.clone(),
            &config.namespace,
        ));

        wait_for_ready(pods, &request)
            .await
            .context("The apicurito installation did not become ready")?;

        println!("apicurito is ready.");

        Ok(())
    }
}
