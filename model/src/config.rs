use crate::constants::{CUSTOM_RESOURCE, NAMESPACE};
use serde::Deserialize;
use snafu::{ResultExt, Snafu};
use std::time::Duration;

/// The environment variable prefix understood by [`InstallConfig::from_env`].
pub const ENV_PREFIX: &str = "APICURITO_TEST_";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Unable to read configuration from the environment: {}", source))]
    Env { source: envy::Error },
}

/// The settings for one deployment-verification run. An `InstallConfig` is constructed by the
/// caller and handed to the [`crate::manager::InstallManager`] and the readiness waiter
/// explicitly; nothing in this library reads configuration from a global holder.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallConfig {
    /// The namespace everything is installed into.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// The name of the `Apicurito` custom resource to apply.
    #[serde(default = "default_custom_resource_name")]
    pub custom_resource_name: String,

    /// The pod replica count requested in the custom resource.
    #[serde(default = "default_size")]
    pub size: i32,

    /// Operator image to deploy instead of the release image.
    #[serde(default)]
    pub operator_image: Option<String>,

    /// UI image the operator should deploy instead of its release image.
    #[serde(default)]
    pub ui_image: Option<String>,

    /// Generator image the operator should deploy instead of its release image.
    #[serde(default)]
    pub generator_image: Option<String>,

    /// When set, the operator deployment manifest is fetched from this URL instead of being
    /// constructed in code. The container image in the fetched manifest is overridden with the
    /// configured operator image.
    #[serde(default)]
    pub operator_deployment_url: Option<String>,

    /// Seconds between successive readiness checks of one component.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds allotted to a single component's readiness check.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    /// Seconds allotted to the entire multi-component readiness wait.
    #[serde(default = "default_overall_timeout_secs")]
    pub overall_timeout_secs: u64,
}

impl InstallConfig {
    /// Read the configuration from `APICURITO_TEST_`-prefixed environment variables, e.g.
    /// `APICURITO_TEST_NAMESPACE` or `APICURITO_TEST_OPERATOR_IMAGE`. Unset variables take their
    /// defaults.
    pub fn from_env() -> Result<Self> {
        envy::prefixed(ENV_PREFIX).from_env().context(EnvSnafu)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_secs)
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            custom_resource_name: default_custom_resource_name(),
            size: default_size(),
            operator_image: None,
            ui_image: None,
            generator_image: None,
            operator_deployment_url: None,
            poll_interval_secs: default_poll_interval_secs(),
            task_timeout_secs: default_task_timeout_secs(),
            overall_timeout_secs: default_overall_timeout_secs(),
        }
    }
}

fn default_namespace() -> String {
    NAMESPACE.to_string()
}

fn default_custom_resource_name() -> String {
    CUSTOM_RESOURCE.to_string()
}

fn default_size() -> i32 {
    3
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_task_timeout_secs() -> u64 {
    // 6 minutes
    360
}

fn default_overall_timeout_secs() -> u64 {
    // 20 minutes
    1200
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = InstallConfig::default();
        assert_eq!(config.namespace, "apicurito");
        assert_eq!(config.custom_resource_name, "apicurito");
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.task_timeout(), Duration::from_secs(360));
        assert_eq!(config.overall_timeout(), Duration::from_secs(1200));
        assert!(config.operator_image.is_none());
    }
}
