use super::{error, DockerConfigJson, ImageConfig, Result};
use crate::config::InstallConfig;
use crate::constants::PULL_SECRET;
use crate::wait::{wait_for_ready, ClusterReadyPods, Component, WaitRequest};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams, PostParams, ResourceExt};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource as KubeResource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

/// # Install Manager
///
/// The install manager provides the operations one deployment-verification run needs against a
/// cluster: installing the Apicurito operator and its custom resource, waiting for the deployed
/// components to become ready, and removing everything again.
///
/// All settings come from the [`InstallConfig`] handed in at construction; the manager holds no
/// global state and two managers with different configurations can coexist in one process.
pub struct InstallManager {
    pub k8s_client: Client,
    config: InstallConfig,
}

impl InstallManager {
    /// Retry attempts for creating or updating an object.
    const MAX_RETRIES: i32 = 3;
    /// Delay between object creation/update retries.
    const BACKOFF_MS: u64 = 500;

    /// Create an `InstallManager` from the path to a kubeconfig file.
    pub async fn new_from_kubeconfig_path(
        kubeconfig_path: &Path,
        config: InstallConfig,
    ) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(kubeconfig_path).context(error::ConfigReadSnafu)?;
        let kube_config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context(error::ClientCreateKubeconfigSnafu)?;
        Ok(InstallManager {
            k8s_client: kube_config.try_into().context(error::ClientCreateSnafu)?,
            config,
        })
    }

    /// Create an `InstallManager` using the default `kube::Client`.
    pub async fn new(config: InstallConfig) -> Result<Self> {
        Ok(InstallManager {
            k8s_client: Client::try_default()
                .await
                .context(error::ClientCreateSnafu)?,
            config,
        })
    }

    pub fn config(&self) -> &InstallConfig {
        &self.config
    }

    /// Install the Apicurito operator and its custom resource into the cluster. Calling this on a
    /// cluster that already carries an installation updates it in place.
    pub async fn install(&self, operator_config: ImageConfig) -> Result<()> {
        self.create_namespace().await?;
        self.create_crd().await?;
        self.create_roles().await?;
        self.create_operator_service().await?;

        let (image, secret) = match operator_config {
            ImageConfig::WithCreds { secret, image } => (image, Some(secret)),
            ImageConfig::Image(image) => (image, None),
        };
        self.create_service_accounts(secret.as_deref()).await?;
        self.create_operator_deployment(image, secret).await?;
        self.create_custom_resource().await?;

        Ok(())
    }

    /// Wait until each of `components` has exactly `expected_pods` ready pods, with the intervals
    /// and budgets taken from the configuration.
    pub async fn wait_for_ready(
        &self,
        components: impl IntoIterator<Item = Component>,
        expected_pods: usize,
    ) -> Result<()> {
        let pods = Arc::new(ClusterReadyPods::new(
            self.k8s_client.clone(),
            &self.config.namespace,
        ));
        let request =
            WaitRequest::new(components.into_iter().collect(), expected_pods, &self.config);
        wait_for_ready(pods, &request).await.context(error::WaitSnafu)
    }

    /// Uninstall Apicurito from the cluster and wait until the namespace is gone.
    pub async fn uninstall(&self) -> Result<()> {
        self.delete_custom_resources().await?;
        self.delete_crd().await?;
        self.delete_cluster_roles().await?;
        self.delete_namespace().await?;
        self.wait_for_namespace_deletion().await
    }

    /// Create a secret for image pulls using `DockerConfigJson`
    pub async fn create_image_pull_secret(
        &self,
        username: &str,
        password: &str,
        registry: &str,
    ) -> Result<Secret> {
        // The secret lives in the installation namespace, which may not exist yet.
        self.create_namespace().await?;

        // Create docker config json for the image pull secret.
        let sec_str =
            serde_json::to_string_pretty(&DockerConfigJson::new(username, password, registry))
                .context(error::JsonSerializeSnafu)?;
        let mut secret_tree = BTreeMap::new();
        secret_tree.insert(".dockerconfigjson".to_string(), sec_str);

        let object_meta = kube::api::ObjectMeta {
            name: Some(PULL_SECRET.to_string()),
            namespace: Some(self.config.namespace.clone()),
            ..Default::default()
        };

        // Create the secret we are going to add.
        let secret = Secret {
            data: None,
            immutable: None,
            metadata: object_meta,
            string_data: Some(secret_tree),
            type_: Some("kubernetes.io/dockerconfigjson".to_string()),
        };

        self.create_or_update(&self.namespaced_api(), &secret, "pull secret")
            .await?;
        Ok(secret)
    }

    /// Create or update an existing k8s object
    pub(super) async fn create_or_update<T>(&self, api: &Api<T>, data: &T, what: &str) -> Result<()>
    where
        T: KubeResource + Clone + DeserializeOwned + Serialize + Debug,
    {
        let mut error = None;

        for _ in 0..Self::MAX_RETRIES {
            match self.create_or_update_internal(api, data, what).await {
                Ok(()) => return Ok(()),
                Err(e) => error = Some(e),
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(Self::BACKOFF_MS)).await;
        }
        match error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    async fn create_or_update_internal<T>(&self, api: &Api<T>, data: &T, what: &str) -> Result<()>
    where
        T: KubeResource + Clone + DeserializeOwned + Serialize + Debug,
    {
        // If the data already exists, update it with the new one using a `Patch`. If not create a
        // new one.
        match api.get(&data.name_any()).await {
            Ok(existing) => {
                api.patch(
                    &existing.name_any(),
                    &PatchParams::default(),
                    &Patch::Merge(data),
                )
                .await
            }
            Err(_err) => api.create(&PostParams::default(), data).await,
        }
        .context(error::CreateSnafu { what })?;

        Ok(())
    }

    /// Creates a non namespaced api of type `T`
    pub(super) fn api<T>(&self) -> Api<T>
    where
        T: KubeResource,
        <T as KubeResource>::DynamicType: Default,
    {
        Api::<T>::all(self.k8s_client.clone())
    }

    /// Creates an api of type `T` scoped to the configured namespace
    pub(super) fn namespaced_api<T>(&self) -> Api<T>
    where
        T: KubeResource<Scope = NamespaceResourceScope>,
        <T as KubeResource>::DynamicType: Default,
    {
        Api::<T>::namespaced(self.k8s_client.clone(), &self.config.namespace)
    }
}
