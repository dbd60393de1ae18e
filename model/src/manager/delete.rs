use super::{error, Result};
use crate::apicurito::Apicurito;
use crate::constants::{CRD_NAME, OPERATOR_CLUSTER_ROLE, OPERATOR_CLUSTER_ROLE_BINDING};
use crate::manager::InstallManager;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{DeleteParams, ListParams};
use log::info;
use snafu::{OptionExt, ResultExt};
use std::time::Duration;

/// How long `uninstall` waits for the namespace to disappear after its deletion was accepted.
const NAMESPACE_DELETION_TIMEOUT: Duration = Duration::from_secs(300);
const NAMESPACE_DELETION_POLL: Duration = Duration::from_secs(2);

impl InstallManager {
    /// Delete every `Apicurito` custom resource in the installation namespace. The operator tears
    /// the deployed pods down in response.
    pub(super) async fn delete_custom_resources(&self) -> Result<()> {
        let api = self.namespaced_api::<Apicurito>();
        allow_not_found(
            api.delete_collection(&DeleteParams::default(), &ListParams::default())
                .await,
            "delete Apicurito custom resources",
        )?;
        Ok(())
    }

    pub(super) async fn delete_crd(&self) -> Result<()> {
        let api = self.api::<CustomResourceDefinition>();
        allow_not_found(
            api.delete(CRD_NAME, &DeleteParams::default()).await,
            "delete Apicurito CRD",
        )?;
        Ok(())
    }

    /// Delete the cluster-scoped role and binding; everything else is removed with the namespace.
    pub(super) async fn delete_cluster_roles(&self) -> Result<()> {
        let roles = self.api::<ClusterRole>();
        allow_not_found(
            roles
                .delete(OPERATOR_CLUSTER_ROLE, &DeleteParams::default())
                .await,
            "delete operator cluster role",
        )?;

        let bindings = self.api::<ClusterRoleBinding>();
        allow_not_found(
            bindings
                .delete(OPERATOR_CLUSTER_ROLE_BINDING, &DeleteParams::default())
                .await,
            "delete operator cluster role binding",
        )?;
        Ok(())
    }

    pub(super) async fn delete_namespace(&self) -> Result<()> {
        let api = self.api::<Namespace>();
        allow_not_found(
            api.delete(&self.config().namespace, &DeleteParams::default())
                .await,
            "delete namespace",
        )?;
        Ok(())
    }

    /// Poll until the namespace is gone. Namespace removal finishes asynchronously once every
    /// contained object's finalizer has run, so deletion acceptance alone does not mean the
    /// cluster is clean.
    pub(super) async fn wait_for_namespace_deletion(&self) -> Result<()> {
        let api = self.api::<Namespace>();
        let name = self.config().namespace.clone();
        tokio::time::timeout(NAMESPACE_DELETION_TIMEOUT, async {
            loop {
                if let Err(kube::Error::Api(response)) = api.get(&name).await {
                    if response.code == 404 {
                        info!("Namespace '{}' is gone", name);
                        return;
                    }
                }
                tokio::time::sleep(NAMESPACE_DELETION_POLL).await;
            }
        })
        .await
        .ok()
        .context(error::NamespaceDeletionSnafu {
            namespace: self.config().namespace.clone(),
        })
    }
}

/// Deleting something that is already gone is not a failure of `uninstall`.
fn allow_not_found<T>(result: kube::Result<T>, action: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(kube::Error::Api(response)) if response.code == 404 => Ok(None),
        Err(source) => Err(source).context(error::KubeSnafu { action }),
    }
}
