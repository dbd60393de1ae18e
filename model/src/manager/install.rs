use super::{error, Result};
use crate::apicurito::{Apicurito, ApicuritoSpec};
use crate::manager::InstallManager;
use crate::system::{
    apicurito_namespace, operator_cluster_role, operator_cluster_role_binding, operator_deployment,
    operator_role, operator_role_binding, operator_service, operator_service_account,
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{LocalObjectReference, Namespace, ServiceAccount};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::ObjectMeta;
use kube::CustomResourceExt;
use log::info;
use snafu::{OptionExt, ResultExt};

impl InstallManager {
    /// Create the installation namespace
    pub(super) async fn create_namespace(&self) -> Result<()> {
        // Add the namespace to the cluster.
        let ns = apicurito_namespace(&self.config().namespace);
        let api = self.api::<Namespace>();

        self.create_or_update(&api, &ns, "namespace").await?;

        // Give the object enough time to settle.
        let mut sleep_count = 0;
        while api.get(&self.config().namespace).await.is_err() && sleep_count < 20 {
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
            sleep_count += 1;
        }

        api.get(&self.config().namespace)
            .await
            .context(error::CreateSnafu { what: "namespace" })?;

        Ok(())
    }

    /// Create the `Apicurito` crd.
    pub(super) async fn create_crd(&self) -> Result<()> {
        let crd = Apicurito::crd();
        self.create_or_update(&self.api::<CustomResourceDefinition>(), &crd, "Apicurito CRD")
            .await
    }

    pub(super) async fn create_roles(&self) -> Result<()> {
        // If the role already exists, update it with the new one using Patch. If not create a new
        // role.
        let role = operator_role(&self.config().namespace);
        self.create_or_update(&self.namespaced_api(), &role, "Operator Role")
            .await?;

        let role_binding = operator_role_binding(&self.config().namespace);
        self.create_or_update(&self.namespaced_api(), &role_binding, "Operator Role Binding")
            .await?;

        // If the cluster role binding already exists, update it with the new one using Patch. If
        // not create a new cluster role binding.
        let cluster_role = operator_cluster_role();
        self.create_or_update(&self.api(), &cluster_role, "Operator Cluster Role")
            .await?;

        let cluster_role_binding = operator_cluster_role_binding(&self.config().namespace);
        self.create_or_update(
            &self.api(),
            &cluster_role_binding,
            "Operator Cluster Role Binding",
        )
        .await?;

        Ok(())
    }

    pub(super) async fn create_operator_service(&self) -> Result<()> {
        let service = operator_service(&self.config().namespace);
        self.create_or_update(&self.namespaced_api(), &service, "Operator Service")
            .await
    }

    pub(super) async fn create_service_accounts(&self, pull_secret: Option<&str>) -> Result<()> {
        // If the service account already exists, update it with the new one using Patch. If not
        // create a new service account.
        let service_account =
            operator_service_account(&self.config().namespace, pull_secret);
        self.create_or_update(
            &self.namespaced_api(),
            &service_account,
            "Operator Service Account",
        )
        .await?;

        // The deployed pods run under the default account; it needs the pull credentials too.
        if let Some(pull_secret) = pull_secret {
            self.add_pull_secret_to_service_account("default", pull_secret)
                .await?;
        }

        Ok(())
    }

    /// Attach `pull_secret` to the service account named `name`, creating the account if the
    /// namespace has not settled it into existence yet.
    pub(super) async fn add_pull_secret_to_service_account(
        &self,
        name: &str,
        pull_secret: &str,
    ) -> Result<()> {
        let service_account = ServiceAccount {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(self.config().namespace.clone()),
                ..Default::default()
            },
            image_pull_secrets: Some(vec![LocalObjectReference {
                name: Some(pull_secret.to_string()),
            }]),
            ..Default::default()
        };
        self.create_or_update(
            &self.namespaced_api(),
            &service_account,
            "Service Account pull secret",
        )
        .await
    }

    pub(super) async fn create_operator_deployment(
        &self,
        image: String,
        secret: Option<String>,
    ) -> Result<()> {
        let deployment = match &self.config().operator_deployment_url {
            Some(url) => {
                info!("Fetching operator deployment from {}", url);
                let manifest = fetch_manifest(url).await?;
                parse_operator_deployment(&manifest, url, Some(&image))?
            }
            None => operator_deployment(
                &self.config().namespace,
                image,
                secret,
                self.config().ui_image.as_deref(),
                self.config().generator_image.as_deref(),
            ),
        };

        // If the operator deployment already exists, update it with the new one using Patch. If
        // not create a new operator deployment.
        self.create_or_update(&self.namespaced_api(), &deployment, "operator deployment")
            .await
    }

    pub(super) async fn create_custom_resource(&self) -> Result<()> {
        let apicurito = Apicurito::new(
            &self.config().custom_resource_name,
            ApicuritoSpec {
                size: self.config().size,
                image: self.config().ui_image.clone(),
            },
        );
        self.create_or_update(
            &self.namespaced_api(),
            &apicurito,
            "Apicurito custom resource",
        )
        .await
    }
}

async fn fetch_manifest(url: &str) -> Result<String> {
    reqwest::get(url)
        .await
        .context(error::ManifestFetchSnafu { url })?
        .error_for_status()
        .context(error::ManifestFetchSnafu { url })?
        .text()
        .await
        .context(error::ManifestFetchSnafu { url })
}

/// Deserialize a fetched operator deployment manifest, overriding the container image when a
/// custom image is configured.
fn parse_operator_deployment(
    manifest: &str,
    url: &str,
    image: Option<&str>,
) -> Result<Deployment> {
    let mut deployment: Deployment =
        serde_yaml::from_str(manifest).context(error::ManifestParseSnafu { url })?;
    if let Some(image) = image {
        // The manifest's pod spec carries a single container.
        let container = deployment
            .spec
            .as_mut()
            .and_then(|spec| spec.template.spec.as_mut())
            .and_then(|pod_spec| pod_spec.containers.first_mut())
            .context(error::MissingContainerSnafu { url })?;
        container.image = Some(image.to_string());
    }
    Ok(deployment)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPERATOR_MANIFEST: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: apicurito-operator
spec:
  replicas: 1
  selector:
    matchLabels:
      component: apicurito-operator
  template:
    metadata:
      labels:
        component: apicurito-operator
    spec:
      containers:
        - name: apicurito-operator
          image: quay.io/apicurio/apicurito-operator:released
"#;

    #[test]
    fn fetched_deployment_image_is_overridden() {
        let deployment = parse_operator_deployment(
            OPERATOR_MANIFEST,
            "http://example.com/operator.yaml",
            Some("operator:custom"),
        )
        .unwrap();
        let containers = deployment.spec.unwrap().template.spec.unwrap().containers;
        assert_eq!(containers[0].image.as_deref(), Some("operator:custom"));
    }

    #[test]
    fn fetched_deployment_without_override_keeps_its_image() {
        let deployment = parse_operator_deployment(
            OPERATOR_MANIFEST,
            "http://example.com/operator.yaml",
            None,
        )
        .unwrap();
        let containers = deployment.spec.unwrap().template.spec.unwrap().containers;
        assert_eq!(
            containers[0].image.as_deref(),
            Some("quay.io/apicurio/apicurito-operator:released")
        );
    }
}
