use anyhow::{Context, Result};
use apicurito_model::manager::{ImageConfig, InstallManager};
use apicurito_model::wait::Component;
use clap::Parser;

const DEFAULT_OPERATOR_IMAGE: &str = "quay.io/apicurio/apicurito-operator:latest";

/// The install subcommand is responsible for putting all of the necessary components for an
/// Apicurito installation in a k8s cluster, then waiting for the deployment to become ready.
#[derive(Debug, Parser)]
pub(crate) struct Install {
    /// Name of an existing operator image pull secret
    #[clap(long = "image-secret", short = 's', conflicts_with = "pull-username")]
    secret: Option<String>,

    /// Operator image pull username
    #[clap(long = "pull-username", short = 'u', requires = "pull-password")]
    pull_username: Option<String>,

    /// Operator image pull password
    #[clap(long = "pull-password", short = 'p', requires = "pull-username")]
    pull_password: Option<String>,

    /// Operator image uri
    #[clap(long = "operator-image")]
    operator_image: Option<String>,

    /// Do not wait for the deployed components to become ready.
    #[clap(long = "no-wait")]
    no_wait: bool,
}

impl Install {
    pub(crate) async fn run(self, manager: InstallManager) -> Result<()> {
        let image = self
            .operator_image
            .or_else(|| manager.config().operator_image.clone())
            .unwrap_or_else(|| DEFAULT_OPERATOR_IMAGE.to_string());

        let operator_image = match (self.secret, self.pull_username, self.pull_password) {
            (Some(secret), _, _) => ImageConfig::WithCreds { image, secret },
            (None, Some(username), Some(password)) => {
                let registry = image
                    .split('/')
                    .next()
                    .context(format!("Could not extract registry url from '{}'", image))?;
                let secret = manager
                    .create_image_pull_secret(&username, &password, registry)
                    .await
                    .context("Unable to create the image pull secret")?;
                ImageConfig::WithCreds {
                    image,
                    secret: secret
                        .metadata
                        .name
                        .context("The created pull secret has no name")?,
                }
            }
            _ => ImageConfig::Image(image),
        };

        manager.install(operator_image).await.context(
            "Unable to install apicurito to the cluster. (Some artifacts may be left behind)",
        )?;
        println!("apicurito components were successfully installed.");

        if !self.no_wait {
            let expected_pods = manager.config().size as usize;
            manager
                .wait_for_ready([Component::Service], expected_pods)
                .await
                .context("The apicurito installation did not become ready")?;
            println!("apicurito is ready.");
        }

        Ok(())
    }
}
