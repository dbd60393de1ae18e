use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for `InstallManager`
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum Error {
    #[snafu(display("Unable to create client: {}", source))]
    ClientCreate { source: kube::Error },

    #[snafu(display("Unable to create client: {}", source))]
    ClientCreateKubeconfig {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to read kubeconfig: {}", source))]
    ConfigRead {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Error creating {}: {}", what, source))]
    Create { what: String, source: kube::Error },

    #[snafu(display("Could not serialize object: {}", source))]
    JsonSerialize { source: serde_json::Error },

    #[snafu(display("Unable to {}: {}", action, source))]
    Kube { action: String, source: kube::Error },

    #[snafu(display("Unable to fetch manifest from '{}': {}", url, source))]
    ManifestFetch { url: String, source: reqwest::Error },

    #[snafu(display("Unable to parse manifest from '{}': {}", url, source))]
    ManifestParse {
        url: String,
        source: serde_yaml::Error,
    },

    #[snafu(display("The manifest from '{}' contains no container to set the image on", url))]
    MissingContainer { url: String },

    #[snafu(display("The namespace '{}' was not removed in time", namespace))]
    NamespaceDeletion { namespace: String },

    #[snafu(display("Apicurito failed to become ready: {}", source))]
    Wait { source: crate::wait::Error },
}
