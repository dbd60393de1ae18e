pub use error::{Error, Result};
pub use manager::InstallManager;
use serde::Serialize;
use std::collections::HashMap;

mod delete;
mod error;
mod install;
mod manager;

/// `ImageConfig` represents an image uri, and the name of a pull secret (if needed).
pub enum ImageConfig {
    WithCreds { image: String, secret: String },
    Image(String),
}

#[derive(Serialize)]
pub(crate) struct DockerConfigJson {
    auths: HashMap<String, DockerConfigAuth>,
}

#[derive(Serialize)]
struct DockerConfigAuth {
    auth: String,
}

impl DockerConfigJson {
    pub(crate) fn new(username: &str, password: &str, registry: &str) -> DockerConfigJson {
        let mut auths = HashMap::new();
        let auth = base64::encode(format!("{}:{}", username, password));
        auths.insert(registry.to_string(), DockerConfigAuth { auth });
        DockerConfigJson { auths }
    }
}
