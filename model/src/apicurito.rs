use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The Apicurito custom resource. The `CustomResource` derive also produces a struct named
/// `Apicurito` which represents an apicurito object in the k8s API. The operator watches these and
/// reconciles the deployed service and UI pods to match `size`.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    derive = "Default",
    derive = "PartialEq",
    group = "apicur.io",
    kind = "Apicurito",
    namespaced,
    plural = "apicuritos",
    singular = "apicurito",
    status = "ApicuritoStatus",
    version = "v1alpha1"
)]
#[serde(rename_all = "camelCase")]
pub struct ApicuritoSpec {
    /// The number of pod replicas the operator should keep running for each deployed component.
    pub size: i32,
    /// The UI image to deploy. When `None` the operator falls back to its release image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// The status field of the Apicurito CRD. The operator records the image it reconciled so that
/// image changes can be detected on the next pass.
#[derive(Serialize, Deserialize, Debug, Default, Eq, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApicuritoStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CRD_NAME;
    use kube::CustomResourceExt;

    #[test]
    fn crd_name_matches_constant() {
        assert_eq!(Apicurito::crd().metadata.name.as_deref(), Some(CRD_NAME));
    }
}
