use crate::constants::{APP_MANAGED_BY, APP_NAME, APP_PART_OF};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::ObjectMeta;
use maplit::btreemap;

/// Defines the namespace an Apicurito installation lives in.
pub fn apicurito_namespace(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(
                btreemap! {
                    APP_NAME => "apicurito",
                    APP_MANAGED_BY => "apicurito-test-system",
                    APP_PART_OF => "apicurito",
                }
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ),
            ..Default::default()
        },
        ..Default::default()
    }
}
