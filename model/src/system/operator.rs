use crate::constants::{
    APP_COMPONENT, APP_MANAGED_BY, APP_PART_OF, ENV_RELATED_IMAGE_GENERATOR, ENV_RELATED_IMAGE_UI,
    LABEL_COMPONENT, OPERATOR, OPERATOR_CLUSTER_ROLE, OPERATOR_CLUSTER_ROLE_BINDING, OPERATOR_ROLE,
    OPERATOR_ROLE_BINDING, OPERATOR_SERVICE, OPERATOR_SERVICE_ACCOUNT,
};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, LocalObjectReference, ObjectFieldSelector, PodSpec,
    PodTemplateSpec, Service, ServiceAccount, ServicePort, ServiceSpec,
};
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use maplit::btreemap;

const METRICS_PORT: i32 = 8383;

/// Defines the service account the operator runs under. When `image_pull_secret` is given, pods
/// using the account can pull from the registry the secret authenticates against.
pub fn operator_service_account(
    namespace: &str,
    image_pull_secret: Option<&str>,
) -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(OPERATOR_SERVICE_ACCOUNT.to_string()),
            namespace: Some(namespace.to_string()),
            annotations: Some(btreemap! {
                "kubernetes.io/service-account.name".to_string() => OPERATOR_SERVICE_ACCOUNT.to_string()
            }),
            ..Default::default()
        },
        image_pull_secrets: image_pull_secret.map(|secret| {
            vec![LocalObjectReference {
                name: Some(secret.to_string()),
            }]
        }),
        ..Default::default()
    }
}

/// Defines the namespaced role the operator needs to reconcile an Apicurito installation.
pub fn operator_role(namespace: &str) -> Role {
    Role {
        metadata: ObjectMeta {
            name: Some(OPERATOR_ROLE.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        rules: Some(vec![
            PolicyRule {
                api_groups: Some(vec!["apicur.io".to_string()]),
                resources: Some(vec![
                    "apicuritos".to_string(),
                    "apicuritos/status".to_string(),
                    "apicuritos/finalizers".to_string(),
                ]),
                verbs: vec![
                    "create", "delete", "get", "list", "patch", "update", "watch",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec!["".to_string()]),
                resources: Some(vec![
                    "pods".to_string(),
                    "services".to_string(),
                    "configmaps".to_string(),
                    "secrets".to_string(),
                    "serviceaccounts".to_string(),
                ]),
                verbs: vec![
                    "create", "delete", "get", "list", "patch", "update", "watch",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec!["apps".to_string()]),
                resources: Some(vec!["deployments".to_string(), "replicasets".to_string()]),
                verbs: vec![
                    "create", "delete", "get", "list", "patch", "update", "watch",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec!["route.openshift.io".to_string()]),
                resources: Some(vec!["routes".to_string()]),
                verbs: vec![
                    "create", "delete", "get", "list", "patch", "update", "watch",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                ..Default::default()
            },
        ]),
    }
}

/// Defines the role binding attaching the operator role to the operator service account.
pub fn operator_role_binding(namespace: &str) -> RoleBinding {
    RoleBinding {
        metadata: ObjectMeta {
            name: Some(OPERATOR_ROLE_BINDING.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: OPERATOR_ROLE.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: OPERATOR_SERVICE_ACCOUNT.to_string(),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }]),
    }
}

/// Defines the cluster role granting the operator read access to custom resource definitions.
pub fn operator_cluster_role() -> ClusterRole {
    ClusterRole {
        metadata: ObjectMeta {
            name: Some(OPERATOR_CLUSTER_ROLE.to_string()),
            ..Default::default()
        },
        rules: Some(vec![PolicyRule {
            api_groups: Some(vec!["apiextensions.k8s.io".to_string()]),
            resources: Some(vec!["customresourcedefinitions".to_string()]),
            verbs: vec!["get", "list", "watch"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

/// Defines the cluster role binding attaching the operator cluster role to the operator service
/// account.
pub fn operator_cluster_role_binding(namespace: &str) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: ObjectMeta {
            name: Some(OPERATOR_CLUSTER_ROLE_BINDING.to_string()),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: OPERATOR_CLUSTER_ROLE.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: OPERATOR_SERVICE_ACCOUNT.to_string(),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }]),
    }
}

/// Defines the metrics service in front of the operator pod.
pub fn operator_service(namespace: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(OPERATOR_SERVICE.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(btreemap! {
                LABEL_COMPONENT.to_string() => OPERATOR.to_string(),
            }),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                name: Some("metrics".to_string()),
                port: METRICS_PORT,
                target_port: Some(IntOrString::Int(METRICS_PORT)),
                ..Default::default()
            }]),
            selector: Some(btreemap! {
                LABEL_COMPONENT.to_string() => OPERATOR.to_string(),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Defines the operator deployment. `ui_image` and `generator_image` override the release images
/// the operator would otherwise deploy; they are passed through the `RELATED_IMAGE_*` environment
/// variables the operator understands.
pub fn operator_deployment(
    namespace: &str,
    operator_image: String,
    image_pull_secret: Option<String>,
    ui_image: Option<&str>,
    generator_image: Option<&str>,
) -> Deployment {
    let image_pull_secrets =
        image_pull_secret.map(|secret| vec![LocalObjectReference { name: Some(secret) }]);

    let mut env = vec![
        EnvVar {
            name: "WATCH_NAMESPACE".to_string(),
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: "metadata.namespace".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
        EnvVar {
            name: "POD_NAME".to_string(),
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: "metadata.name".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
        EnvVar {
            name: "OPERATOR_NAME".to_string(),
            value: Some(OPERATOR.to_string()),
            ..Default::default()
        },
    ];
    if let Some(ui_image) = ui_image {
        env.push(EnvVar {
            name: ENV_RELATED_IMAGE_UI.to_string(),
            value: Some(ui_image.to_string()),
            ..Default::default()
        });
    }
    if let Some(generator_image) = generator_image {
        env.push(EnvVar {
            name: ENV_RELATED_IMAGE_GENERATOR.to_string(),
            value: Some(generator_image.to_string()),
            ..Default::default()
        });
    }

    Deployment {
        metadata: ObjectMeta {
            labels: Some(
                btreemap! {
                    APP_COMPONENT => "operator",
                    APP_MANAGED_BY => "apicurito-test-system",
                    APP_PART_OF => "apicurito",
                    LABEL_COMPONENT => OPERATOR,
                }
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ),
            name: Some(OPERATOR.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(btreemap! {
                    LABEL_COMPONENT.to_string() => OPERATOR.to_string(),
                }),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(btreemap! {
                        LABEL_COMPONENT.to_string() => OPERATOR.to_string(),
                    }),
                    namespace: Some(namespace.to_string()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        image: Some(operator_image),
                        name: OPERATOR.to_string(),
                        env: Some(env),
                        ..Default::default()
                    }],
                    image_pull_secrets,
                    service_account_name: Some(OPERATOR_SERVICE_ACCOUNT.to_string()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_selector_matches_pod_labels() {
        let deployment = operator_deployment("apicurito", "operator:latest".to_string(), None, None, None);
        let spec = deployment.spec.unwrap();
        let selector = spec.selector.match_labels.unwrap();
        let pod_labels = spec.template.metadata.unwrap().labels.unwrap();
        for (key, value) in selector {
            assert_eq!(pod_labels.get(&key), Some(&value));
        }
    }

    #[test]
    fn deployment_carries_pull_secret_and_image_overrides() {
        let deployment = operator_deployment(
            "apicurito",
            "operator:custom".to_string(),
            Some("apicurito-pull-secret".to_string()),
            Some("ui:custom"),
            Some("generator:custom"),
        );
        let pod_spec = deployment.spec.unwrap().template.spec.unwrap();
        let secrets = pod_spec.image_pull_secrets.unwrap();
        assert_eq!(secrets[0].name.as_deref(), Some("apicurito-pull-secret"));

        let env = pod_spec.containers[0].env.clone().unwrap();
        let ui = env.iter().find(|var| var.name == ENV_RELATED_IMAGE_UI).unwrap();
        assert_eq!(ui.value.as_deref(), Some("ui:custom"));
        let generator = env
            .iter()
            .find(|var| var.name == ENV_RELATED_IMAGE_GENERATOR)
            .unwrap();
        assert_eq!(generator.value.as_deref(), Some("generator:custom"));
    }
}
