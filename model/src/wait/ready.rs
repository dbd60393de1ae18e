use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::{Api, Client};

/// The cluster query the readiness waiter polls. One call is an idempotent read of the number of
/// pods matching `label_key=label_value` whose readiness probe is passing. Implementations other
/// than [`ClusterReadyPods`] exist for testing the waiter without a cluster.
#[async_trait]
pub trait ReadyPods {
    async fn count_ready(
        &self,
        label_key: &str,
        label_value: &str,
    ) -> std::result::Result<usize, kube::Error>;
}

/// Counts ready pods in one namespace of a live cluster.
pub struct ClusterReadyPods {
    pod_api: Api<Pod>,
}

impl ClusterReadyPods {
    pub fn new(k8s_client: Client, namespace: &str) -> Self {
        Self {
            pod_api: Api::namespaced(k8s_client, namespace),
        }
    }
}

#[async_trait]
impl ReadyPods for ClusterReadyPods {
    async fn count_ready(
        &self,
        label_key: &str,
        label_value: &str,
    ) -> std::result::Result<usize, kube::Error> {
        let pods = self
            .pod_api
            .list(&ListParams {
                label_selector: Some(format!("{}={}", label_key, label_value)),
                ..Default::default()
            })
            .await?;
        Ok(pods.items.iter().filter(|pod| is_pod_ready(pod)).count())
    }
}

/// Whether the pod's `Ready` condition is `True`.
fn is_pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .any(|condition| condition.type_ == "Ready" && condition.status == "True")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{PodCondition, PodStatus};

    fn pod_with_conditions(conditions: Option<Vec<PodCondition>>) -> Pod {
        Pod {
            status: Some(PodStatus {
                conditions,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn ready_condition_true_is_ready() {
        let pod = pod_with_conditions(Some(vec![PodCondition {
            type_: "Ready".to_string(),
            status: "True".to_string(),
            ..Default::default()
        }]));
        assert!(is_pod_ready(&pod));
    }

    #[test]
    fn ready_condition_false_is_not_ready() {
        let pod = pod_with_conditions(Some(vec![PodCondition {
            type_: "Ready".to_string(),
            status: "False".to_string(),
            ..Default::default()
        }]));
        assert!(!is_pod_ready(&pod));
    }

    #[test]
    fn missing_conditions_are_not_ready() {
        assert!(!is_pod_ready(&pod_with_conditions(None)));
        assert!(!is_pod_ready(&Pod::default()));
    }
}
