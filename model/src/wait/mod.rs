/*!

Waits for the deployed components of an Apicurito installation to become ready.

One readiness check — [`wait_for_ready`] — fans out a polling task per component. Each task
re-queries the cluster on a fixed interval until the component has exactly the expected number of
ready pods or its per-task budget runs out. The tasks are joined under an overall budget; when that
expires the remaining tasks are cancelled and the call fails promptly. Success is only reported
after every task's success has been observed.

The cluster read is behind the [`ReadyPods`] trait so the waiter can be exercised without a
cluster; [`ClusterReadyPods`] is the implementation used against a live namespace.

!*/

mod error;
mod ready;

pub use error::{Error, Result};
pub use ready::{ClusterReadyPods, ReadyPods};

use crate::config::InstallConfig;
use crate::constants::{LABEL_COMPONENT, SERVICE_COMPONENT, UI_COMPONENT};
use futures::future::join_all;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};
use snafu::{ensure, ResultExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A deployable unit of an Apicurito installation, identified on its pods by the value of the
/// component selection label.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Service,
    Ui,
}

derive_display_from_serialize!(Component);
derive_fromstr_from_deserialize!(Component);

impl Component {
    pub const ALL: [Component; 2] = [Component::Service, Component::Ui];

    /// The value of the component selection label on this component's pods.
    pub fn name(&self) -> &'static str {
        match self {
            Component::Service => SERVICE_COMPONENT,
            Component::Ui => UI_COMPONENT,
        }
    }
}

/// One readiness check. Components are a set; asking for the same component twice is the same as
/// asking once.
#[derive(Debug, Clone)]
pub struct WaitRequest {
    /// The label key selecting a component's pods, `component.name()` being the value.
    pub label_key: String,
    /// The number of pods that must simultaneously be ready, per component.
    pub expected_pods: usize,
    pub components: BTreeSet<Component>,
    /// Delay between successive readiness checks of one component.
    pub poll_interval: Duration,
    /// Budget for a single component's readiness check.
    pub task_timeout: Duration,
    /// Budget for the whole call.
    pub overall_timeout: Duration,
}

impl WaitRequest {
    pub fn new(
        components: BTreeSet<Component>,
        expected_pods: usize,
        config: &InstallConfig,
    ) -> Self {
        Self {
            label_key: LABEL_COMPONENT.to_string(),
            expected_pods,
            components,
            poll_interval: config.poll_interval(),
            task_timeout: config.task_timeout(),
            overall_timeout: config.overall_timeout(),
        }
    }
}

/// Wait until every component in `request` has exactly `request.expected_pods` ready pods.
///
/// Each component is polled by its own task so a slow component cannot delay the checks of the
/// others. The call returns an error naming the components that missed their per-task budget, or
/// [`Error::OverallTimeout`] when the whole call ran out of time, in which case any task still
/// polling is cancelled before the call returns.
pub async fn wait_for_ready<P>(pods: Arc<P>, request: &WaitRequest) -> Result<()>
where
    P: ReadyPods + Send + Sync + 'static,
{
    ensure!(!request.components.is_empty(), error::EmptyComponentSetSnafu);
    ensure!(!request.label_key.is_empty(), error::EmptyLabelKeySnafu);
    ensure!(request.expected_pods > 0, error::ZeroExpectedPodsSnafu);

    info!(
        "Waiting for {} ready pod(s) of component(s) [{}]",
        request.expected_pods,
        request
            .components
            .iter()
            .map(|component| component.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut handles: Vec<JoinHandle<Result<()>>> = Vec::with_capacity(request.components.len());
    for component in request.components.iter().copied() {
        let pods = Arc::clone(&pods);
        let label_key = request.label_key.clone();
        let expected_pods = request.expected_pods;
        let poll_interval = request.poll_interval;
        let task_timeout = request.task_timeout;
        handles.push(tokio::spawn(async move {
            await_component(
                pods.as_ref(),
                &label_key,
                component,
                expected_pods,
                poll_interval,
                task_timeout,
            )
            .await
        }));
    }

    let abort_handles: Vec<_> = handles.iter().map(|handle| handle.abort_handle()).collect();
    let outcomes = match tokio::time::timeout(request.overall_timeout, join_all(handles)).await {
        Ok(outcomes) => outcomes,
        Err(_) => {
            // No polling task may outlive the call.
            for abort_handle in abort_handles {
                abort_handle.abort();
            }
            return error::OverallTimeoutSnafu {
                timeout: request.overall_timeout,
            }
            .fail();
        }
    };

    let mut late = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(Error::TaskTimeout { mut components })) => late.append(&mut components),
            Ok(Err(error)) => return Err(error),
            Err(_join_error) => return error::InterruptedSnafu.fail(),
        }
    }
    if !late.is_empty() {
        late.sort_unstable();
        return error::TaskTimeoutSnafu { components: late }.fail();
    }
    Ok(())
}

/// Poll one component until it has exactly `expected_pods` ready pods or `task_timeout` elapses.
/// The first check happens before any sleep so an already-satisfied condition returns promptly.
async fn await_component<P>(
    pods: &P,
    label_key: &str,
    component: Component,
    expected_pods: usize,
    poll_interval: Duration,
    task_timeout: Duration,
) -> Result<()>
where
    P: ReadyPods,
{
    let outcome = tokio::time::timeout(task_timeout, async {
        loop {
            let ready = pods
                .count_ready(label_key, component.name())
                .await
                .context(error::QuerySnafu { component })?;
            if ready == expected_pods {
                info!("Component '{}' has {} ready pod(s)", component, ready);
                return Ok(());
            }
            debug!(
                "Component '{}' has {}/{} ready pod(s), checking again in {:?}",
                component, ready, expected_pods, poll_interval
            );
            tokio::time::sleep(poll_interval).await;
        }
    })
    .await;

    match outcome {
        Ok(result) => result,
        Err(_) => error::TaskTimeoutSnafu {
            components: vec![component],
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Returns scripted ready-pod counts per component; the last count repeats once the script is
    /// exhausted.
    struct ScriptedReadyPods {
        scripts: HashMap<&'static str, Vec<usize>>,
        polls: Mutex<HashMap<String, usize>>,
    }

    impl ScriptedReadyPods {
        fn new(scripts: &[(&'static str, &[usize])]) -> Arc<Self> {
            Arc::new(Self {
                scripts: scripts
                    .iter()
                    .map(|(component, counts)| (*component, counts.to_vec()))
                    .collect(),
                polls: Mutex::new(HashMap::new()),
            })
        }

        fn polls(&self, label_value: &str) -> usize {
            *self.polls.lock().unwrap().get(label_value).unwrap_or(&0)
        }
    }

    #[async_trait::async_trait]
    impl ReadyPods for ScriptedReadyPods {
        async fn count_ready(
            &self,
            _label_key: &str,
            label_value: &str,
        ) -> std::result::Result<usize, kube::Error> {
            let mut polls = self.polls.lock().unwrap();
            let index = polls.entry(label_value.to_string()).or_insert(0);
            let script = &self.scripts[label_value];
            let count = *script.get(*index).or_else(|| script.last()).unwrap();
            *index += 1;
            Ok(count)
        }
    }

    /// Every query takes `delay` to answer; counts every call it receives.
    struct StalledReadyPods {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ReadyPods for StalledReadyPods {
        async fn count_ready(
            &self,
            _label_key: &str,
            _label_value: &str,
        ) -> std::result::Result<usize, kube::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(0)
        }
    }

    /// Every query fails the way the cluster API would on a denied request.
    struct FailingReadyPods;

    #[async_trait::async_trait]
    impl ReadyPods for FailingReadyPods {
        async fn count_ready(
            &self,
            _label_key: &str,
            _label_value: &str,
        ) -> std::result::Result<usize, kube::Error> {
            Err(kube::Error::Api(ErrorResponse {
                status: "Failure".to_string(),
                message: "pods is forbidden".to_string(),
                reason: "Forbidden".to_string(),
                code: 403,
            }))
        }
    }

    fn request(components: &[Component], expected_pods: usize) -> WaitRequest {
        WaitRequest {
            label_key: LABEL_COMPONENT.to_string(),
            expected_pods,
            components: components.iter().copied().collect(),
            poll_interval: Duration::from_secs(10),
            task_timeout: Duration::from_secs(360),
            overall_timeout: Duration::from_secs(1200),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn component_ready_after_three_polls_succeeds() {
        let pods = ScriptedReadyPods::new(&[(SERVICE_COMPONENT, &[0, 2, 6])]);
        let start = Instant::now();

        wait_for_ready(Arc::clone(&pods), &request(&[Component::Service], 6))
            .await
            .unwrap();

        assert_eq!(pods.polls(SERVICE_COMPONENT), 3);
        // Two sleeps of the poll interval passed before the third check reported six ready pods.
        assert!(start.elapsed() >= Duration::from_secs(20));
        assert!(start.elapsed() < Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn never_ready_component_is_named() {
        let pods = ScriptedReadyPods::new(&[(SERVICE_COMPONENT, &[2]), (UI_COMPONENT, &[0])]);

        let error = wait_for_ready(
            Arc::clone(&pods),
            &request(&[Component::Service, Component::Ui], 2),
        )
        .await
        .unwrap_err();

        match error {
            Error::TaskTimeout { components } => assert_eq!(components, vec![Component::Ui]),
            other => panic!("expected TaskTimeout, got {}", other),
        }
        // The satisfied component stopped polling after its first check while the laggard kept
        // going until its budget ran out.
        assert_eq!(pods.polls(SERVICE_COMPONENT), 1);
        assert!(pods.polls(UI_COMPONENT) > 5);
    }

    #[tokio::test(start_paused = true)]
    async fn all_late_components_are_named() {
        let pods = ScriptedReadyPods::new(&[(SERVICE_COMPONENT, &[0]), (UI_COMPONENT, &[1])]);

        let error = wait_for_ready(
            Arc::clone(&pods),
            &request(&[Component::Service, Component::Ui], 2),
        )
        .await
        .unwrap_err();

        match error {
            Error::TaskTimeout { components } => {
                assert_eq!(components, vec![Component::Service, Component::Ui])
            }
            other => panic!("expected TaskTimeout, got {}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overall_timeout_cancels_outstanding_tasks() {
        let pods = Arc::new(StalledReadyPods {
            delay: Duration::from_secs(30 * 60),
            calls: AtomicUsize::new(0),
        });
        let mut request = request(&[Component::Service, Component::Ui], 1);
        // The per-task budget would not fire before the overall budget does.
        request.task_timeout = Duration::from_secs(40 * 60);
        request.overall_timeout = Duration::from_secs(20 * 60);

        let error = wait_for_ready(Arc::clone(&pods), &request).await.unwrap_err();
        assert!(matches!(error, Error::OverallTimeout { .. }));

        // Both tasks issued their first query and were then cancelled mid-flight; nothing keeps
        // polling after the call has returned.
        assert_eq!(pods.calls.load(Ordering::SeqCst), 2);
        tokio::time::sleep(Duration::from_secs(4 * 60 * 60)).await;
        assert_eq!(pods.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn already_satisfied_wait_is_idempotent() {
        let pods = ScriptedReadyPods::new(&[(SERVICE_COMPONENT, &[6])]);
        let request = request(&[Component::Service], 6);

        wait_for_ready(Arc::clone(&pods), &request).await.unwrap();
        wait_for_ready(Arc::clone(&pods), &request).await.unwrap();

        // One check per call; the read-only query is the only cluster interaction.
        assert_eq!(pods.polls(SERVICE_COMPONENT), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn over_ready_count_does_not_satisfy_exact_match() {
        let pods = ScriptedReadyPods::new(&[(SERVICE_COMPONENT, &[3])]);

        let error = wait_for_ready(Arc::clone(&pods), &request(&[Component::Service], 2))
            .await
            .unwrap_err();

        match error {
            Error::TaskTimeout { components } => assert_eq!(components, vec![Component::Service]),
            other => panic!("expected TaskTimeout, got {}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn query_failure_names_the_component() {
        let error = wait_for_ready(
            Arc::new(FailingReadyPods),
            &request(&[Component::Service], 1),
        )
        .await
        .unwrap_err();

        match error {
            Error::Query { component, .. } => assert_eq!(component, Component::Service),
            other => panic!("expected Query, got {}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn degenerate_requests_are_rejected() {
        let pods = ScriptedReadyPods::new(&[(SERVICE_COMPONENT, &[1])]);

        let error = wait_for_ready(Arc::clone(&pods), &request(&[], 1))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::EmptyComponentSet));

        let mut empty_key = request(&[Component::Service], 1);
        empty_key.label_key.clear();
        let error = wait_for_ready(Arc::clone(&pods), &empty_key).await.unwrap_err();
        assert!(matches!(error, Error::EmptyLabelKey));

        let error = wait_for_ready(Arc::clone(&pods), &request(&[Component::Service], 0))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::ZeroExpectedPods));

        // The degenerate requests never reached the cluster.
        assert_eq!(pods.polls(SERVICE_COMPONENT), 0);
    }

    #[test]
    fn component_names_parse_and_print() {
        assert_eq!("service".parse::<Component>().unwrap(), Component::Service);
        assert_eq!(Component::Ui.to_string(), "ui");
        assert_eq!(Component::Service.name(), SERVICE_COMPONENT);
    }
}
