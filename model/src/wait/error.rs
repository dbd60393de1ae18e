use crate::wait::Component;
use snafu::Snafu;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for the readiness waiter. Callers branch on the variant to distinguish a
/// component that missed its own budget from a wait that was cut short as a whole.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum Error {
    #[snafu(display("No components were given to wait for"))]
    EmptyComponentSet,

    #[snafu(display("The component selection label key is empty"))]
    EmptyLabelKey,

    #[snafu(display("A readiness polling task was cancelled before its outcome was observed"))]
    Interrupted,

    #[snafu(display(
        "Not every component became ready within {:?}; outstanding polling tasks were cancelled",
        timeout
    ))]
    OverallTimeout { timeout: Duration },

    #[snafu(display("Unable to count ready pods for component '{}': {}", component, source))]
    Query {
        component: Component,
        source: kube::Error,
    },

    #[snafu(display(
        "Component(s) [{}] did not reach the expected ready-pod count in time",
        components.iter().map(|component| component.to_string()).collect::<Vec<_>>().join(", ")
    ))]
    TaskTimeout { components: Vec<Component> },

    #[snafu(display("The expected ready-pod count must be at least 1"))]
    ZeroExpectedPods,
}
