//! Encapsulates the K8S object definitions an Apicurito installation consists of.
mod namespace;
mod operator;

pub use namespace::apicurito_namespace;
pub use operator::{
    operator_cluster_role, operator_cluster_role_binding, operator_deployment, operator_role,
    operator_role_binding, operator_service, operator_service_account,
};
