/// Helper macro to avoid retyping the API group of the Apicurito operator when creating further
/// string constants from it. When given no parameters, this returns the bare group. When given a
/// string literal parameter it adds `/parameter` to the end.
macro_rules! apicur {
    () => {
        "apicur.io"
    };
    ($s:literal) => {
        concat!(apicur!(), "/", $s)
    };
}

// System identifiers
pub const API_GROUP: &str = apicur!();
pub const API_VERSION: &str = apicur!("v1alpha1");
pub const NAMESPACE: &str = "apicurito";
pub const CRD_NAME: &str = concat!("apicuritos.", apicur!());

// Object names
pub const CUSTOM_RESOURCE: &str = "apicurito";
pub const OPERATOR: &str = "apicurito-operator";
pub const OPERATOR_CLUSTER_ROLE: &str = "apicurito";
pub const OPERATOR_CLUSTER_ROLE_BINDING: &str = "apicurito";
pub const OPERATOR_ROLE: &str = "apicurito-operator-role";
pub const OPERATOR_ROLE_BINDING: &str = "apicurito-operator-role-binding";
pub const OPERATOR_SERVICE: &str = "apicurito-operator";
pub const OPERATOR_SERVICE_ACCOUNT: &str = "apicurito";
pub const PULL_SECRET: &str = "apicurito-pull-secret";

// Component names, used as the value of the component selection label on deployed pods
pub const SERVICE_COMPONENT: &str = "apicurito-service";
pub const UI_COMPONENT: &str = "apicurito-ui";

// Label keys
pub const LABEL_COMPONENT: &str = "component";

// Environment variables understood by the operator
pub const ENV_RELATED_IMAGE_GENERATOR: &str = "RELATED_IMAGE_GENERATOR";
pub const ENV_RELATED_IMAGE_OPERATOR: &str = "RELATED_IMAGE_APICURITO_OPERATOR";
pub const ENV_RELATED_IMAGE_UI: &str = "RELATED_IMAGE_APICURITO";

// Standard tags https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
pub const APP_NAME: &str = "app.kubernetes.io/name";
pub const APP_INSTANCE: &str = "app.kubernetes.io/instance";
pub const APP_COMPONENT: &str = "app.kubernetes.io/component";
pub const APP_PART_OF: &str = "app.kubernetes.io/part-of";
pub const APP_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const APP_CREATED_BY: &str = "app.kubernetes.io/created-by";

#[test]
fn apicurito_constants_macro_test() {
    assert_eq!("apicur.io", apicur!());
    assert_eq!("apicur.io/v1alpha1", API_VERSION);
    assert_eq!("apicuritos.apicur.io", CRD_NAME);
    assert_eq!("apicur.io/foo", apicur!("foo"));
}
