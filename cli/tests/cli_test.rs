#![cfg(feature = "integ")]
use assert_cmd::Command;
use selftest::Cluster;
use tokio::time::Duration;

/// The amount of time we will wait for the operator pod to run before we consider the selftest a
/// failure. This can be a very long time on resource constrained machines or machines running a VM
/// for docker.
const POD_TIMEOUT: Duration = Duration::from_secs(300);

/// We will test:
/// `apicuritoctl install`
/// `apicuritoctl status`
/// `apicuritoctl uninstall`
#[tokio::test]
async fn install_apicurito() {
    let cluster_name = "apicurito-integ";
    let cluster = Cluster::new(cluster_name).unwrap();
    cluster
        .load_image_to_cluster("apicurito-operator:integ")
        .unwrap();

    let mut cmd = Command::cargo_bin("apicuritoctl").unwrap();
    cmd.args(&[
        "--kubeconfig",
        cluster.kubeconfig().to_str().unwrap(),
        "install",
        "--operator-image",
        "apicurito-operator:integ",
        "--no-wait",
    ]);
    cmd.assert().success();
    cluster.wait_for_operator(POD_TIMEOUT).await.unwrap();

    let mut cmd = Command::cargo_bin("apicuritoctl").unwrap();
    cmd.args(&[
        "--kubeconfig",
        cluster.kubeconfig().to_str().unwrap(),
        "status",
    ]);
    cmd.assert().success();

    let mut cmd = Command::cargo_bin("apicuritoctl").unwrap();
    cmd.args(&[
        "--kubeconfig",
        cluster.kubeconfig().to_str().unwrap(),
        "uninstall",
    ]);
    cmd.assert().success();
}
