//! Prints the CRD manifests for installation with `kubectl apply -f -`.

use crds::EventhubNamespaceNetworkRule;
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&EventhubNamespaceNetworkRule::crd())?);
    Ok(())
}
