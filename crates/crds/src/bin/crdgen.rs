//! Prints the CRD manifests for all Metalops resources as YAML.
//!
//! Usage: `cargo run --bin crdgen > manifests/crds.yaml`

use crds::{BareMetalHost, BareMetalMachine};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    println!("{}", serde_yaml::to_string(&BareMetalMachine::crd())?);
    println!("---");
    println!("{}", serde_yaml::to_string(&BareMetalHost::crd())?);
    Ok(())
}
