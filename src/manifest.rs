//! Offline rendering of a UE's Kubernetes objects
//!
//! Produces the exact objects a provision run would create, as a multi-document
//! YAML stream, without contacting a cluster.

use serde::Serialize;

use crate::ue::{UeId, UeResourceBuilder};
use crate::upf::{UpfResourceBuilder, UpfSpec};
use crate::Error;

/// Render ConfigMap, Pod, Deployment and Service for `id`, in creation order
pub fn render_manifests(
    id: UeId,
    namespace: &str,
    ue_image: &str,
    upf: &UpfSpec,
) -> Result<String, Error> {
    let ue = UeResourceBuilder::new(namespace, ue_image).build(id);
    let upf = UpfResourceBuilder::new(namespace).build(id, upf);

    let docs = [
        to_yaml(&ue.config_map)?,
        to_yaml(&ue.pod)?,
        to_yaml(&upf.deployment)?,
        to_yaml(&upf.service)?,
    ];
    Ok(docs.join("---\n"))
}

fn to_yaml<T: Serialize>(object: &T) -> Result<String, Error> {
    serde_yaml::to_string(object).map_err(|e| Error::serialization(e.to_string()))
}
