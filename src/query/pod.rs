// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Pod representation used by the query engine
//!
//! The fields needed for filtering, ordering and display are lifted out of
//! the manifest through a narrow shape instead of the full k8s-openapi `Pod`,
//! so unrelated fields never cause a decode failure. The manifest itself is
//! kept for json and yaml output.

use std::borrow::Cow;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::QueryError;

/// Kind of the controller whose pods are hidden unless asked for
pub const DAEMONSET_KIND: &str = "DaemonSet";

/// Kind accepted when decoding list items
pub const POD_KIND: &str = "Pod";

/// Owner reference as found in `metadata.ownerReferences`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uid: String,
}

/// A pod scheduled on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadInstance {
    pub node_name: String,
    pub namespace: String,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<OwnerRef>,
    pub resource_version: String,
    pub phase: Option<String>,
    #[serde(rename = "podIP")]
    pub pod_ip: Option<String>,
    pub creation_timestamp: Option<DateTime<Utc>>,
    /// Full v1 Pod manifest as listed, when decoded from the API
    #[serde(skip)]
    pub manifest: Option<serde_json::Value>,
}

impl WorkloadInstance {
    pub fn new(
        node_name: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            node_name: node_name.into(),
            namespace: namespace.into(),
            name: name.into(),
            owners: Vec::new(),
            resource_version: String::new(),
            phase: None,
            pod_ip: None,
            creation_timestamp: None,
            manifest: None,
        }
    }

    pub fn with_owner(mut self, kind: &str, name: &str) -> Self {
        self.owners.push(OwnerRef {
            kind: kind.to_string(),
            name: name.to_string(),
            uid: format!("{}-uid", name),
        });
        self
    }

    /// True if any owner reference has the given kind
    pub fn is_owned_by(&self, kind: &str) -> bool {
        self.owners.iter().any(|owner| owner.kind == kind)
    }

    /// Decode a pod from its JSON manifest, keeping the manifest
    pub fn from_manifest(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let manifest = PodManifest::deserialize(&value)?;
        let mut instance = Self::from(manifest);
        instance.manifest = Some(value);
        Ok(instance)
    }

    /// The pod as a v1 Pod document
    ///
    /// Returns the listed manifest when there is one, otherwise builds a
    /// minimal manifest from the known fields.
    pub fn to_manifest(&self) -> Cow<'_, serde_json::Value> {
        if let Some(manifest) = &self.manifest {
            return Cow::Borrowed(manifest);
        }

        let mut metadata = serde_json::json!({
            "name": self.name,
            "namespace": self.namespace,
        });
        if !self.resource_version.is_empty() {
            metadata["resourceVersion"] = self.resource_version.clone().into();
        }
        if let Some(created) = self.creation_timestamp {
            metadata["creationTimestamp"] = created.to_rfc3339_opts(SecondsFormat::Secs, true).into();
        }
        if !self.owners.is_empty() {
            metadata["ownerReferences"] = serde_json::json!(self.owners);
        }

        let mut status = serde_json::Map::new();
        if let Some(phase) = &self.phase {
            status.insert("phase".to_string(), phase.clone().into());
        }
        if let Some(ip) = &self.pod_ip {
            status.insert("podIP".to_string(), ip.clone().into());
        }

        Cow::Owned(serde_json::json!({
            "apiVersion": "v1",
            "kind": POD_KIND,
            "metadata": metadata,
            "spec": {"nodeName": self.node_name},
            "status": status,
        }))
    }
}

/// A list item as delivered by the transport
///
/// Items are either already typed or still an opaque JSON document that has to
/// be decoded before anything else looks at it.
#[derive(Debug, Clone)]
pub enum InstancePayload {
    Typed(WorkloadInstance),
    Raw(serde_json::Value),
}

impl InstancePayload {
    /// Resolve the payload into a pod; `page` and `index` locate the item in errors
    pub fn into_instance(self, page: u32, index: usize) -> Result<WorkloadInstance, QueryError> {
        match self {
            InstancePayload::Typed(instance) => Ok(instance),
            InstancePayload::Raw(value) => {
                if let Some(kind) = value.get("kind").and_then(|k| k.as_str())
                    && kind != POD_KIND
                {
                    return Err(QueryError::UnexpectedType {
                        page,
                        index,
                        kind: kind.to_string(),
                    });
                }
                WorkloadInstance::from_manifest(value)
                    .map_err(|source| QueryError::Decode { page, index, source })
            }
        }
    }
}

#[derive(Deserialize)]
struct PodManifest {
    metadata: PodMetadata,
    #[serde(default)]
    spec: Option<PodSpec>,
    #[serde(default)]
    status: Option<PodStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodMetadata {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    resource_version: Option<String>,
    #[serde(default)]
    creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    owner_references: Option<Vec<OwnerRef>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodSpec {
    #[serde(default)]
    node_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodStatus {
    #[serde(default)]
    phase: Option<String>,
    #[serde(default, rename = "podIP")]
    pod_ip: Option<String>,
}

impl From<PodManifest> for WorkloadInstance {
    fn from(manifest: PodManifest) -> Self {
        let PodManifest {
            metadata,
            spec,
            status,
        } = manifest;
        let (phase, pod_ip) = status.map(|s| (s.phase, s.pod_ip)).unwrap_or_default();

        Self {
            node_name: spec.and_then(|s| s.node_name).unwrap_or_default(),
            namespace: metadata.namespace.unwrap_or_default(),
            name: metadata.name,
            owners: metadata.owner_references.unwrap_or_default(),
            resource_version: metadata.resource_version.unwrap_or_default(),
            phase,
            pod_ip,
            creation_timestamp: metadata.creation_timestamp,
            manifest: None,
        }
    }
}
