// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Kubernetes API access
//!
//! The query engine talks to the cluster only through [`ClusterApi`], which
//! mirrors the two list calls it needs. [`KubeClusterApi`] implements it on
//! top of a `kube::Client`.

mod client;
pub mod field_selectors;
mod rate_limit;

use async_trait::async_trait;

pub use client::{ClientSettings, KubeClusterApi};
pub use field_selectors::FieldSelector;
pub use rate_limit::RequestBudget;

use crate::query::{Host, InstancePayload, QueryError};

/// One pod list request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Restrict the list to pods on this node (server-side field selector)
    pub host: Option<String>,
    /// Maximum number of items per page
    pub limit: u32,
    /// Continue token from the previous page
    pub continue_token: Option<String>,
    /// Let the API server answer from its watch cache instead of a quorum read
    pub read_cache: bool,
}

impl PageRequest {
    pub fn field_selector(&self) -> Option<String> {
        self.host
            .as_deref()
            .map(|host| FieldSelector::node_name(host).to_k8s_string())
    }
}

/// One page of a pod list response
#[derive(Debug, Clone, Default)]
pub struct InstancePage {
    pub items: Vec<InstancePayload>,
    /// `metadata.resourceVersion` of the list
    pub resource_version: Option<String>,
    /// `metadata.continue`; absent or empty on the last page
    pub continue_token: Option<String>,
}

/// The list calls the query engine issues against a cluster
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// List every node in the cluster (single request)
    async fn list_hosts(&self) -> Result<Vec<Host>, QueryError>;

    /// Fetch one page of pods
    async fn list_instances(&self, request: &PageRequest) -> Result<InstancePage, QueryError>;
}
