// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Resolving node selectors to node names

use std::collections::BTreeSet;
use std::time::Instant;

use tracing::debug;

use super::error::QueryError;
use super::selector::LabelSelector;
use crate::kubernetes::ClusterApi;

/// Nodes matched by a set of selectors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedHosts {
    pub matched: BTreeSet<String>,
    /// Number of nodes in the cluster when the selectors were evaluated
    pub total: usize,
}

/// List all nodes once and keep those matching any of `selectors`
pub async fn resolve_hosts(
    api: &dyn ClusterApi,
    selectors: &[LabelSelector],
) -> Result<ResolvedHosts, QueryError> {
    let start = Instant::now();
    let hosts = api.list_hosts().await?;
    debug!(
        nodes = hosts.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Listed nodes"
    );

    let start = Instant::now();
    let matched: BTreeSet<String> = hosts
        .iter()
        .filter(|host| selectors.iter().any(|s| s.matches(&host.labels)))
        .map(|host| host.name.clone())
        .collect();
    debug!(
        matched = matched.len(),
        selectors = selectors.len(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "Matched node selectors"
    );

    Ok(ResolvedHosts {
        matched,
        total: hosts.len(),
    })
}
