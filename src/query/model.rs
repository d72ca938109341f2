// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Nodes, snapshot tokens and result sets

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use super::pod::WorkloadInstance;

/// A cluster node and its labels, as seen by one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

impl Host {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }
}

/// A resourceVersion observed in a list response
///
/// Tokens are ordered as plain strings. Resource versions are opaque, so
/// "9" orders after "10"; the merged token is a freshness hint only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SnapshotToken(String);

impl SnapshotToken {
    /// Returns None for an empty token
    pub fn new(token: &str) -> Option<Self> {
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pods collected by one query plus the freshest snapshot token seen
///
/// When several per-node queries contribute, the token is only a freshness
/// hint: each node was listed against its own snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub instances: Vec<WorkloadInstance>,
    pub snapshot: Option<SnapshotToken>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Move the snapshot token forward; older or empty tokens are ignored
    pub fn observe_snapshot(&mut self, token: Option<&str>) {
        let Some(incoming) = token.and_then(SnapshotToken::new) else {
            return;
        };
        match &self.snapshot {
            Some(current) if *current >= incoming => {}
            _ => self.snapshot = Some(incoming),
        }
    }

    /// Append another result set, keeping the newest snapshot token
    pub fn merge(&mut self, other: ResultSet) {
        self.instances.extend(other.instances);
        self.observe_snapshot(other.snapshot.as_ref().map(SnapshotToken::as_str));
    }

    /// Keep only pods scheduled on one of `hosts`
    pub fn retain_hosts(&mut self, hosts: &BTreeSet<String>) {
        self.instances
            .retain(|instance| hosts.contains(&instance.node_name));
    }
}
