// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! In-memory cluster for engine tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{Host, InstancePayload, QueryError, WorkloadInstance};
use crate::kubernetes::{ClusterApi, InstancePage, PageRequest};

struct FakeItem {
    node: String,
    payload: InstancePayload,
}

/// Scripted cluster: continue tokens are item offsets, page N reports the Nth
/// configured resource version
#[derive(Default)]
pub struct FakeCluster {
    hosts: Vec<Host>,
    items: Vec<FakeItem>,
    serve_raw: bool,
    omit_last_continue: bool,
    page_versions: Vec<String>,
    host_versions: HashMap<String, String>,
    host_delays: HashMap<String, Duration>,
    failing_hosts: HashSet<String>,
    fail_host_listing: bool,
    fail_on_page: Option<u32>,
    requests: Mutex<Vec<PageRequest>>,
    completed: Mutex<Vec<Option<String>>>,
    host_list_calls: AtomicUsize,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: Host) -> Self {
        self.hosts.push(host);
        self
    }

    /// Add `count` unlabeled nodes named `prefix-0..`
    pub fn with_plain_hosts(mut self, prefix: &str, count: usize) -> Self {
        for i in 0..count {
            self.hosts.push(Host::new(format!("{}-{}", prefix, i)));
        }
        self
    }

    pub fn with_pod(mut self, pod: WorkloadInstance) -> Self {
        self.items.push(FakeItem {
            node: pod.node_name.clone(),
            payload: InstancePayload::Typed(pod),
        });
        self
    }

    pub fn with_raw_item(mut self, node: &str, value: serde_json::Value) -> Self {
        self.items.push(FakeItem {
            node: node.to_string(),
            payload: InstancePayload::Raw(value),
        });
        self
    }

    /// Serve typed pods as JSON manifests, like the real API
    pub fn serving_raw(mut self) -> Self {
        self.serve_raw = true;
        self
    }

    /// Leave `metadata.continue` out of the last page instead of sending ""
    pub fn omitting_last_continue(mut self) -> Self {
        self.omit_last_continue = true;
        self
    }

    pub fn with_page_versions(mut self, versions: &[&str]) -> Self {
        self.page_versions = versions.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_host_version(mut self, host: &str, version: &str) -> Self {
        self.host_versions
            .insert(host.to_string(), version.to_string());
        self
    }

    pub fn with_delay(mut self, host: &str, delay: Duration) -> Self {
        self.host_delays.insert(host.to_string(), delay);
        self
    }

    pub fn failing_on(mut self, host: &str) -> Self {
        self.failing_hosts.insert(host.to_string());
        self
    }

    pub fn failing_host_listing(mut self) -> Self {
        self.fail_host_listing = true;
        self
    }

    pub fn failing_on_page(mut self, page: u32) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Node filters of the pod requests that ran to completion
    pub fn completed(&self) -> Vec<Option<String>> {
        self.completed.lock().unwrap().clone()
    }

    pub fn host_list_calls(&self) -> usize {
        self.host_list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_hosts(&self) -> Result<Vec<Host>, QueryError> {
        self.host_list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_host_listing {
            return Err(QueryError::transport(
                "list nodes in the cluster",
                "the server has asked for the client to provide credentials",
            ));
        }
        Ok(self.hosts.clone())
    }

    async fn list_instances(&self, request: &PageRequest) -> Result<InstancePage, QueryError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(host) = &request.host
            && let Some(delay) = self.host_delays.get(host)
        {
            tokio::time::sleep(*delay).await;
        }

        if let Some(host) = &request.host
            && self.failing_hosts.contains(host)
        {
            return Err(QueryError::transport(
                format!("list pods on node {:?} from kubernetes api", host),
                "etcdserver: request timed out",
            ));
        }

        let offset: usize = request
            .continue_token
            .as_deref()
            .map(|t| t.parse().expect("fake continue token"))
            .unwrap_or(0);
        let limit = request.limit.max(1) as usize;
        let page_index = offset / limit;

        if self.fail_on_page == Some(page_index as u32 + 1) {
            return Err(QueryError::transport("list pods from kubernetes api", "EOF"));
        }

        let matching: Vec<&FakeItem> = self
            .items
            .iter()
            .filter(|item| request.host.as_ref().is_none_or(|h| *h == item.node))
            .collect();

        let items = matching
            .iter()
            .skip(offset)
            .take(limit)
            .map(|item| match &item.payload {
                InstancePayload::Typed(pod) if self.serve_raw => {
                    InstancePayload::Raw(pod.to_manifest().into_owned())
                }
                payload => payload.clone(),
            })
            .collect();

        let next = offset + limit;
        let continue_token = if next < matching.len() {
            Some(next.to_string())
        } else if self.omit_last_continue {
            None
        } else {
            Some(String::new())
        };

        let resource_version = request
            .host
            .as_ref()
            .and_then(|h| self.host_versions.get(h).cloned())
            .or_else(|| {
                self.page_versions
                    .get(page_index)
                    .or(self.page_versions.last())
                    .cloned()
            });

        self.completed.lock().unwrap().push(request.host.clone());

        Ok(InstancePage {
            items,
            resource_version,
            continue_token,
        })
    }
}
