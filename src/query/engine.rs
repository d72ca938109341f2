// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Query planning and execution
//!
//! A query resolves its node selectors (if any), picks a strategy from the
//! share of the cluster it targets, fetches pods with that strategy and hands
//! the result to the post-processor.

use std::collections::BTreeSet;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::QueryError;
use super::model::ResultSet;
use super::postprocess::postprocess;
use super::resolver::resolve_hosts;
use super::scan::{ScanOptions, scan_instances};
use super::scatter::scatter_gather;
use super::selector::LabelSelector;
use super::strategy::{Strategy, choose_strategy};
use crate::kubernetes::ClusterApi;
use crate::progress::ProgressHandle;

/// Default number of concurrent per-node queries
pub const DEFAULT_WORKERS: usize = 20;

/// Nodes to query: explicit names plus label selectors, unioned
#[derive(Debug, Clone, Default)]
pub struct QueryTargets {
    pub node_names: BTreeSet<String>,
    pub selectors: Vec<LabelSelector>,
}

impl QueryTargets {
    pub fn is_empty(&self) -> bool {
        self.node_names.is_empty() && self.selectors.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub workers: usize,
    /// Forced strategy; None lets the node ratio decide
    pub strategy: Option<Strategy>,
    pub include_daemonsets: bool,
    pub scan: ScanOptions,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            strategy: None,
            include_daemonsets: false,
            scan: ScanOptions::default(),
        }
    }
}

/// What a query will fetch and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub strategy: Strategy,
    pub hosts: BTreeSet<String>,
    /// Cluster size seen while resolving selectors, 0 when none were given
    pub total_hosts: usize,
}

/// One invocation of the pod query engine
pub struct PodQuery<'a> {
    api: &'a dyn ClusterApi,
    progress: ProgressHandle,
    cancel: CancellationToken,
}

impl<'a> PodQuery<'a> {
    pub fn new(api: &'a dyn ClusterApi, progress: ProgressHandle, cancel: CancellationToken) -> Self {
        Self {
            api,
            progress,
            cancel,
        }
    }

    /// Resolve targets to node names and pick a strategy
    pub async fn plan(
        &self,
        targets: &QueryTargets,
        options: &QueryOptions,
    ) -> Result<QueryPlan, QueryError> {
        let mut hosts = targets.node_names.clone();
        let mut total_hosts = 0;

        if !targets.selectors.is_empty() {
            let start = Instant::now();
            self.progress.resolving_hosts(targets.selectors.len());
            let resolved = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(QueryError::Cancelled),
                resolved = resolve_hosts(self.api, &targets.selectors) => resolved?,
            };
            self.progress.hosts_resolved(
                resolved.matched.len(),
                resolved.total,
                start.elapsed().as_millis() as u64,
            );
            total_hosts = resolved.total;
            hosts.extend(resolved.matched);
        }

        let strategy = match options.strategy {
            Some(forced) => {
                debug!(strategy = %forced, "Using requested strategy");
                forced
            }
            None => choose_strategy(total_hosts, hosts.len()),
        };

        info!(
            strategy = %strategy,
            nodes = hosts.len(),
            total_nodes = total_hosts,
            "Planned pod query"
        );

        Ok(QueryPlan {
            strategy,
            hosts,
            total_hosts,
        })
    }

    /// Fetch the pods for a plan, without post-processing
    pub async fn execute(
        &self,
        plan: &QueryPlan,
        options: &QueryOptions,
    ) -> Result<ResultSet, QueryError> {
        let start = Instant::now();
        self.progress
            .start_query(plan.strategy.as_str(), plan.hosts.len());

        let result = match plan.strategy {
            Strategy::ByHost => {
                let hosts: Vec<String> = plan.hosts.iter().cloned().collect();
                scatter_gather(
                    self.api,
                    &hosts,
                    options.workers,
                    &options.scan,
                    &self.progress,
                    &self.cancel,
                )
                .await?
            }
            Strategy::AllPods => {
                let mut result = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(QueryError::Cancelled),
                    result = scan_instances(self.api, None, &options.scan, &self.progress) => result?,
                };
                let scanned = result.len();
                result.retain_hosts(&plan.hosts);
                debug!(
                    scanned = scanned,
                    kept = result.len(),
                    "Filtered cluster-wide pod list to targeted nodes"
                );
                result
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        self.progress.query_complete(result.len(), elapsed_ms);
        info!(
            strategy = %plan.strategy,
            pods = result.len(),
            elapsed_ms = elapsed_ms,
            "Pod query complete"
        );
        Ok(result)
    }

    /// Plan, execute and post-process
    pub async fn run(
        &self,
        targets: &QueryTargets,
        options: &QueryOptions,
    ) -> Result<ResultSet, QueryError> {
        let plan = self.plan(targets, options).await?;
        let result = self.execute(&plan, options).await?;
        Ok(postprocess(result, options.include_daemonsets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::create_progress_handle;
    use crate::query::testing::FakeCluster;
    use crate::query::{Host, WorkloadInstance};

    fn targets(names: &[&str], selectors: &[&str]) -> QueryTargets {
        QueryTargets {
            node_names: names.iter().map(|s| s.to_string()).collect(),
            selectors: selectors
                .iter()
                .map(|s| LabelSelector::parse(s).unwrap())
                .collect(),
        }
    }

    fn web_cluster() -> FakeCluster {
        FakeCluster::new()
            .with_host(Host::new("h1").with_label("tier", "web"))
            .with_host(Host::new("h2").with_label("tier", "web"))
            .with_plain_hosts("other", 8)
            .with_pod(WorkloadInstance::new("h2", "default", "web-1").with_owner("ReplicaSet", "web"))
            .with_pod(WorkloadInstance::new("h1", "default", "web-0").with_owner("ReplicaSet", "web"))
            .with_pod(
                WorkloadInstance::new("h1", "kube-system", "proxy-a")
                    .with_owner("DaemonSet", "kube-proxy"),
            )
            .with_pod(WorkloadInstance::new("other-3", "default", "db-0"))
    }

    fn query(cluster: &FakeCluster) -> PodQuery<'_> {
        PodQuery::new(cluster, create_progress_handle(), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_selector_plan_uses_by_host() {
        let cluster = web_cluster();
        let plan = query(&cluster)
            .plan(&targets(&[], &["tier=web"]), &QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(plan.strategy, Strategy::ByHost);
        assert_eq!(plan.total_hosts, 10);
        assert_eq!(plan.hosts, BTreeSet::from(["h1".to_string(), "h2".to_string()]));
    }

    #[tokio::test]
    async fn test_explicit_names_skip_node_listing() {
        let cluster = FakeCluster::new().with_plain_hosts("node", 10_000);
        let plan = query(&cluster)
            .plan(&targets(&["a", "b", "c"], &[]), &QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(plan.strategy, Strategy::ByHost);
        assert_eq!(plan.total_hosts, 0);
        assert_eq!(plan.hosts.len(), 3);
        assert_eq!(cluster.host_list_calls(), 0);
    }

    #[tokio::test]
    async fn test_names_and_selectors_union() {
        let cluster = web_cluster();
        let plan = query(&cluster)
            .plan(&targets(&["h1"], &["tier=web"]), &QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(plan.hosts, BTreeSet::from(["h1".to_string(), "h2".to_string()]));
    }

    #[tokio::test]
    async fn test_large_share_uses_all_pods() {
        let cluster = web_cluster();
        let plan = query(&cluster)
            .plan(&targets(&[], &["!gpu"]), &QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(plan.strategy, Strategy::AllPods);
        assert_eq!(plan.hosts.len(), 10);
    }

    #[tokio::test]
    async fn test_strategy_override() {
        let cluster = web_cluster();
        let options = QueryOptions {
            strategy: Some(Strategy::AllPods),
            ..Default::default()
        };
        let plan = query(&cluster)
            .plan(&targets(&[], &["tier=web"]), &options)
            .await
            .unwrap();

        assert_eq!(plan.strategy, Strategy::AllPods);
    }

    #[tokio::test]
    async fn test_run_by_host() {
        let cluster = web_cluster();
        let result = query(&cluster)
            .run(&targets(&[], &["tier=web"]), &QueryOptions::default())
            .await
            .unwrap();

        let names: Vec<_> = result.instances.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["web-0", "web-1"]);
        assert!(cluster.requests().iter().all(|r| r.host.is_some()));
    }

    #[tokio::test]
    async fn test_strategies_agree() {
        let cluster = web_cluster();
        let mut results = Vec::new();
        for strategy in [Strategy::ByHost, Strategy::AllPods] {
            let options = QueryOptions {
                strategy: Some(strategy),
                include_daemonsets: true,
                ..Default::default()
            };
            let result = query(&cluster)
                .run(&targets(&["h1"], &["tier=web"]), &options)
                .await
                .unwrap();
            results.push(result.instances);
        }

        assert_eq!(results[0].len(), 3);
        assert_eq!(results[0], results[1]);
    }

    #[tokio::test]
    async fn test_all_pods_filters_other_nodes() {
        let cluster = web_cluster();
        let options = QueryOptions {
            strategy: Some(Strategy::AllPods),
            ..Default::default()
        };
        let result = query(&cluster)
            .run(&targets(&["other-3"], &[]), &options)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.instances[0].name, "db-0");
        assert_eq!(cluster.requests()[0].host, None);
    }

    #[tokio::test]
    async fn test_no_matching_nodes_runs_no_pod_queries() {
        let cluster = web_cluster();
        let result = query(&cluster)
            .run(&targets(&[], &["tier=cache"]), &QueryOptions::default())
            .await
            .unwrap();

        assert!(result.is_empty());
        assert!(cluster.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failure_returns_no_pods() {
        let cluster = web_cluster().failing_on("h2");
        let err = query(&cluster)
            .run(&targets(&[], &["tier=web"]), &QueryOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::Host { ref host, .. } if host == "h2"));
    }

    #[tokio::test]
    async fn test_node_listing_failure_is_fatal() {
        let cluster = web_cluster().failing_host_listing();
        let err = query(&cluster)
            .run(&targets(&["h1"], &["tier=web"]), &QueryOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::Transport { .. }));
        assert!(cluster.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cluster = web_cluster();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = PodQuery::new(&cluster, create_progress_handle(), cancel)
            .run(&targets(&[], &["tier=web"]), &QueryOptions::default())
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(cluster.host_list_calls(), 0);
    }
}
