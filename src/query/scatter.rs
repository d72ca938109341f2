// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Per-node pod queries with bounded concurrency
//!
//! Every node gets its own paginated, field-selected pod list. Up to
//! `concurrency` of them run at once; finished nodes append into one shared
//! result set. Pods belong to exactly one node, so the per-node results never
//! overlap and need no deduplication.
//!
//! The first failure cancels the remaining queries and is returned on its
//! own: callers get all pods or an error, never a partial list.

use std::time::Instant;

use futures::stream::{self, TryStreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::QueryError;
use super::model::ResultSet;
use super::scan::{ScanOptions, scan_instances};
use crate::kubernetes::ClusterApi;
use crate::progress::ProgressReporter;

pub async fn scatter_gather(
    api: &dyn ClusterApi,
    hosts: &[String],
    concurrency: usize,
    options: &ScanOptions,
    progress: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<ResultSet, QueryError> {
    let start = Instant::now();
    let concurrency = concurrency.max(1);
    // Cancelling our own child token stops the peers without touching the caller's
    let cancel = cancel.child_token();
    let merged = Mutex::new(ResultSet::default());

    info!(
        nodes = hosts.len(),
        workers = concurrency,
        "Querying pods on each node in parallel"
    );

    let outcome = stream::iter(hosts.iter().map(Ok::<&String, QueryError>))
        .try_for_each_concurrent(concurrency, |host| {
            let cancel = &cancel;
            let merged = &merged;
            async move {
                if cancel.is_cancelled() {
                    return Err(QueryError::Cancelled);
                }
                let host_start = Instant::now();

                let scanned = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(QueryError::Cancelled),
                    result = scan_instances(api, Some(host.as_str()), options, progress) => result,
                };
                let scanned = match scanned {
                    Ok(scanned) => scanned,
                    Err(e) => {
                        cancel.cancel();
                        return Err(QueryError::on_host(host, e));
                    }
                };

                let pods = scanned.len();
                merged.lock().await.merge(scanned);

                let elapsed_ms = host_start.elapsed().as_millis() as u64;
                debug!(node = %host, pods = pods, elapsed_ms = elapsed_ms, "Fetched pods on node");
                progress.host_complete(host, pods, elapsed_ms);
                Ok(())
            }
        })
        .await;

    if let Err(e) = outcome {
        cancel.cancel();
        debug!(error = %e, "Per-node query failed, discarding partial results");
        return Err(e);
    }

    let result = merged.into_inner();
    debug!(
        nodes = hosts.len(),
        pods = result.len(),
        snapshot = ?result.snapshot,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Per-node queries complete"
    );
    Ok(result)
}
