// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Progress reporting for long-running queries
//!
//! The query engine reports what it is doing through a broadcast channel; the
//! binary turns those updates into a spinner on stderr.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// Create a spinner with consistent styling
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Progress update message
#[derive(Clone, Debug)]
pub enum ProgressUpdate {
    // === Node resolution ===
    /// Listing nodes to evaluate selectors
    ResolvingHosts { selectors: usize },
    /// Selectors evaluated
    HostsResolved {
        matched: usize,
        total: usize,
        elapsed_ms: u64,
    },

    // === Pod query ===
    /// Starting the pod query
    StartingQuery { strategy: String, host_count: usize },
    /// One page of a pod list arrived; `host` is None for the cluster-wide scan
    PageFetched {
        host: Option<String>,
        page: u32,
        items: usize,
    },
    /// All pods of one node fetched
    HostComplete {
        host: String,
        pods: usize,
        elapsed_ms: u64,
    },
    /// Pod query finished
    QueryComplete { pods: usize, elapsed_ms: u64 },
}

/// Progress reporter shared by one invocation
pub struct ProgressReporter {
    sender: broadcast::Sender<ProgressUpdate>,
    /// Count of nodes whose pods were fetched
    hosts_done: AtomicUsize,
    /// Total nodes for the current query
    hosts_total: AtomicUsize,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self {
            sender,
            hosts_done: AtomicUsize::new(0),
            hosts_total: AtomicUsize::new(0),
        }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }

    pub fn resolving_hosts(&self, selectors: usize) {
        let _ = self
            .sender
            .send(ProgressUpdate::ResolvingHosts { selectors });
    }

    pub fn hosts_resolved(&self, matched: usize, total: usize, elapsed_ms: u64) {
        let _ = self.sender.send(ProgressUpdate::HostsResolved {
            matched,
            total,
            elapsed_ms,
        });
    }

    /// Report query start
    pub fn start_query(&self, strategy: &str, host_count: usize) {
        self.hosts_done.store(0, Ordering::SeqCst);
        self.hosts_total.store(host_count, Ordering::SeqCst);
        let _ = self.sender.send(ProgressUpdate::StartingQuery {
            strategy: strategy.to_string(),
            host_count,
        });
    }

    pub fn page_fetched(&self, host: Option<&str>, page: u32, items: usize) {
        let _ = self.sender.send(ProgressUpdate::PageFetched {
            host: host.map(String::from),
            page,
            items,
        });
    }

    /// Report node completion
    pub fn host_complete(&self, host: &str, pods: usize, elapsed_ms: u64) {
        self.hosts_done.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(ProgressUpdate::HostComplete {
            host: host.to_string(),
            pods,
            elapsed_ms,
        });
    }

    pub fn query_complete(&self, pods: usize, elapsed_ms: u64) {
        let _ = self
            .sender
            .send(ProgressUpdate::QueryComplete { pods, elapsed_ms });
    }

    /// Get current progress (done/total)
    pub fn progress(&self) -> (usize, usize) {
        (
            self.hosts_done.load(Ordering::SeqCst),
            self.hosts_total.load(Ordering::SeqCst),
        )
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe handle to progress reporter
pub type ProgressHandle = Arc<ProgressReporter>;

/// Create a new progress reporter handle
pub fn create_progress_handle() -> ProgressHandle {
    Arc::new(ProgressReporter::new())
}
