// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Paginated pod listing
//!
//! Follows continue tokens until the server reports the last page. Used both
//! for the cluster-wide scan and, with a node filter, for every per-node query.

use std::time::Instant;

use tracing::debug;

use super::error::QueryError;
use super::model::ResultSet;
use crate::kubernetes::{ClusterApi, PageRequest};
use crate::progress::ProgressReporter;

/// Page size for paginated list requests
/// Smaller pages reduce memory pressure and allow faster initial response
pub const DEFAULT_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub page_size: u32,
    /// Ask for a watch-cache read on the first page
    pub read_cache: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            read_cache: false,
        }
    }
}

/// List every pod, or every pod on `host`, across all pages
///
/// Any failing page or undecodable item aborts the whole scan.
pub async fn scan_instances(
    api: &dyn ClusterApi,
    host: Option<&str>,
    options: &ScanOptions,
    progress: &ProgressReporter,
) -> Result<ResultSet, QueryError> {
    let scope = host.unwrap_or("all nodes");
    let start = Instant::now();
    let mut result = ResultSet::default();
    let mut continue_token: Option<String> = None;
    let mut page = 0u32;

    loop {
        page += 1;
        let request = PageRequest {
            host: host.map(String::from),
            limit: options.page_size,
            read_cache: options.read_cache && continue_token.is_none(),
            continue_token: continue_token.take(),
        };

        let response = api
            .list_instances(&request)
            .await
            .map_err(|e| e.at_page(page))?;

        let items_this_page = response.items.len();
        result.instances.reserve(items_this_page);
        for (index, item) in response.items.into_iter().enumerate() {
            result.instances.push(item.into_instance(page, index)?);
        }
        result.observe_snapshot(response.resource_version.as_deref());
        progress.page_fetched(host, page, items_this_page);

        // Check for more pages
        match response.continue_token {
            Some(token) if !token.is_empty() => {
                debug!(
                    scope = %scope,
                    page = page,
                    items_this_page = items_this_page,
                    total_so_far = result.len(),
                    "Fetched page, continuing"
                );
                continue_token = Some(token);
            }
            _ => break,
        }
    }

    debug!(
        scope = %scope,
        pages = page,
        pods = result.len(),
        snapshot = ?result.snapshot,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Listed pods"
    );

    Ok(result)
}
