// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Pod query engine
//!
//! Finds the pods running on a set of nodes, named explicitly or picked by
//! label selectors, using whichever of two list strategies suits the share of
//! the cluster being targeted.

mod engine;
mod error;
mod model;
mod pod;
mod postprocess;
mod resolver;
mod scan;
mod scatter;
mod selector;
mod strategy;

#[cfg(test)]
pub mod testing;

pub use engine::{DEFAULT_WORKERS, PodQuery, QueryOptions, QueryPlan, QueryTargets};
pub use error::{BoxError, QueryError};
pub use model::{Host, ResultSet, SnapshotToken};
pub use pod::{DAEMONSET_KIND, InstancePayload, OwnerRef, POD_KIND, WorkloadInstance};
pub use postprocess::{cmp_instance, filter_daemonset_pods, postprocess};
pub use resolver::{ResolvedHosts, resolve_hosts};
pub use scan::{DEFAULT_PAGE_SIZE, ScanOptions, scan_instances};
pub use scatter::scatter_gather;
pub use selector::LabelSelector;
pub use strategy::{Strategy, choose_strategy};
