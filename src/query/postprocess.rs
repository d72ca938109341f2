// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! DaemonSet filtering and output ordering

use std::cmp::Ordering;

use tracing::debug;

use super::model::ResultSet;
use super::pod::{DAEMONSET_KIND, WorkloadInstance};

/// Drop pods owned by a DaemonSet; returns how many were removed
pub fn filter_daemonset_pods(result: &mut ResultSet) -> usize {
    let before = result.len();
    result
        .instances
        .retain(|pod| !pod.is_owned_by(DAEMONSET_KIND));
    let removed = before - result.len();
    debug!(
        removed = removed,
        total = before,
        "filtered out {} DaemonSet pods out of {}",
        removed,
        before
    );
    removed
}

/// Order by node, then namespace, then name
pub fn cmp_instance(a: &WorkloadInstance, b: &WorkloadInstance) -> Ordering {
    a.node_name
        .cmp(&b.node_name)
        .then_with(|| a.namespace.cmp(&b.namespace))
        .then_with(|| a.name.cmp(&b.name))
}

pub fn postprocess(mut result: ResultSet, include_daemonsets: bool) -> ResultSet {
    if !include_daemonsets {
        filter_daemonset_pods(&mut result);
    }
    result.instances.sort_by(cmp_instance);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(instances: Vec<WorkloadInstance>) -> ResultSet {
        ResultSet {
            instances,
            snapshot: None,
        }
    }

    fn owned_pods() -> Vec<WorkloadInstance> {
        vec![
            WorkloadInstance::new("n1", "default", "p1"),
            WorkloadInstance::new("n1", "default", "p2").with_owner("ReplicaSet", "rs1"),
            WorkloadInstance::new("n1", "default", "p3")
                .with_owner("ReplicaSet", "rs1")
                .with_owner("DaemonSet", "ds1"),
        ]
    }

    #[test]
    fn test_filter_daemonset_pods() {
        let out = postprocess(result(owned_pods()), false);
        let names: Vec<_> = out.instances.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["p1", "p2"]);
    }

    #[test]
    fn test_include_daemonsets_keeps_everything() {
        let out = postprocess(result(owned_pods()), true);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let mut once = result(owned_pods());
        assert_eq!(filter_daemonset_pods(&mut once), 1);
        let mut twice = once.clone();
        assert_eq!(filter_daemonset_pods(&mut twice), 0);
        assert_eq!(once, twice);

        let again = postprocess(postprocess(result(owned_pods()), false), false);
        assert_eq!(again, postprocess(result(owned_pods()), false));
    }

    #[test]
    fn test_cmp_instance() {
        let n1_a_a = WorkloadInstance::new("node1", "a", "a");
        let n1_b_a = WorkloadInstance::new("node1", "b", "a");
        let n1_a_b = WorkloadInstance::new("node1", "a", "b");
        let n2_a_a = WorkloadInstance::new("node2", "a", "a");

        let mut v = vec![
            n2_a_a.clone(),
            n1_a_b.clone(),
            n1_b_a.clone(),
            n1_a_a.clone(),
        ];
        v.sort_by(cmp_instance);

        assert_eq!(v, vec![n1_a_a, n1_a_b, n1_b_a, n2_a_a]);
    }

    #[test]
    fn test_sort_keeps_snapshot() {
        let mut input = result(owned_pods());
        input.observe_snapshot(Some("42"));
        let out = postprocess(input, true);
        assert_eq!(out.snapshot.as_ref().map(|t| t.as_str()), Some("42"));
    }
}
