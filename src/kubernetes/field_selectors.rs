// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Kubernetes field selectors
//!
//! Per-node pod queries are narrowed on the server with a field selector on
//! `spec.nodeName`.
//!
//! ## Field Selector Basics
//!
//! - Field selectors use dot notation: `spec.nodeName=node-1`
//! - Only equality is pushed down by this tool
//! - `\`, `,` and `=` inside a value must be escaped with a backslash
//!
//! See https://kubernetes.io/docs/concepts/overview/working-with-objects/field-selectors/

/// Field holding the node a pod is scheduled on
pub const NODE_NAME_FIELD: &str = "spec.nodeName";

/// A single `path=value` field selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    /// Field path in Kubernetes notation (e.g., "spec.nodeName")
    pub path: String,
    /// Value to match
    pub value: String,
}

impl FieldSelector {
    /// Selector matching pods scheduled on `node`
    pub fn node_name(node: &str) -> Self {
        Self {
            path: NODE_NAME_FIELD.to_string(),
            value: node.to_string(),
        }
    }

    /// Convert to Kubernetes field selector string format
    ///
    /// `FieldSelector { path: "spec.nodeName", value: "node-1" }` becomes
    /// `"spec.nodeName=node-1"`.
    pub fn to_k8s_string(&self) -> String {
        format!("{}={}", self.path, escape_value(&self.value))
    }
}

/// Escape a field selector value the way the API server's parser expects
fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ',' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
