// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Error type for the pod acquisition engine

use thiserror::Error;

/// Boxed transport error, so fakes and the kube client can both report failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid node selector {input:?}: {reason}")]
    PredicateSyntax { input: String, reason: String },

    #[error("failed to {operation}: {source}")]
    Transport {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to decode pod in page {page}, item {index}: {source}")]
    Decode {
        page: u32,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected object type in page {page}, item {index}: {kind} (expected Pod)")]
    UnexpectedType { page: u32, index: usize, kind: String },

    #[error("unknown pod query strategy {0:?} (expected \"by-node\" or \"all-pods\")")]
    UnknownStrategy(String),

    #[error("failed to list pods on node {host:?}: {source}")]
    Host {
        host: String,
        #[source]
        source: Box<QueryError>,
    },

    #[error("query cancelled")]
    Cancelled,
}

impl QueryError {
    pub fn predicate(input: &str, reason: impl Into<String>) -> Self {
        QueryError::PredicateSyntax {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub fn transport(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        QueryError::Transport {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Annotate a per-node failure with the node it happened on
    pub fn on_host(host: &str, source: QueryError) -> Self {
        QueryError::Host {
            host: host.to_string(),
            source: Box::new(source),
        }
    }

    /// Add the page number to a transport failure
    pub fn at_page(self, page: u32) -> Self {
        match self {
            QueryError::Transport { operation, source } => QueryError::Transport {
                operation: format!("{} (page {})", operation, page),
                source,
            },
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            QueryError::Cancelled => true,
            QueryError::Host { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_annotation_message() {
        let inner = QueryError::transport("list pods (page 2)", "connection reset");
        let err = QueryError::on_host("node-7", inner);
        let msg = err.to_string();
        assert!(msg.contains("node-7"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_at_page_annotates_transport_errors_only() {
        let err = QueryError::transport("list pods", "timeout").at_page(4);
        assert!(err.to_string().contains("list pods (page 4)"));

        let err = QueryError::Cancelled.at_page(4);
        assert!(matches!(err, QueryError::Cancelled));
    }

    #[test]
    fn test_is_cancelled_through_annotation() {
        assert!(QueryError::Cancelled.is_cancelled());
        assert!(QueryError::on_host("n1", QueryError::Cancelled).is_cancelled());
        assert!(!QueryError::UnknownStrategy("x".into()).is_cancelled());
    }

    #[test]
    fn test_unknown_strategy_message() {
        let err = QueryError::UnknownStrategy("fastest".to_string());
        assert!(err.to_string().contains("fastest"));
        assert!(err.to_string().contains("by-node"));
    }
}
