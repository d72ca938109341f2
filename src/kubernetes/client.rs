// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! `ClusterApi` implementation backed by kube-rs

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};
use tracing::{debug, trace};

use super::rate_limit::RequestBudget;
use super::{ClusterApi, InstancePage, PageRequest};
use crate::query::{Host, InstancePayload, QueryError};

/// Timeout for connecting to K8s API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for reading K8s API responses
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// How to reach the cluster
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    /// Kubeconfig context; the current context when unset
    pub context: Option<String>,
    /// Kubeconfig file; `$KUBECONFIG` or `~/.kube/config` when unset
    pub kubeconfig: Option<PathBuf>,
    /// Query concurrency, used to size the request budget
    pub workers: usize,
}

pub struct KubeClusterApi {
    client: Client,
    context: String,
    pods: ApiResource,
    budget: RequestBudget,
}

impl KubeClusterApi {
    /// Load kubeconfig and build a client for the selected context
    pub async fn connect(settings: &ClientSettings) -> Result<Self> {
        let kubeconfig = match &settings.kubeconfig {
            Some(path) => Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?,
            None => Kubeconfig::read().context("Failed to read kubeconfig")?,
        };

        let context_name = settings
            .context
            .clone()
            .or_else(|| kubeconfig.current_context.clone())
            .ok_or_else(|| anyhow!("No context specified and no current context in kubeconfig"))?;

        // Verify context exists
        if !kubeconfig.contexts.iter().any(|c| c.name == context_name) {
            return Err(anyhow!(
                "Context '{}' not found in kubeconfig",
                context_name
            ));
        }

        let start = Instant::now();
        let mut config = Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: Some(context_name.clone()),
                ..Default::default()
            },
        )
        .await
        .with_context(|| format!("Failed to load kubeconfig for context '{}'", context_name))?;

        // Set timeouts for reliability
        config.connect_timeout = Some(CONNECT_TIMEOUT);
        config.read_timeout = Some(READ_TIMEOUT);

        let client = Client::try_from(config)
            .with_context(|| format!("Failed to create client for context '{}'", context_name))?;

        let budget = RequestBudget::for_workers(settings.workers);
        debug!(
            context = %context_name,
            qps = budget.qps(),
            burst = budget.burst(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Created Kubernetes client"
        );

        Ok(Self::new(client, context_name, budget))
    }

    pub fn new(client: Client, context: String, budget: RequestBudget) -> Self {
        Self {
            client,
            context,
            pods: ApiResource::erase::<Pod>(&()),
            budget,
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    fn build_list_params(request: &PageRequest) -> ListParams {
        let mut params = ListParams::default().limit(request.limit);

        if let Some(field_sel) = request.field_selector() {
            params = params.fields(&field_sel);
        }

        // The watch cache hint only applies to the first page: a continue
        // token already pins the snapshot the server paginates over.
        match &request.continue_token {
            Some(token) => params = params.continue_token(token),
            None if request.read_cache => params = params.match_any(),
            None => {}
        }

        trace!(
            field_selector = ?params.field_selector,
            limit = ?params.limit,
            has_continue = request.continue_token.is_some(),
            read_cache = request.read_cache,
            "Built ListParams"
        );

        params
    }
}

/// Turn a list item into a raw payload, restoring apiVersion and kind
/// (list responses omit them per item)
fn to_payload(
    item: DynamicObject,
    api_resource: &ApiResource,
) -> Result<InstancePayload, QueryError> {
    let mut value = serde_json::to_value(item)
        .map_err(|e| QueryError::transport("encode pod list item", e))?;
    if let serde_json::Value::Object(ref mut map) = value {
        map.entry("apiVersion")
            .or_insert_with(|| serde_json::Value::String(api_resource.api_version.clone()));
        map.entry("kind")
            .or_insert_with(|| serde_json::Value::String(api_resource.kind.clone()));
    }
    Ok(InstancePayload::Raw(value))
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_hosts(&self) -> Result<Vec<Host>, QueryError> {
        self.budget.acquire().await;
        let start = Instant::now();

        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes
            .list(&ListParams::default())
            .await
            .map_err(|e| QueryError::transport("list nodes in the cluster", e))?;

        debug!(
            context = %self.context,
            nodes = list.items.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Listed nodes"
        );

        Ok(list
            .items
            .into_iter()
            .map(|node| Host {
                name: node.metadata.name.unwrap_or_default(),
                labels: node.metadata.labels.unwrap_or_default(),
            })
            .collect())
    }

    async fn list_instances(&self, request: &PageRequest) -> Result<InstancePage, QueryError> {
        self.budget.acquire().await;
        let start = Instant::now();

        let params = Self::build_list_params(request);
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &self.pods);
        let list = api.list(&params).await.map_err(|e| {
            let operation = match &request.host {
                Some(host) => format!("list pods on node {:?} from kubernetes api", host),
                None => "list pods from kubernetes api".to_string(),
            };
            QueryError::transport(operation, e)
        })?;

        debug!(
            context = %self.context,
            node = ?request.host,
            items = list.items.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Listed pods"
        );

        let items = list
            .items
            .into_iter()
            .map(|item| to_payload(item, &self.pods))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InstancePage {
            items,
            resource_version: list.metadata.resource_version,
            continue_token: list.metadata.continue_,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod_resource() -> ApiResource {
        ApiResource::erase::<Pod>(&())
    }

    #[test]
    fn test_list_params_first_page() {
        let params = KubeClusterApi::build_list_params(&PageRequest {
            host: Some("node-1".to_string()),
            limit: 500,
            continue_token: None,
            read_cache: false,
        });
        assert_eq!(params.limit, Some(500));
        assert_eq!(params.field_selector.as_deref(), Some("spec.nodeName=node-1"));
        assert!(params.continue_token.is_none());
        assert!(params.resource_version.is_none());
    }

    #[test]
    fn test_list_params_read_cache_on_first_page_only() {
        let first = KubeClusterApi::build_list_params(&PageRequest {
            limit: 500,
            read_cache: true,
            ..Default::default()
        });
        assert_eq!(first.resource_version.as_deref(), Some("0"));

        let next = KubeClusterApi::build_list_params(&PageRequest {
            limit: 500,
            read_cache: true,
            continue_token: Some("abc".to_string()),
            ..Default::default()
        });
        assert_eq!(next.continue_token.as_deref(), Some("abc"));
        assert!(next.resource_version.is_none());
    }

    #[test]
    fn test_payload_injects_type_meta() {
        let mut obj = DynamicObject::new("web-1", &pod_resource()).data(json!({
            "spec": {"nodeName": "node-1"}
        }));
        obj.types = None;
        obj.metadata.namespace = Some("shop".to_string());

        let InstancePayload::Raw(value) = to_payload(obj, &pod_resource()).unwrap() else {
            panic!("expected raw payload");
        };
        assert_eq!(value["apiVersion"], "v1");
        assert_eq!(value["kind"], "Pod");
        assert_eq!(value["metadata"]["name"], "web-1");

        let pod = InstancePayload::Raw(value).into_instance(1, 0).unwrap();
        assert_eq!(pod.node_name, "node-1");
        assert_eq!(pod.namespace, "shop");
    }

    #[test]
    fn test_payload_encode_failure_is_reported() {
        // flattened object data must be a map
        let obj = DynamicObject::new("web-1", &pod_resource()).data(json!("not-a-map"));

        let err = to_payload(obj, &pod_resource()).unwrap_err();
        assert!(matches!(err, QueryError::Transport { .. }), "{err:?}");
        assert!(err.to_string().contains("encode pod list item"));
    }
}
