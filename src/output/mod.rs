mod json;
mod table;
mod yaml;

pub use json::JsonFormatter;
pub use table::{TableFormatter, human_duration};
pub use yaml::YamlFormatter;

use std::borrow::Cow;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::query::{ResultSet, WorkloadInstance};

const NAME_UNSUPPORTED: &str =
    "output format 'name' is not supported since it doesn't include the pod namespace";

/// Pods laid out as table rows
#[derive(Debug, Clone)]
pub struct PodTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl PodTable {
    /// NODE, NAMESPACE, NAME, PHASE, AGE and, when `wide`, IP
    pub fn from_pods(pods: &[WorkloadInstance], wide: bool, now: DateTime<Utc>) -> Self {
        let mut columns = vec!["NODE", "NAMESPACE", "NAME", "PHASE", "AGE"];
        if wide {
            columns.push("IP");
        }

        let rows = pods
            .iter()
            .map(|pod| {
                let age = pod
                    .creation_timestamp
                    .map(|created| human_duration(now - created))
                    .unwrap_or_else(|| "<unknown>".to_string());
                let mut row = vec![
                    pod.node_name.clone(),
                    pod.namespace.clone(),
                    pod.name.clone(),
                    pod.phase.clone().unwrap_or_default(),
                    age,
                ];
                if wide {
                    row.push(pod.pod_ip.clone().unwrap_or_else(|| "<none>".to_string()));
                }
                row
            })
            .collect();

        Self {
            columns: columns.into_iter().map(String::from).collect(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `v1 List` of Pod manifests, as `kubectl get pods -o json` prints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodList<'a> {
    api_version: &'static str,
    kind: &'static str,
    metadata: ListMeta<'a>,
    items: Vec<Cow<'a, serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListMeta<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_version: Option<&'a str>,
}

impl<'a> PodList<'a> {
    pub fn new(result: &'a ResultSet) -> Self {
        Self {
            api_version: "v1",
            kind: "List",
            metadata: ListMeta {
                resource_version: result.snapshot.as_ref().map(|t| t.as_str()),
            },
            items: result
                .instances
                .iter()
                .map(WorkloadInstance::to_manifest)
                .collect(),
        }
    }
}

/// Reject formats that cannot show a pod unambiguously
pub fn ensure_supported(format: &OutputFormat) -> Result<()> {
    if *format == OutputFormat::Name {
        bail!(NAME_UNSUPPORTED);
    }
    Ok(())
}

/// Render a result; None when there is nothing to print to stdout
pub fn render(result: &ResultSet, format: &OutputFormat, no_headers: bool) -> Result<Option<String>> {
    let now = Utc::now();
    match format {
        OutputFormat::Table | OutputFormat::Wide => {
            let table = PodTable::from_pods(&result.instances, *format == OutputFormat::Wide, now);
            if table.is_empty() {
                return Ok(None);
            }
            Ok(Some(TableFormatter::format(&table, no_headers)))
        }
        OutputFormat::Json => JsonFormatter::format(&PodList::new(result)).map(Some),
        OutputFormat::Yaml => YamlFormatter::format(&PodList::new(result)).map(Some),
        OutputFormat::Name => bail!(NAME_UNSUPPORTED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pods(now: DateTime<Utc>) -> Vec<WorkloadInstance> {
        let mut a = WorkloadInstance::new("node-1", "default", "web-0");
        a.phase = Some("Running".to_string());
        a.pod_ip = Some("10.0.0.7".to_string());
        a.creation_timestamp = Some(now - Duration::minutes(12));
        let b = WorkloadInstance::new("node-2", "kube-system", "dns-0");
        vec![a, b]
    }

    #[test]
    fn test_pod_table_columns() {
        let now = Utc::now();
        let table = PodTable::from_pods(&pods(now), false, now);
        assert_eq!(table.columns, vec!["NODE", "NAMESPACE", "NAME", "PHASE", "AGE"]);
        assert_eq!(table.rows[0], vec!["node-1", "default", "web-0", "Running", "12m"]);
        assert_eq!(table.rows[1][3], "");
        assert_eq!(table.rows[1][4], "<unknown>");
    }

    #[test]
    fn test_wide_adds_ip() {
        let now = Utc::now();
        let table = PodTable::from_pods(&pods(now), true, now);
        assert_eq!(table.columns.last().map(String::as_str), Some("IP"));
        assert_eq!(table.rows[0][5], "10.0.0.7");
        assert_eq!(table.rows[1][5], "<none>");
    }

    #[test]
    fn test_empty_table_renders_nothing() {
        let rendered = render(&ResultSet::default(), &OutputFormat::Table, false).unwrap();
        assert!(rendered.is_none());
    }

    #[test]
    fn test_empty_json_is_empty_list() {
        let rendered = render(&ResultSet::default(), &OutputFormat::Json, false)
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["kind"], "List");
        assert_eq!(value["items"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn test_ensure_supported() {
        assert!(ensure_supported(&OutputFormat::Wide).is_ok());
        assert!(ensure_supported(&OutputFormat::Name).is_err());
    }

    #[test]
    fn test_name_format_rejected() {
        let err = render(&ResultSet::default(), &OutputFormat::Name, false).unwrap_err();
        assert!(err.to_string().contains("namespace"));
    }
}
