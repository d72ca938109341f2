use anyhow::{Context, Result};

use super::PodList;

pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format(list: &PodList<'_>) -> Result<String> {
        serde_json::to_string_pretty(list).context("Failed to serialize pods as JSON")
    }
}
