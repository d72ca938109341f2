use anyhow::{Context, Result};

use super::PodList;

pub struct YamlFormatter;

impl YamlFormatter {
    pub fn format(list: &PodList<'_>) -> Result<String> {
        serde_yaml::to_string(list).context("Failed to serialize pods as YAML")
    }
}
