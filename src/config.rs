// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! User defaults for pods-on
//!
//! Read from ~/.pods-on/config.json when present. Every field is optional;
//! command line flags and environment variables take precedence.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the base pods-on directory (~/.pods-on/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".pods-on"))
        .context("Could not determine home directory")
}

/// pods-on configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Concurrent per-node queries
    #[serde(default)]
    pub workers: Option<usize>,
    /// Pod list page size
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub read_cache: Option<bool>,
    #[serde(default)]
    pub include_daemonsets: Option<bool>,
    /// Kubeconfig context used when --context is not given
    #[serde(default)]
    pub context: Option<String>,
}

impl Config {
    /// Load config from disk, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Get the config file path (~/.pods-on/config.json)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.json"))
    }
}
