// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::Config;
use crate::kubernetes::ClientSettings;
use crate::query::{
    DEFAULT_PAGE_SIZE, DEFAULT_WORKERS, QueryError, QueryOptions, ScanOptions, Strategy,
};

#[derive(Parser, Debug)]
#[command(name = "kubectl-pods_on")]
#[command(
    author,
    version,
    about = "List pods running on nodes picked by name or label selector",
    after_help = "Examples:\n  kubectl pods-on node-1 node-2\n  kubectl pods-on \"tier=web\" \"zone in (a,b)\"\n  kubectl pods-on -o wide \"node.kubernetes.io/instance-type=m5.large\""
)]
pub struct Args {
    /// Node names or node label selectors
    #[arg(value_name = "NODE_OR_SELECTOR")]
    pub targets: Vec<String>,

    /// Include pods owned by DaemonSets
    #[arg(short = 'D', long)]
    pub include_daemonsets: bool,

    /// Number of nodes queried in parallel [default: 20]
    #[arg(long, env = "PODS_ON_WORKERS", value_parser = parse_positive::<usize>)]
    pub workers: Option<usize>,

    /// Force a query strategy: by-node or all-pods
    #[arg(long, env = "PODS_ON_STRATEGY", value_name = "STRATEGY")]
    pub strategy: Option<String>,

    /// Allow the API server to answer the first page from its watch cache
    #[arg(long)]
    pub read_cache: bool,

    /// Pods per list page [default: 500]
    #[arg(long, value_parser = parse_positive::<u32>)]
    pub page_size: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Omit column headers in table output
    #[arg(long)]
    pub no_headers: bool,

    /// Kubeconfig context to use
    #[arg(long, value_name = "CONTEXT")]
    pub context: Option<String>,

    /// Path to the kubeconfig file
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Log verbosity, repeat for more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Wide,
    Json,
    Yaml,
    /// Not supported: names alone do not say which namespace a pod is in
    Name,
}

fn parse_positive<T>(s: &str) -> Result<T, String>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match s.parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(format!("expected a positive integer, got {:?}", s)),
    }
}

impl Args {
    /// Engine options: flags and environment first, then the config file
    pub fn query_options(&self, config: &Config) -> Result<QueryOptions, QueryError> {
        let strategy = self
            .strategy
            .as_deref()
            .map(str::parse::<Strategy>)
            .transpose()?;

        Ok(QueryOptions {
            workers: self.workers(config),
            strategy,
            include_daemonsets: self.include_daemonsets
                || config.include_daemonsets.unwrap_or(false),
            scan: ScanOptions {
                page_size: self
                    .page_size
                    .or(config.page_size)
                    .unwrap_or(DEFAULT_PAGE_SIZE)
                    .max(1),
                read_cache: self.read_cache || config.read_cache.unwrap_or(false),
            },
        })
    }

    pub fn client_settings(&self, config: &Config) -> ClientSettings {
        ClientSettings {
            context: self.context.clone().or_else(|| config.context.clone()),
            kubeconfig: self.kubeconfig.clone(),
            workers: self.workers(config),
        }
    }

    fn workers(&self, config: &Config) -> usize {
        self.workers
            .or(config.workers)
            .unwrap_or(DEFAULT_WORKERS)
            .max(1)
    }
}
