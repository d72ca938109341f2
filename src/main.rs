// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::prelude::*;

use pods_on::cli::{Args, parse_targets};
use pods_on::config::Config;
use pods_on::kubernetes::KubeClusterApi;
use pods_on::output;
use pods_on::progress::{ProgressReporter, ProgressUpdate, create_progress_handle, create_spinner};
use pods_on::query::PodQuery;

/// Initialize logging to stderr
///
/// -v maps to info, -vv to debug and -vvv or more to trace. RUST_LOG wins
/// over the flag when set.
fn init_logging(verbosity: u8) {
    use tracing_subscriber::fmt::format::FmtSpan;

    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("warn,pods_on={}", level)));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (aws-lc-rs)
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let args = Args::parse();
    init_logging(args.verbose);

    // Everything that can be rejected locally is rejected before connecting
    let targets = parse_targets(&args.targets)?;
    let config = Config::load()?;
    let options = args.query_options(&config)?;
    output::ensure_supported(&args.output)?;

    let api = KubeClusterApi::connect(&args.client_settings(&config)).await?;
    debug!(context = %api.context(), "Connected");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let progress = create_progress_handle();
    let query = PodQuery::new(&api, Arc::clone(&progress), cancel);
    let run = query.run(&targets, &options);

    let result = if console::Term::stderr().is_term() {
        with_spinner(run, &progress).await
    } else {
        run.await
    }
    .context("Failed to list pods")?;

    match output::render(&result, &args.output, args.no_headers)? {
        Some(rendered) => println!("{}", rendered),
        None => eprintln!("No resources found."),
    }
    Ok(())
}

/// Drive `fut` while showing engine progress on a spinner
async fn with_spinner<T>(fut: impl Future<Output = T>, progress: &ProgressReporter) -> T {
    let spinner = create_spinner("Resolving nodes...");
    let mut progress_rx = progress.subscribe();
    let mut fut = Box::pin(fut);

    let result = loop {
        tokio::select! {
            biased;
            update = progress_rx.recv() => {
                match update {
                    Ok(ProgressUpdate::ResolvingHosts { selectors }) => {
                        spinner.set_message(format!("Matching {} node selector(s)...", selectors));
                    }
                    Ok(ProgressUpdate::HostsResolved { matched, total, .. }) => {
                        spinner.set_message(format!("{} of {} nodes matched", matched, total));
                    }
                    Ok(ProgressUpdate::StartingQuery { strategy, host_count }) => {
                        spinner.set_message(format!("Listing pods on {} nodes ({})...", host_count, strategy));
                    }
                    Ok(ProgressUpdate::PageFetched { host: None, page, .. }) => {
                        spinner.set_message(format!("Listing all pods, page {}...", page));
                    }
                    Ok(ProgressUpdate::HostComplete { .. }) => {
                        let (done, total) = progress.progress();
                        spinner.set_message(format!("Listing pods: {}/{} nodes done", done, total));
                    }
                    Ok(_) => {}
                    // Lagged or closed: keep waiting on the query itself
                    Err(_) => {}
                }
            }
            result = &mut fut => {
                break result;
            }
        }
    };

    spinner.finish_and_clear();
    result
}
