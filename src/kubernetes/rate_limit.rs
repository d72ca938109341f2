// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Client-side request budget
//!
//! A token bucket shared by every request of one invocation. Per-node queries
//! scale the budget with the worker count so raising `--workers` speeds the
//! query up without letting it flood the API server.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Requests per second granted per worker
const QPS_PER_WORKER: f64 = 3.0;

/// Burst size as a multiple of QPS
const BURST_FACTOR: f64 = 3.0;

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

pub struct RequestBudget {
    qps: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl RequestBudget {
    pub fn new(qps: f64, burst: f64) -> Self {
        let qps = qps.max(f64::MIN_POSITIVE);
        let burst = burst.max(1.0);
        Self {
            qps,
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                refilled_at: Instant::now(),
            }),
        }
    }

    /// Budget for `workers` concurrent queries: 3 QPS per worker, burst 3x QPS
    pub fn for_workers(workers: usize) -> Self {
        let qps = workers.max(1) as f64 * QPS_PER_WORKER;
        Self::new(qps, qps * BURST_FACTOR)
    }

    pub fn qps(&self) -> f64 {
        self.qps
    }

    pub fn burst(&self) -> f64 {
        self.burst
    }

    /// Wait until a request may be sent
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.qps).min(self.burst);
                bucket.refilled_at = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.qps)
            };
            tokio::time::sleep(wait).await;
        }
    }
}
