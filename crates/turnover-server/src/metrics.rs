// SPDX-License-Identifier: Apache-2.0

use axum::http::StatusCode;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// In-process request counters and latency samples, rendered as plain text
/// by the `/metrics` endpoint.
#[derive(Default)]
pub(crate) struct RequestMetrics {
    counts: Mutex<HashMap<(String, u16), u64>>,
    latency_ns: Mutex<HashMap<String, Vec<u64>>>,
}

impl RequestMetrics {
    pub(crate) async fn observe_request(&self, route: &str, status: StatusCode, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts
            .entry((route.to_string(), status.as_u16()))
            .or_insert(0) += 1;
        drop(counts);
        let mut latency_map = self.latency_ns.lock().await;
        latency_map
            .entry(route.to_string())
            .or_default()
            .push(latency.as_nanos().min(u128::from(u64::MAX)) as u64);
    }

    pub(crate) async fn render_text(&self) -> String {
        let mut out = String::new();
        let counts = self.counts.lock().await;
        let mut keys: Vec<&(String, u16)> = counts.keys().collect();
        keys.sort();
        for key in keys {
            let (route, status) = key;
            out.push_str(&format!(
                "http_requests_total{{route=\"{route}\",status=\"{status}\"}} {}\n",
                counts[key]
            ));
        }
        drop(counts);
        let latency = self.latency_ns.lock().await;
        let mut routes: Vec<&String> = latency.keys().collect();
        routes.sort();
        for route in routes {
            let samples = &latency[route];
            let sum: u128 = samples.iter().map(|v| u128::from(*v)).sum();
            out.push_str(&format!(
                "http_request_latency_ns_count{{route=\"{route}\"}} {}\n",
                samples.len()
            ));
            out.push_str(&format!(
                "http_request_latency_ns_sum{{route=\"{route}\"}} {sum}\n"
            ));
        }
        out
    }
}
