//! # Endpoints Operacionales
//! src/handlers/ops.rs
//!
//! `GET /health` y `GET /metrics`.

use crate::http::{Response, StatusCode};
use crate::metrics::MetricsCollector;
use chrono::Local;
use serde_json::json;

#[derive(Clone)]
pub struct OpsEndpoints {
    metrics: MetricsCollector,
}

impl OpsEndpoints {
    pub fn new(metrics: MetricsCollector) -> Self {
        Self { metrics }
    }

    /// `{"status": "healthy", "uptime": <segundos>, "timestamp": <RFC 3339>}`
    pub fn health(&self) -> Response {
        Response::json(
            StatusCode::Ok,
            &json!({
                "status": "healthy",
                "uptime": self.metrics.uptime_secs(),
                "timestamp": Local::now().to_rfc3339(),
            }),
        )
    }

    pub fn metrics(&self) -> Response {
        Response::json(StatusCode::Ok, &self.metrics.snapshot())
    }
}
