//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta métricas del servidor. Cada respuesta que escribe el pipeline
//! de conexión se registra acá, incluidas las de error (400, 404, 405...).

use crate::http::StatusCode;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Cantidad de latencias recientes que se guardan para los percentiles
const MAX_LATENCIES: usize = 10_000;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

struct MetricsData {
    total_requests: u64,

    /// Respuestas 2xx
    successful_requests: u64,

    error_requests: u64,

    /// Latencias recientes en microsegundos
    latencies: VecDeque<u64>,
}

/// Percentiles de latencia en microsegundos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencySummary {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
}

/// Foto de las métricas, tal como la sirve `GET /metrics`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub error_requests: u64,
    pub uptime_seconds: u64,
    /// Porcentaje de respuestas 2xx, redondeado a dos decimales
    pub success_rate: f64,
    pub latency_us: LatencySummary,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData {
                total_requests: 0,
                successful_requests: 0,
                error_requests: 0,
                latencies: VecDeque::with_capacity(MAX_LATENCIES),
            })),
            start_time: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra una respuesta enviada
    pub fn record_request(&self, status: StatusCode, latency: Duration) {
        let mut data = self.lock();

        data.total_requests += 1;
        if status.is_success() {
            data.successful_requests += 1;
        } else {
            data.error_requests += 1;
        }

        if data.latencies.len() >= MAX_LATENCIES {
            data.latencies.pop_front();
        }
        data.latencies
            .push_back(u64::try_from(latency.as_micros()).unwrap_or(u64::MAX));
    }

    /// Segundos desde que se creó el collector
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.lock();

        let success_rate = if data.total_requests == 0 {
            0.0
        } else {
            let rate = data.successful_requests as f64 * 100.0 / data.total_requests as f64;
            (rate * 100.0).round() / 100.0
        };

        MetricsSnapshot {
            total_requests: data.total_requests,
            successful_requests: data.successful_requests,
            error_requests: data.error_requests,
            uptime_seconds: self.uptime_secs(),
            success_rate,
            latency_us: summarize(&data.latencies),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn summarize(latencies: &VecDeque<u64>) -> LatencySummary {
    if latencies.is_empty() {
        return LatencySummary { p50: 0, p95: 0, p99: 0 };
    }

    let mut sorted: Vec<u64> = latencies.iter().copied().collect();
    sorted.sort_unstable();

    let percentile = |p: usize| {
        let idx = (sorted.len() * p / 100).min(sorted.len() - 1);
        sorted[idx]
    };

    LatencySummary {
        p50: percentile(50),
        p95: percentile(95),
        p99: percentile(99),
    }
}
