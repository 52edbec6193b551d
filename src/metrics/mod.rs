//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Contadores de requests (totales, 2xx, errores), uptime y percentiles de
//! latencia. Lo consume el endpoint `GET /metrics`.

pub mod collector;

pub use collector::{LatencySummary, MetricsCollector, MetricsSnapshot};
