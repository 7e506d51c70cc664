use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::claims::DataSource;

#[derive(Clone)]
pub struct ClaimsMetrics {
    registry: Registry,
    staged: IntCounterVec,
    issued: IntCounterVec,
}

impl ClaimsMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let staged = IntCounterVec::new(
            Opts::new("claims_staged_total", "Stage requests grouped by result"),
            &["result"],
        )?;
        let issued = IntCounterVec::new(
            Opts::new(
                "claims_issued_total",
                "Claims responses grouped by data source",
            ),
            &["data_source"],
        )?;
        registry.register(Box::new(staged.clone()))?;
        registry.register(Box::new(issued.clone()))?;
        Ok(Self {
            registry,
            staged,
            issued,
        })
    }

    pub fn record_stage(&self, stored: bool) {
        let result = if stored { "stored" } else { "failed" };
        self.staged.with_label_values(&[result]).inc();
    }

    pub fn record_issued(&self, source: DataSource) {
        let label = match source {
            DataSource::Frontend => "frontend",
            DataSource::Default => "default",
        };
        self.issued.with_label_values(&[label]).inc();
    }

    pub fn render(&self) -> Result<Response> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )
            .body(Body::from(buffer))?;
        Ok(response)
    }
}
