use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and describe the series emitted by
    /// the API handlers (so they show up on /metrics with help text).
    pub fn init() -> Self {
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        ensure_metrics_described();

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("catalog_requests_total", "GET /features requests served.");
        describe_counter!("predict_requests_total", "POST /predict requests received.");
        describe_counter!(
            "predict_empty_selection_total",
            "Predictions rejected because the selection was empty."
        );
        describe_counter!(
            "predict_no_signal_total",
            "Predictions rejected because no country accumulated positive weight."
        );
        describe_counter!(
            "predict_unknown_feature_total",
            "Selected feature ids that were not in the knowledge base (ignored)."
        );
        describe_histogram!("predict_latency_ms", "Prediction time in milliseconds.");
    });
}
