use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and publish the cache TTL.
    /// Fails if a recorder is already installed in this process.
    pub fn init(cache_ttl_secs: u64) -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;

        describe_counter!("district_cache_hits_total", "District averages served from cache.");
        describe_counter!("district_cache_misses_total", "District averages recomputed.");
        describe_counter!(
            "district_cache_entries_swept_total",
            "Expired cache entries removed by the periodic sweep."
        );
        describe_counter!(
            "district_school_fetch_failures_total",
            "Per-school meal lookups absorbed as zero contribution."
        );
        describe_histogram!("district_aggregation_ms", "Uncached aggregation time in milliseconds.");
        describe_counter!("upstream_requests_total", "Calls made to the NEIS hub.");
        describe_counter!("upstream_errors_total", "Failed calls to the NEIS hub.");
        describe_gauge!("district_cache_ttl_secs", "Configured district cache TTL.");

        gauge!("district_cache_ttl_secs").set(cache_ttl_secs as f64);

        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
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
