//! Query metrics and tracing helpers.
//!
//! `METRICS` (feature `metrics`) owns a Prometheus registry fed by an
//! OpenTelemetry meter provider. `tracing_helpers` (feature `tracing`) builds the
//! spans opened around connection setup and every statement.

#[cfg(feature = "metrics")]
pub use prometheus_metrics::*;

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::time::Duration;

    pub static METRICS: Lazy<StockroomMetrics> = Lazy::new(StockroomMetrics::init);

    pub struct StockroomMetrics {
        pub registry: Registry,
        // Kept alive so instruments keep exporting.
        _provider: Option<SdkMeterProvider>,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub connect_duration: Histogram<f64>,
    }

    impl StockroomMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let provider = match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => Some(SdkMeterProvider::builder().with_reader(exporter).build()),
                Err(e) => {
                    log::warn!("prometheus exporter unavailable, metrics disabled: {e}");
                    None
                }
            };
            let meter = match &provider {
                Some(provider) => provider.meter("stockroom"),
                None => opentelemetry::global::meter("stockroom"),
            };

            let queries_total = meter
                .u64_counter("stockroom_queries_total")
                .with_description("Total statements executed")
                .build();

            let query_errors_total = meter
                .u64_counter("stockroom_query_errors_total")
                .with_description("Statements that failed in the backend")
                .build();

            let query_duration = meter
                .f64_histogram("stockroom_query_duration_seconds")
                .with_description("Duration of statements")
                .build();

            let connect_duration = meter
                .f64_histogram("stockroom_connect_duration_seconds")
                .with_description("Time spent establishing backend connections")
                .build();

            Self {
                registry,
                _provider: provider,
                queries_total,
                query_errors_total,
                query_duration,
                connect_duration,
            }
        }

        pub fn record_query_duration(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_connection_wait(&self, elapsed: Duration) {
            self.connect_duration.record(elapsed.as_secs_f64(), &[]);
        }

        /// Prometheus text exposition of everything recorded so far.
        pub fn render(&self) -> Result<String, prometheus::Error> {
            let mut buffer = Vec::new();
            TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
            Ok(String::from_utf8_lossy(&buffer).into_owned())
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    /// Span around one statement; only the leading keyword is recorded so that
    /// values never reach the logs.
    pub fn execute_query_span(query: &str) -> Span {
        let operation = query
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        info_span!("db.query", db.system = "postgresql", db.operation = %operation)
    }

    pub fn acquire_connection_span() -> Span {
        info_span!("db.connect", db.system = "postgresql")
    }
}
