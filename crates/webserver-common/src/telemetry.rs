//! Logging and trace export for the operator process
//!
//! One call to [`init_telemetry`] installs the global subscriber:
//! an `EnvFilter` (`RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`]), a fmt
//! layer in JSON or text, and an OTLP span exporter when an endpoint is set.
//! Spans carry the pod, namespace and node from the downward API so traces
//! can be matched to the replica that produced them.

use std::str::FromStr;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str =
    "info,webserver_controller=debug,webserver_operator=debug,kube=info,tower=warn,hyper=warn";

/// Downward API variables mapped to their OpenTelemetry resource keys
const K8S_RESOURCE_ENV: [(&str, &str); 3] = [
    ("POD_NAME", "k8s.pod.name"),
    ("POD_NAMESPACE", "k8s.namespace.name"),
    ("NODE_NAME", "k8s.node.name"),
];

/// Errors raised while installing telemetry
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The OTLP exporter could not be built
    #[error("failed to build OTLP exporter for {endpoint}: {message}")]
    Exporter {
        /// Endpoint the exporter was pointed at
        endpoint: String,
        /// Underlying exporter error
        message: String,
    },

    /// A global subscriber was already installed
    #[error("failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    /// Unknown log format name
    #[error("unknown log format '{0}', expected 'json' or 'text'")]
    LogFormat(String),
}

/// How log lines are rendered on stdout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, with the current span's fields
    #[default]
    Json,
    /// Human-readable lines, for running against a local cluster
    Text,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "pretty" => Ok(LogFormat::Text),
            other => Err(TelemetryError::LogFormat(other.to_string())),
        }
    }
}

/// Settings for [`init_telemetry`]
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `service.name` reported on exported spans
    pub service_name: String,
    /// OTLP gRPC endpoint (e.g. "http://otel-collector:4317"); `None` keeps spans local
    pub otlp_endpoint: Option<String>,
    /// Log line format
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: crate::OPERATOR_NAME.to_string(),
            otlp_endpoint: None,
            log_format: LogFormat::default(),
        }
    }
}

/// Keeps the span exporter alive; flush it with [`TelemetryGuard::shutdown`]
#[must_use = "dropping the guard without shutdown may lose buffered spans"]
pub struct TelemetryGuard {
    provider: Option<TracerProvider>,
}

impl TelemetryGuard {
    /// Whether spans are being exported
    pub fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }

    /// Flush buffered spans and stop the exporter
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "failed to flush spans on shutdown");
            }
        }
    }
}

/// Install the global subscriber. Call once, before the controller starts.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let provider = config
        .otlp_endpoint
        .as_deref()
        .map(|endpoint| {
            let resource = Resource::new(resource_attributes(&config.service_name, |key| {
                std::env::var(key).ok()
            }));
            otlp_provider(endpoint, resource)
        })
        .transpose()?;

    // Option<Layer> is itself a Layer, so a missing exporter composes as a no-op
    let otel_layer = provider.as_ref().map(|p| {
        tracing_opentelemetry::layer().with_tracer(p.tracer(config.service_name.clone()))
    });

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    Ok(TelemetryGuard { provider })
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Resource attributes for exported spans; `lookup` reads the environment
fn resource_attributes(
    service_name: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<KeyValue> {
    let mut attributes = vec![
        KeyValue::new(SERVICE_NAME, service_name.to_string()),
        KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
    ];
    attributes.extend(
        K8S_RESOURCE_ENV
            .iter()
            .filter_map(|(var, key)| lookup(var).map(|value| KeyValue::new(*key, value))),
    );
    attributes
}

fn otlp_provider(endpoint: &str, resource: Resource) -> Result<TracerProvider, TelemetryError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(resource)
        .build();
    global::set_tracer_provider(provider.clone());
    Ok(provider)
}
