//! Operator configuration
//!
//! Flags fall back to environment variables so the same binary can be driven
//! from a Deployment manifest or a shell.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use webserver_common::telemetry::{LogFormat, TelemetryConfig};
use webserver_common::OPERATOR_NAME;
use webserver_controller::RequeueConfig;

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
///
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
pub const WATCH_TIMEOUT_SECS: u32 = 25;

/// WebServer operator - serves static content from WebServer resources
#[derive(Parser, Debug)]
#[command(name = "webserver-operator", version, about, long_about = None)]
pub struct Cli {
    /// Print the WebServer CRD manifest and exit
    #[arg(long)]
    pub crd: bool,

    /// Install or update the WebServer CRD with server-side apply at startup
    #[arg(long)]
    pub install_crd: bool,

    /// Path to a kubeconfig file (default: in-cluster, then KUBECONFIG / ~/.kube/config)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Only watch WebServers in this namespace (default: all namespaces)
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Seconds before a failed reconcile is retried
    #[arg(long, env = "WEBSERVER_ERROR_REQUEUE_SECS", default_value_t = 15)]
    pub error_requeue_secs: u64,

    /// Seconds before a reconcile that hit a write conflict is retried
    #[arg(long, env = "WEBSERVER_CONFLICT_REQUEUE_SECS", default_value_t = 1)]
    pub conflict_requeue_secs: u64,

    /// Server-side watch timeout in seconds (must stay below the 30s client read timeout)
    #[arg(
        long,
        default_value_t = WATCH_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u32).range(1..30)
    )]
    pub watch_timeout_secs: u32,

    /// OTLP gRPC endpoint for trace export (e.g. http://otel-collector:4317)
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log line format: json or text
    #[arg(long, env = "WEBSERVER_LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,
}

/// Resolved settings for a controller run
#[derive(Clone, Debug)]
pub struct OperatorConfig {
    /// Explicit kubeconfig, if any
    pub kubeconfig: Option<PathBuf>,
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Requeue delays for failed passes
    pub requeue: RequeueConfig,
    /// Server-side watch timeout
    pub watch_timeout_secs: u32,
    /// Whether to apply the CRD before starting
    pub install_crd: bool,
    /// Logging and trace export settings
    pub telemetry: TelemetryConfig,
}

impl From<&Cli> for OperatorConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            kubeconfig: cli.kubeconfig.clone(),
            // An empty WATCH_NAMESPACE means cluster-wide
            namespace: cli.namespace.clone().filter(|ns| !ns.is_empty()),
            requeue: RequeueConfig {
                error_requeue: Duration::from_secs(cli.error_requeue_secs),
                conflict_requeue: Duration::from_secs(cli.conflict_requeue_secs),
            },
            watch_timeout_secs: cli.watch_timeout_secs,
            install_crd: cli.install_crd,
            telemetry: TelemetryConfig {
                service_name: OPERATOR_NAME.to_string(),
                otlp_endpoint: cli.otlp_endpoint.clone().filter(|e| !e.is_empty()),
                log_format: cli.log_format,
            },
        }
    }
}
