//! Custom Resource Definitions served by the WebServer operator

mod webserver;

pub use webserver::{WebServer, WebServerPort, WebServerSpec};

/// API group of all operator CRDs
pub const API_GROUP: &str = "servers.cloudnativejp";
