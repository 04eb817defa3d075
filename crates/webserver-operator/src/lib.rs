//! WebServer operator process: configuration, CRD installation and controller wiring

#![deny(missing_docs)]

/// Command line and environment configuration
pub mod config;
/// Controller construction (watches, error policy, result logging)
pub mod controller_runner;
/// Startup utilities (CRD rendering and installation)
pub mod startup;
