//! Integration tests for the WebServer operator
//!
//! Each test runs the controller in-process, scoped to a fresh namespace, and
//! tells the story of one thing a user does to a WebServer.
//!
//! - `webserver_lifecycle`: creating a WebServer, changing it, tampering with
//!   its children and deleting it

mod helpers;
mod webserver_lifecycle;
