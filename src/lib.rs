//! Forwarder is an HTTP replay proxy.
//!
//! Every inbound request is matched against an ordered list of path
//! prefixes. The first matching route relays the request to its primary
//! upstream and returns that response to the caller unchanged. Once the
//! primary has answered, the same request is replayed to the route's
//! secondary upstreams in the background. Requests and every upstream
//! outcome are appended to a date-partitioned JSON Lines log.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch (run, init, validate, health, echo).
//! - [`config`] -- Route table model, file loading behind the
//!   [`ConfigSource`](config::ConfigSource) trait, and validation.
//! - [`error`] -- Error types using `thiserror`.
//! - [`logging`] -- Process diagnostics with `tracing`.
//! - [`proxy`] -- Route matching, primary relay and secondary fan-out.
//! - [`server`] -- Shared application state, outbound client and shutdown.
//! - [`sink`] -- The request/response record log.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config files _(enabled by default)_ |
//! | `json` | JSON config files _(enabled by default)_ |
//! | `toml` | TOML config files |
//! | `file-backends` | All config file formats |
//! | `full` | All features |

#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod server;
pub mod sink;
