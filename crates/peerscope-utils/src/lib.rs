//! Shared utilities for peerscope
//!
//! This crate provides the logging setup used by the peerscope library and
//! command-line tool.

pub mod config;
pub mod logging;

pub use config::{LogConfig, LogFormat};
pub use logging::{init_tracing, init_tracing_with};
