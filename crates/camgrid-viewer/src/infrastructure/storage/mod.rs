//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from the platform-appropriate
//!   directory, or from an explicit path given on the command line.
//! - Writing the configuration back to disk.
//! - Providing sensible defaults when the file does not exist yet (first run).

pub mod config;
