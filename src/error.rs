//! Centralized error types for ehri-ops
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use thiserror::Error;

/// Explicit checks that abort an operation before any side effect
#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("Remote directory '{path}' already exists!")]
    BackupTargetExists { path: String },

    #[error("Unable to get a deployed version: deploys/ listing is empty")]
    NoDeployedVersions,

    #[error("This doesn't look like a Neo4j DB folder!: {path}")]
    NotADatabaseDir { path: String },

    #[error("No .properties files found in {path}")]
    NoPropertiesFiles { path: String },
}

/// External command failures (local or over ssh)
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },
}

/// Deployed-version identifier errors
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Malformed version directory name: {name}")]
    Malformed { name: String },

    #[error("Bad timestamp in version '{name}': {message}")]
    BadTimestamp { name: String, message: String },
}
