//! Runtime tool path resolution
//!
//! For each local tool (e.g. `ssh`), we check for an environment variable
//! `{TOOL}_BIN` (e.g. `SSH_BIN`) and fall back to PATH-based invocation if
//! the envvar is not set. This keeps tool locations overridable without
//! touching configuration files, and makes tools easy to stub in tests.

use std::env;

/// Get the path to an external tool
///
/// Checks for an environment variable `{TOOL}_BIN` (uppercase tool name +
/// "_BIN"). Falls back to the tool name itself if the envvar is not set,
/// which relies on PATH.
pub fn get_tool_path(tool: &str) -> String {
    let env_var = format!("{}_BIN", tool.to_uppercase());
    env::var(&env_var).unwrap_or_else(|_| tool.to_string())
}

/// Local tool names used by ehri-ops
///
/// This module doesn't enforce these names - you can pass any string to
/// `get_tool_path`. These constants are provided for convenience.
pub mod tools {
    pub const SSH: &str = "ssh";
    pub const SCP: &str = "scp";
    pub const TAR: &str = "tar";
    pub const GIT: &str = "git";
    pub const MVN: &str = "mvn";
}
