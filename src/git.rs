use anyhow::{Context, Result};
use std::process::Command;

use crate::tools::{get_tool_path, tools};

/// Get the short git SHA of the local working copy's HEAD.
pub fn get_short_sha() -> Result<String> {
    let git = get_tool_path(tools::GIT);
    let output = Command::new(&git)
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Git command failed: {}", stderr);
    }

    let sha = String::from_utf8(output.stdout)
        .context("Git output is not valid UTF-8")?
        .trim()
        .to_string();

    Ok(sha)
}

/// Show the local git log between a deployed revision and HEAD,
/// streaming output straight to the terminal.
pub fn log_since(revision: &str) -> Result<()> {
    let git = get_tool_path(tools::GIT);
    let status = Command::new(&git)
        .args(["log", format!("{}..HEAD", revision).as_str()])
        .status()
        .context("Failed to execute git log")?;

    if !status.success() {
        anyhow::bail!("git log {}..HEAD failed", revision);
    }

    Ok(())
}
