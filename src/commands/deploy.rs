//! Deployment pipeline and version navigation.
//!
//! Each deploy lands in `deploys/<timestamp>_<short sha>` under the app
//! root; the `current` symlink is the only durable state and is replaced
//! with `ln --force --no-dereference` so a reader never sees a missing
//! target. Any failing step aborts the run; a half-extracted deploy
//! directory is left behind for manual cleanup.

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::info;

use crate::config::OpsConfig;
use crate::error::PreconditionError;
use crate::exec::{Cmd, Executor};
use crate::ui::Prompt;
use crate::{git, version};

use super::service;

/// Deploy the locally built artifact as a new version and make it current.
pub async fn execute(exec: &dyn Executor, config: &OpsConfig, prompt: &dyn Prompt) -> Result<()> {
    let stamp = version::version_stamp(Local::now(), &git::get_short_sha()?);
    deploy_version(exec, config, prompt, &stamp).await
}

/// Build a clean package locally, then deploy it.
pub async fn clean_deploy(
    exec: &dyn Executor,
    config: &OpsConfig,
    prompt: &dyn Prompt,
) -> Result<()> {
    info!("Building clean package");
    let mvn = crate::tools::get_tool_path(crate::tools::tools::MVN);
    exec.run_local(&Cmd::new(mvn).args(["clean", "package", "-P", "sparql", "-DskipTests"]))
        .await?;
    execute(exec, config, prompt).await
}

pub(crate) async fn deploy_version(
    exec: &dyn Executor,
    config: &OpsConfig,
    prompt: &dyn Prompt,
    stamp: &str,
) -> Result<()> {
    info!("Deploying version {} to {}", stamp, config.host);
    copy_to_server(exec, config, stamp).await?;
    symlink_current(exec, config, stamp).await?;
    service::restart(exec, config, prompt).await?;
    println!("{}", format!("Deployed version: {}", stamp).bright_green());
    Ok(())
}

/// Upload the artifact into a fresh versioned directory and extract it.
async fn copy_to_server(exec: &dyn Executor, config: &OpsConfig, stamp: &str) -> Result<()> {
    let archive_name = Path::new(&config.artifact)
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid artifact path: {}", config.artifact))?;

    let deploy_dir = format!("deploys/{}", stamp);
    let remote_archive = format!("{}/{}/{}", config.app_root, deploy_dir, archive_name);

    exec.run(
        &Cmd::new("mkdir")
            .args(["-p", deploy_dir.as_str()])
            .current_dir(&config.app_root),
    )
    .await?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(format!("Uploading {}...", archive_name));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    exec.put(Path::new(&config.artifact), &remote_archive).await?;

    pb.finish_with_message(format!("Uploaded {}", archive_name));

    exec.run(
        &Cmd::new("tar")
            .args(["--extract", "--gzip", "--file", archive_name])
            .current_dir(format!("{}/{}", config.app_root, deploy_dir)),
    )
    .await?;

    exec.run(&Cmd::new("rm").arg(&remote_archive)).await?;
    Ok(())
}

/// Atomically repoint the `current` symlink at a deployed version.
async fn symlink_current(exec: &dyn Executor, config: &OpsConfig, stamp: &str) -> Result<()> {
    let target = format!("deploys/{}", stamp);
    exec.run(
        &Cmd::new("ln")
            .args([
                "--force",
                "--no-dereference",
                "--symbolic",
                target.as_str(),
                "current",
            ])
            .current_dir(&config.app_root),
    )
    .await?;
    Ok(())
}

/// Repoint `current` at the previous deployed version and restart.
pub async fn rollback(exec: &dyn Executor, config: &OpsConfig, prompt: &dyn Prompt) -> Result<()> {
    let listing = list_deploys(exec, config).await?;
    let target = select_rollback_target(&listing)?;
    retarget(exec, config, prompt, &target).await
}

/// Repoint `current` at the latest deployed version and restart.
pub async fn latest(exec: &dyn Executor, config: &OpsConfig, prompt: &dyn Prompt) -> Result<()> {
    let listing = list_deploys(exec, config).await?;
    let target = select_latest_target(&listing)?;
    retarget(exec, config, prompt, &target).await
}

async fn retarget(
    exec: &dyn Executor,
    config: &OpsConfig,
    prompt: &dyn Prompt,
    target: &str,
) -> Result<()> {
    symlink_current(exec, config, target).await?;
    println!("Current version is now: {}", target.bright_green());
    service::restart(exec, config, prompt).await
}

/// List deploy directory names sorted by modification time, oldest first.
async fn list_deploys(exec: &dyn Executor, config: &OpsConfig) -> Result<String> {
    exec.run(
        &Cmd::new("ls")
            .args(["-1rt", "deploys"])
            .current_dir(&config.app_root),
    )
    .await
}

/// Pick the second-most-recent entry (or the only one, if there is just
/// one) from an mtime-sorted listing.
fn select_rollback_target(listing: &str) -> Result<String> {
    let entries = listing_entries(listing)?;
    let index = entries.len().saturating_sub(2);
    Ok(entries[index].to_string())
}

/// Pick the most recent entry from an mtime-sorted listing.
fn select_latest_target(listing: &str) -> Result<String> {
    let entries = listing_entries(listing)?;
    Ok(entries[entries.len() - 1].to_string())
}

fn listing_entries(listing: &str) -> Result<Vec<&str>> {
    let entries: Vec<&str> = listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if entries.is_empty() {
        return Err(PreconditionError::NoDeployedVersions.into());
    }
    Ok(entries)
}

/// Show the timestamp and revision of the deployed version.
pub async fn current_version(
    exec: &dyn Executor,
    config: &OpsConfig,
) -> Result<(chrono::NaiveDateTime, String)> {
    let path = exec
        .run(
            &Cmd::new("readlink")
                .args(["-f", "current"])
                .current_dir(&config.app_root),
        )
        .await?;

    let name = Path::new(path.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .context("Could not resolve the current symlink target")?
        .to_string();

    let (date, revision) = version::parse_version(&name)?;
    println!("Timestamp: {}, revision: {}", date, revision);
    Ok((date, revision))
}

/// Show the local git log between the deployed revision and HEAD.
pub async fn current_version_log(exec: &dyn Executor, config: &OpsConfig) -> Result<()> {
    let (_, revision) = current_version(exec, config).await?;
    git::log_since(&revision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Env;
    use crate::exec::mock::{Call, MockExecutor};
    use crate::ui::scripted::ScriptedPrompt;

    fn test_config() -> OpsConfig {
        std::env::set_var("USER", "tester");
        OpsConfig::for_env(Env::Test).unwrap()
    }

    #[test]
    fn test_rollback_selects_second_most_recent() {
        let listing = "20230101000000_abc123\n20230102000000_def456\n";
        assert_eq!(
            select_rollback_target(listing).unwrap(),
            "20230101000000_abc123"
        );
    }

    #[test]
    fn test_latest_selects_most_recent() {
        let listing = "20230101000000_abc123\n20230102000000_def456\n";
        assert_eq!(
            select_latest_target(listing).unwrap(),
            "20230102000000_def456"
        );
    }

    #[test]
    fn test_rollback_with_single_deploy_reselects_it() {
        let listing = "20230101000000_abc123\n";
        assert_eq!(
            select_rollback_target(listing).unwrap(),
            "20230101000000_abc123"
        );
    }

    #[test]
    fn test_empty_listing_is_an_explicit_error() {
        assert!(select_rollback_target("").is_err());
        assert!(select_latest_target("\n  \n").is_err());
    }

    #[tokio::test]
    async fn test_deploy_sequence() {
        let exec = MockExecutor::new();
        let prompt = ScriptedPrompt::new(&[true]);
        let config = test_config();

        deploy_version(&exec, &config, &prompt, "20230101000000_abc123")
            .await
            .unwrap();

        let root = "/opt/webapps/ehri-rest";
        assert_eq!(
            exec.calls(),
            vec![
                Call::Run(format!("cd {} && mkdir -p deploys/20230101000000_abc123", root)),
                Call::Put(
                    "assembly/target/assembly-0.1.tar.gz".into(),
                    format!(
                        "{}/deploys/20230101000000_abc123/assembly-0.1.tar.gz",
                        root
                    ),
                ),
                Call::Run(format!(
                    "cd {}/deploys/20230101000000_abc123 && tar --extract --gzip --file assembly-0.1.tar.gz",
                    root
                )),
                Call::Run(format!(
                    "rm {}/deploys/20230101000000_abc123/assembly-0.1.tar.gz",
                    root
                )),
                Call::Run(format!(
                    "cd {} && ln --force --no-dereference --symbolic deploys/20230101000000_abc123 current",
                    root
                )),
                Call::Run("sudo service neo4j-service restart".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_rollback_retargets_and_restarts() {
        let exec = MockExecutor::new();
        exec.queue_remote_output("20230101000000_abc123\n20230102000000_def456\n");
        let prompt = ScriptedPrompt::new(&[true]);
        let config = test_config();

        rollback(&exec, &config, &prompt).await.unwrap();

        let calls = exec.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[1],
            Call::Run(
                "cd /opt/webapps/ehri-rest && ln --force --no-dereference --symbolic deploys/20230101000000_abc123 current"
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_current_version_parses_symlink_target() {
        let exec = MockExecutor::new();
        exec.queue_remote_output(
            "/opt/webapps/ehri-rest/deploys/20230615123045_def456\n",
        );
        let config = test_config();

        let (date, revision) = current_version(&exec, &config).await.unwrap();
        assert_eq!(revision, "def456");
        assert_eq!(date.format("%Y%m%d%H%M%S").to_string(), "20230615123045");
    }
}
