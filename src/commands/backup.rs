//! Database snapshot operations: hot backups and offline copies.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::Path;
use tracing::info;

use crate::config::OpsConfig;
use crate::error::PreconditionError;
use crate::exec::{Cmd, Executor};
use crate::tools::{get_tool_path, tools};
use crate::ui::Prompt;
use crate::version;

use super::service;

/// Hot-backup the running database to a directory on the server, using
/// the vendor backup tool over its backup protocol. Aborts if the target
/// already exists rather than silently overwriting a prior backup.
pub async fn online_backup(
    exec: &dyn Executor,
    config: &OpsConfig,
    remote_dir: &str,
    tar: bool,
) -> Result<()> {
    if exec
        .succeeds(&Cmd::new("test").args(["-e", remote_dir]))
        .await?
    {
        return Err(PreconditionError::BackupTargetExists {
            path: remote_dir.to_string(),
        }
        .into());
    }

    info!("Backing up to {} on {}", remote_dir, config.host);
    exec.run(
        &Cmd::new(format!("{}/bin/neo4j-backup", config.neo4j_install)).args([
            "-from",
            "single://localhost:6362",
            "-to",
            remote_dir,
        ]),
    )
    .await?;

    if tar {
        let tar_name = format!("{}.tgz", remote_dir);
        exec.run(&Cmd::new("tar").args([
            "--create",
            "--gzip",
            "--file",
            tar_name.as_str(),
            "-C",
            remote_dir,
            ".",
        ]))
        .await?;
        exec.run(&Cmd::new("rm").args(["-rf", remote_dir])).await?;
    }

    Ok(())
}

/// Clone the running database into a local directory: hot backup into
/// /tmp on the server, archive, download, extract, clean up both ends.
pub async fn online_clone_db(
    exec: &dyn Executor,
    config: &OpsConfig,
    local_dir: &Path,
) -> Result<()> {
    let stamp = version::timestamp(Local::now());
    let remote_tmp = format!("/tmp/{}", stamp);
    let remote_archive = format!("{}.tgz", remote_tmp);

    online_backup(exec, config, &remote_tmp, false).await?;

    exec.run(&Cmd::new("tar").args([
        "--create",
        "--gzip",
        "--file",
        remote_archive.as_str(),
        "-C",
        remote_tmp.as_str(),
        ".",
    ]))
    .await?;

    let local_archive = std::env::temp_dir().join(format!("{}.tgz", stamp));
    exec.get(&remote_archive, &local_archive).await?;
    exec.run(&Cmd::new("rm").args(["-rf", remote_tmp.as_str(), remote_archive.as_str()]))
        .await?;

    tokio::fs::create_dir_all(local_dir)
        .await
        .with_context(|| format!("Failed to create {}", local_dir.display()))?;

    let local_archive_path = local_archive.to_string_lossy().to_string();
    let local_dir_path = local_dir.to_string_lossy().to_string();
    let tar = get_tool_path(tools::TAR);
    exec.run_local(&Cmd::new(tar).args([
        "--extract",
        "--file",
        local_archive_path.as_str(),
        "-C",
        local_dir_path.as_str(),
    ]))
    .await?;

    tokio::fs::remove_file(&local_archive)
        .await
        .with_context(|| format!("Failed to remove {}", local_archive.display()))?;

    info!("Cloned database into {}", local_dir.display());
    Ok(())
}

/// Copy the stopped database from the server into a local directory.
/// Declining the stop confirmation leaves everything untouched.
pub async fn copy_db(
    exec: &dyn Executor,
    config: &OpsConfig,
    prompt: &dyn Prompt,
    local_dir: &Path,
) -> Result<()> {
    if !prompt.confirm("Stop Neo4j server?")? {
        return Ok(());
    }
    service::stop(exec, config).await?;

    let remote_archive = exec.run(&Cmd::new("mktemp")).await?.trim().to_string();
    fetch_db_archive(exec, config, &remote_archive, local_dir).await?;

    if prompt.confirm("Restart Neo4j server?")? {
        service::start(exec, config).await?;
    }
    Ok(())
}

/// copy-db for the TEST server: no stop bracket (no sudo without a tty
/// there), and its mktemp needs the archive renamed to a .tgz name.
pub async fn copy_db_test(
    exec: &dyn Executor,
    config: &OpsConfig,
    prompt: &dyn Prompt,
    local_dir: &Path,
) -> Result<()> {
    let temp = exec.run(&Cmd::new("mktemp")).await?.trim().to_string();
    let remote_archive = format!("{}.tgz", temp);
    exec.run(&Cmd::new("mv").args([temp.as_str(), remote_archive.as_str()]))
        .await?;

    fetch_db_archive(exec, config, &remote_archive, local_dir).await?;

    if prompt.confirm("Restart Neo4j server?")? {
        service::start(exec, config).await?;
    }
    Ok(())
}

/// Archive the remote data directory into `remote_archive`, download it
/// and extract it into `local_dir`, removing the temps on both ends.
async fn fetch_db_archive(
    exec: &dyn Executor,
    config: &OpsConfig,
    remote_archive: &str,
    local_dir: &Path,
) -> Result<()> {
    let db_dir = config.db_data_dir();

    tokio::fs::create_dir_all(local_dir)
        .await
        .with_context(|| format!("Failed to create {}", local_dir.display()))?;

    exec.run(&Cmd::new("tar").args([
        "--create",
        "--gzip",
        "--file",
        remote_archive,
        "-C",
        db_dir.as_str(),
        ".",
    ]))
    .await?;

    let archive_name = Path::new(remote_archive)
        .file_name()
        .and_then(|n| n.to_str())
        .context("Unexpected mktemp output")?;
    let local_archive = std::env::temp_dir().join(archive_name);

    exec.get(remote_archive, &local_archive).await?;

    let local_archive_path = local_archive.to_string_lossy().to_string();
    let local_dir_path = local_dir.to_string_lossy().to_string();
    let tar = get_tool_path(tools::TAR);
    exec.run_local(&Cmd::new(tar).args([
        "--extract",
        "--gzip",
        "--file",
        local_archive_path.as_str(),
        "-C",
        local_dir_path.as_str(),
    ]))
    .await?;

    exec.run(&Cmd::new("rm").arg(remote_archive)).await?;
    tokio::fs::remove_file(&local_archive)
        .await
        .with_context(|| format!("Failed to remove {}", local_archive.display()))?;

    info!("Copied database into {}", local_dir.display());
    Ok(())
}
