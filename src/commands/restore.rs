//! Offline database update: upload a local database directory and swap
//! it in on the server.
//!
//! The live data directory is renamed aside with a timestamp suffix,
//! never deleted, so the previous copy remains as an implicit backup.

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

/// Upload a local database directory and swap it in, bracketed by a
/// confirmed service stop and a start. Declining the stop leaves the
/// remote state untouched (the uploaded archive stays in /tmp).
pub async fn update_db(
    exec: &dyn Executor,
    config: &OpsConfig,
    prompt: &dyn Prompt,
    local_dir: &Path,
) -> Result<()> {
    let staged = stage_upload(exec, config, local_dir).await?;

    if !prompt.confirm("Stop Neo4j server?")? {
        return Ok(());
    }
    service::stop(exec, config).await?;
    swap_in(exec, config, &staged).await?;
    service::start(exec, config).await?;
    Ok(())
}

/// update-db for the TEST server: the operator manages service state, so
/// there is no confirmation and no stop/start bracket.
pub async fn update_db_test(
    exec: &dyn Executor,
    config: &OpsConfig,
    local_dir: &Path,
) -> Result<()> {
    let staged = stage_upload(exec, config, local_dir).await?;
    swap_in(exec, config, &staged).await
}

struct StagedDb {
    remote_archive: String,
    stamp: String,
}

/// Validate, archive and upload the local database directory. The
/// marker-file check is the only guard against swapping in garbage.
async fn stage_upload(
    exec: &dyn Executor,
    config: &OpsConfig,
    local_dir: &Path,
) -> Result<StagedDb> {
    if !local_dir.join("index.db").exists() {
        return Err(PreconditionError::NotADatabaseDir {
            path: local_dir.display().to_string(),
        }
        .into());
    }

    let stamp = version::timestamp(Local::now());

    let archive = tempfile::Builder::new()
        .suffix(".tgz")
        .tempfile()
        .context("Failed to create local archive file")?;
    let archive_path = archive.path().to_string_lossy().to_string();

    let local_dir_path = local_dir.to_string_lossy().to_string();
    let tar = get_tool_path(tools::TAR);
    exec.run_local(&Cmd::new(tar).args([
        "--create",
        "--gzip",
        "--file",
        archive_path.as_str(),
        "-C",
        local_dir_path.as_str(),
        ".",
    ]))
    .await?;

    let archive_name = archive
        .path()
        .file_name()
        .and_then(|n| n.to_str())
        .context("Unexpected temp file name")?;
    let remote_archive = format!("/tmp/{}", archive_name);

    info!("Uploading database archive to {}", config.host);
    exec.put(archive.path(), &remote_archive).await?;

    Ok(StagedDb {
        remote_archive,
        stamp,
    })
}

/// Move the live data directory aside, extract the upload in its place
/// and fix ownership and group-write permissions.
async fn swap_in(exec: &dyn Executor, config: &OpsConfig, staged: &StagedDb) -> Result<()> {
    let db_dir = config.db_data_dir();

    exec.run(&Cmd::new("mv").args([
        db_dir.clone(),
        format!("{}.{}", db_dir, staged.stamp),
    ]))
    .await?;
    exec.run(&Cmd::new("mkdir").arg(&db_dir)).await?;
    exec.run(&Cmd::new("tar").args([
        "--extract",
        "--gzip",
        "--file",
        staged.remote_archive.as_str(),
        "-C",
        db_dir.as_str(),
    ]))
    .await?;
    exec.run(&Cmd::new("chown").args([
        format!("{}.{}", config.user, config.admin_group),
        "-R".to_string(),
        db_dir.clone(),
    ]))
    .await?;
    exec.run(&Cmd::new("chmod").args(["-R", "g+w", db_dir.as_str()]))
        .await?;

    info!("Swapped in new database (previous kept as {}.{})", db_dir, staged.stamp);
    Ok(())
}
