//! Import triggers against the backend's REST import endpoints.
//!
//! File paths given to these commands are interpreted on the remote
//! host; the POST itself is issued by curl on the server against
//! localhost. The operating user is passed as a raw Authorization
//! header, and EAD/SKOS imports always run tolerant (per-record errors
//! don't abort the batch).

use anyhow::{bail, Result};
use std::time::Duration;
use tracing::info;

use crate::config::OpsConfig;
use crate::error::PreconditionError;
use crate::exec::{Cmd, Executor};
use crate::tools::{get_tool_path, tools};
use crate::ui;

use super::service;

/// Import EAD files staged under `<import-data>/<file_dir>`.
///
/// Builds a newline-delimited manifest of the directory's .xml files in
/// the import-metadata directory, then POSTs the manifest to the EAD
/// import endpoint. An optional handler class selects the parser.
pub async fn import_ead(
    exec: &dyn Executor,
    config: &OpsConfig,
    scope: &str,
    log: &str,
    properties: &str,
    file_dir: &str,
    handler: Option<&str>,
    timeout: Duration,
) -> Result<()> {
    let manifest = write_manifest(exec, config, scope, file_dir).await?;
    let url = build_ead_url(
        config,
        scope,
        &config.import_log_path(log),
        &config.properties_path(properties),
        handler,
    );

    info!("Importing EAD batch for scope {}", scope);
    post_file(exec, config, &url, &manifest, Some(timeout), Some("text/plain")).await
}

/// Import a large EAD batch by delegating to the remote batch script,
/// which chunks the file list server-side.
pub async fn import_large_ead(
    exec: &dyn Executor,
    config: &OpsConfig,
    scope: &str,
    log: &str,
    properties: &str,
    file_dir: &str,
    handler: &str,
) -> Result<()> {
    info!("Importing large EAD batch for scope {}", scope);
    exec.run(
        &Cmd::new("./scripts/import-large-batch.sh")
            .arg(file_dir)
            .arg(scope)
            .arg(config.import_log_path(log))
            .arg(config.properties_path(properties))
            .arg(handler)
            .current_dir(&config.app_root),
    )
    .await?;
    Ok(())
}

/// Import a SKOS vocabulary file. The log may be a file name or an
/// URL-encoded message and is passed through verbatim.
pub async fn import_skos(
    exec: &dyn Executor,
    config: &OpsConfig,
    scope: &str,
    log: &str,
    file: &str,
) -> Result<()> {
    let url = format!(
        "{}/import/skos?scope={}&log={}&tolerant=true",
        config.rest_url, scope, log
    );
    info!("Importing SKOS vocabulary for scope {}", scope);
    post_file(
        exec,
        config,
        &url,
        &config.import_file_path(file),
        None,
        None,
    )
    .await
}

/// Import a CSV file through a named importer class.
pub async fn import_csv(
    exec: &dyn Executor,
    config: &OpsConfig,
    scope: &str,
    log: &str,
    importer: &str,
    file: &str,
) -> Result<()> {
    let url = build_csv_url(config, scope, log, importer);
    info!("Importing CSV for scope {}", scope);
    post_file(
        exec,
        config,
        &url,
        &config.import_file_path(file),
        None,
        None,
    )
    .await
}

/// Put a fresh copy of the working-copy .properties files on the server.
pub async fn update_properties(exec: &dyn Executor, config: &OpsConfig) -> Result<()> {
    let mut names: Vec<String> = std::fs::read_dir(&config.properties_src)
        .map_err(|_| PreconditionError::NoPropertiesFiles {
            path: config.properties_src.clone(),
        })?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(".properties"))
        .collect();
    names.sort_unstable();

    if names.is_empty() {
        return Err(PreconditionError::NoPropertiesFiles {
            path: config.properties_src.clone(),
        }
        .into());
    }

    let archive = tempfile::Builder::new()
        .prefix("props")
        .suffix(".tgz")
        .tempfile()?;
    let archive_path = archive.path().to_string_lossy().to_string();

    let tar = get_tool_path(tools::TAR);
    let mut cmd = Cmd::new(tar).args([
        "--create",
        "--gzip",
        "--file",
        archive_path.as_str(),
        "-C",
        config.properties_src.as_str(),
    ]);
    for name in &names {
        cmd = cmd.arg(name);
    }
    exec.run_local(&cmd).await?;

    let archive_name = archive
        .path()
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("props.tgz")
        .to_string();
    let remote_archive = format!("{}/{}", config.properties_dir, archive_name);

    exec.put(archive.path(), &remote_archive).await?;
    exec.run(
        &Cmd::new("tar")
            .args([
                "--extract",
                "--gzip",
                "--no-overwrite-dir",
                "--touch",
                "--overwrite",
                "--file",
                archive_name.as_str(),
            ])
            .current_dir(&config.properties_dir),
    )
    .await?;
    exec.run(&Cmd::new("rm").arg(&remote_archive)).await?;

    ui::print_success(&format!("Updated {} properties files", names.len()));
    Ok(())
}

/// Stop the service, drain the import queue script, start again.
pub async fn load_queue(exec: &dyn Executor, config: &OpsConfig) -> Result<()> {
    service::stop(exec, config).await?;
    exec.run(&Cmd::new("./scripts/queue.sh").current_dir(&config.app_root))
        .await?;
    service::start(exec, config).await
}

/// Push the shared shell scripts to the server. The batch scripts need
/// the group-execute bit so other operators can run them.
pub async fn copy_scripts(exec: &dyn Executor, config: &OpsConfig) -> Result<()> {
    let scripts: &[(&str, bool)] = &[
        ("lib.sh", false),
        ("import-large-batch.sh", true),
        ("cmd", true),
        ("export-wienerlibrary", true),
    ];

    for (name, executable) in scripts {
        let local = format!("scripts/{}", name);
        let remote = format!("{}/scripts/{}", config.app_root, name);
        exec.put(std::path::Path::new(&local), &remote).await?;
        if *executable {
            exec.run(&Cmd::new("chmod").args(["g+x", remote.as_str()]))
                .await?;
        }
    }
    Ok(())
}

/// Build the file-list manifest for an EAD directory and return its
/// remote path. Aborts if the directory holds no .xml files.
async fn write_manifest(
    exec: &dyn Executor,
    config: &OpsConfig,
    scope: &str,
    file_dir: &str,
) -> Result<String> {
    let source_dir = config.import_file_path(file_dir);
    // Direct children only: nested directories are separate batches
    let listing = exec
        .run(
            &Cmd::new("find")
                .arg(&source_dir)
                .args(["-maxdepth", "1", "-name", "*.xml"]),
        )
        .await?;

    let mut files: Vec<&str> = listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    files.sort_unstable();

    if files.is_empty() {
        bail!("No .xml files found in {}", source_dir);
    }

    let manifest = format!("{}/{}.txt", config.import_metadata, scope);
    let body = format!("{}\n", files.join("\n"));
    exec.run(&Cmd::new("tee").arg(&manifest).stdin(body)).await?;
    Ok(manifest)
}

fn build_ead_url(
    config: &OpsConfig,
    scope: &str,
    log_file: &str,
    properties_file: &str,
    handler: Option<&str>,
) -> String {
    let mut url = format!(
        "{}/import/ead?scope={}&log={}&tolerant=true&properties={}",
        config.rest_url, scope, log_file, properties_file
    );
    if let Some(handler) = handler {
        url.push_str(&format!("&handler={}", handler));
    }
    url
}

fn build_csv_url(config: &OpsConfig, scope: &str, log: &str, importer: &str) -> String {
    format!(
        "{}/import/csv?scope={}&log={}&importer={}",
        config.rest_url,
        scope,
        config.import_log_path(log),
        importer
    )
}

/// POST a remote file's content to an import endpoint via curl on the
/// server, echoing the endpoint's response.
async fn post_file(
    exec: &dyn Executor,
    config: &OpsConfig,
    url: &str,
    remote_file: &str,
    timeout: Option<Duration>,
    content_type: Option<&str>,
) -> Result<()> {
    let mut cmd = Cmd::new("curl");
    if let Some(timeout) = timeout {
        cmd = cmd.arg("-m").arg(timeout.as_secs().to_string());
    }
    cmd = cmd
        .args(["-X", "POST"])
        .arg("-H")
        .arg(format!("Authorization: {}", config.user))
        .arg("--data-binary")
        .arg(format!("@{}", remote_file));
    if let Some(content_type) = content_type {
        cmd = cmd.arg("-H").arg(format!("Content-Type: {}", content_type));
    }
    cmd = cmd.arg(url);

    let response = exec.run(&cmd).await?;
    if !response.trim().is_empty() {
        println!("{}", response.trim());
    }
    Ok(())
}
