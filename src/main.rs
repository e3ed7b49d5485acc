use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod error;
mod exec;
mod git;
mod tools;
mod ui;
mod version;

use cli::{Cli, Commands};
use commands::{backup, deploy, import, reindex, restore, service};
use config::OpsConfig;
use exec::SshExecutor;
use ui::{AssumeYes, Prompt, TerminalPrompt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false) // Disable ANSI escape codes for cleaner output
        .init();

    let config = OpsConfig::load(cli.env, cli.config.as_deref())?;
    if config.prod {
        ui::print_warning(&format!("Target is PRODUCTION ({})", config.host));
    }

    let executor = SshExecutor::new(config.host.clone())?;
    let prompt: Box<dyn Prompt> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalPrompt)
    };

    // Execute command
    match cli.command {
        Commands::Deploy => {
            deploy::execute(&executor, &config, prompt.as_ref()).await?;
        }
        Commands::CleanDeploy => {
            deploy::clean_deploy(&executor, &config, prompt.as_ref()).await?;
        }
        Commands::Start => {
            service::start(&executor, &config).await?;
        }
        Commands::Stop => {
            service::stop(&executor, &config).await?;
        }
        Commands::Restart => {
            service::restart(&executor, &config, prompt.as_ref()).await?;
        }
        Commands::Rollback => {
            deploy::rollback(&executor, &config, prompt.as_ref()).await?;
        }
        Commands::Latest => {
            deploy::latest(&executor, &config, prompt.as_ref()).await?;
        }
        Commands::CurrentVersion => {
            deploy::current_version(&executor, &config).await?;
        }
        Commands::CurrentVersionLog => {
            deploy::current_version_log(&executor, &config).await?;
        }
        Commands::OnlineBackup { remote_dir, no_tar } => {
            backup::online_backup(&executor, &config, &remote_dir, !no_tar).await?;
        }
        Commands::OnlineCloneDb { local_dir } => {
            backup::online_clone_db(&executor, &config, &local_dir).await?;
        }
        Commands::CopyDb { local_dir } => {
            backup::copy_db(&executor, &config, prompt.as_ref(), &local_dir).await?;
        }
        Commands::CopyDbTest { local_dir } => {
            backup::copy_db_test(&executor, &config, prompt.as_ref(), &local_dir).await?;
        }
        Commands::UpdateDb { local_dir } => {
            restore::update_db(&executor, &config, prompt.as_ref(), &local_dir).await?;
        }
        Commands::UpdateDbTest { local_dir } => {
            restore::update_db_test(&executor, &config, &local_dir).await?;
        }
        Commands::UpdateProperties => {
            import::update_properties(&executor, &config).await?;
        }
        Commands::LoadQueue => {
            import::load_queue(&executor, &config).await?;
        }
        Commands::CopyScripts => {
            import::copy_scripts(&executor, &config).await?;
        }
        Commands::ImportEad {
            scope,
            log,
            properties,
            file_dir,
            timeout,
        } => {
            import::import_ead(
                &executor,
                &config,
                &scope,
                &log,
                &properties,
                &file_dir,
                None,
                *timeout,
            )
            .await?;
        }
        Commands::ImportEadWithHandler {
            scope,
            log,
            properties,
            file_dir,
            handler,
            timeout,
        } => {
            import::import_ead(
                &executor,
                &config,
                &scope,
                &log,
                &properties,
                &file_dir,
                Some(&handler),
                *timeout,
            )
            .await?;
        }
        Commands::ImportLargeEadWithHandler {
            scope,
            log,
            properties,
            file_dir,
            handler,
        } => {
            import::import_large_ead(
                &executor, &config, &scope, &log, &properties, &file_dir, &handler,
            )
            .await?;
        }
        Commands::ImportSkos { scope, log, file } => {
            import::import_skos(&executor, &config, &scope, &log, &file).await?;
        }
        Commands::ImportCsv {
            scope,
            log,
            importer,
            file,
        } => {
            import::import_csv(&executor, &config, &scope, &log, &importer, &file).await?;
        }
        Commands::ReindexUsers => {
            reindex::users(&executor, &config).await?;
        }
        Commands::ReindexConcepts => {
            reindex::concepts(&executor, &config).await?;
        }
        Commands::ReindexVirtualcollections => {
            reindex::virtual_collections(&executor, &config).await?;
        }
        Commands::ReindexRepository { repo_id } => {
            reindex::repository(&executor, &config, &repo_id).await?;
        }
        Commands::ReindexAll => {
            reindex::all(&executor, &config).await?;
        }
    }

    Ok(())
}
