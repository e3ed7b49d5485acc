//! CLI definitions for ehri-ops
//!
//! This module contains all CLI argument parsing structures using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Env;

#[derive(Parser)]
#[command(
    name = "ehri-ops",
    version,
    about = "Deployment and graph-database operations for the EHRI REST backend",
    long_about = "Remote operations tool for the EHRI REST backend.\nDeploys versioned releases, manages the Neo4j service and data\ndirectory, and triggers imports and search reindexing over ssh."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Target environment (selects the remote host)
    #[arg(long, value_enum, env = "EHRI_OPS_ENV", default_value_t = Env::Test, global = true)]
    pub env: Env,

    /// Optional YAML config file overriding hosts and paths
    #[arg(long, env = "EHRI_OPS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy the packaged artifact as a new version and make it current
    Deploy,

    /// Build a clean package locally, then deploy it
    CleanDeploy,

    /// Start the Neo4j service
    Start,

    /// Stop the Neo4j service
    Stop,

    /// Restart the Neo4j service (asks for confirmation)
    Restart,

    /// Repoint the current symlink at the previous version and restart
    Rollback,

    /// Repoint the current symlink at the latest version and restart
    Latest,

    /// Show the timestamp and revision of the deployed version
    CurrentVersion,

    /// Show the git log between the deployed revision and HEAD
    CurrentVersionLog,

    /// Hot-backup the running database to a directory on the server
    OnlineBackup {
        /// Target directory on the remote host (must not exist)
        remote_dir: String,

        /// Leave the backup as a directory instead of a .tgz archive
        #[arg(long)]
        no_tar: bool,
    },

    /// Clone the running database into a local directory via hot backup
    OnlineCloneDb {
        /// Local directory to extract the database into
        local_dir: PathBuf,
    },

    /// Copy the stopped database from the server into a local directory
    CopyDb {
        /// Local directory to extract the database into
        local_dir: PathBuf,
    },

    /// copy-db variant for the TEST server (no stop bracket; its mktemp
    /// and sudo behave differently)
    CopyDbTest {
        /// Local directory to extract the database into
        local_dir: PathBuf,
    },

    /// Upload a local database directory and swap it in on the server
    UpdateDb {
        /// Local Neo4j database directory (must contain index.db)
        local_dir: PathBuf,
    },

    /// update-db variant for the TEST server (no confirmation or
    /// stop/start bracket; the operator manages service state)
    UpdateDbTest {
        /// Local Neo4j database directory (must contain index.db)
        local_dir: PathBuf,
    },

    /// Push a fresh copy of the working-copy .properties files
    UpdateProperties,

    /// Stop the service, drain the import queue script, start again
    LoadQueue,

    /// Push the shared shell scripts (lib.sh, import-large-batch.sh, ...)
    CopyScripts,

    /// Import EAD files already staged on the remote host via REST
    ImportEad {
        /// Scope (repository/collection id) the batch belongs to
        #[arg(long)]
        scope: String,

        /// Log file name, created under the import logs directory
        #[arg(long)]
        log: String,

        /// Properties file name in the import properties directory
        #[arg(long)]
        properties: String,

        /// Directory of .xml files, relative to the import-data root
        #[arg(long)]
        file_dir: String,

        /// Maximum duration of the import HTTP request
        #[arg(long, default_value = "2h")]
        timeout: humantime::Duration,
    },

    /// Import EAD files with an explicit handler class
    ImportEadWithHandler {
        /// Scope (repository/collection id) the batch belongs to
        #[arg(long)]
        scope: String,

        /// Log file name, created under the import logs directory
        #[arg(long)]
        log: String,

        /// Properties file name in the import properties directory
        #[arg(long)]
        properties: String,

        /// Directory of .xml files, relative to the import-data root
        #[arg(long)]
        file_dir: String,

        /// Fully qualified handler class, e.g.
        /// eu.ehri.project.importers.EadHandler
        #[arg(long)]
        handler: String,

        /// Maximum duration of the import HTTP request
        #[arg(long, default_value = "2h")]
        timeout: humantime::Duration,
    },

    /// Import a large EAD batch via the remote batch script
    ImportLargeEadWithHandler {
        /// Scope (repository/collection id) the batch belongs to
        #[arg(long)]
        scope: String,

        /// Log file name, created under the import logs directory
        #[arg(long)]
        log: String,

        /// Properties file name in the import properties directory
        #[arg(long)]
        properties: String,

        /// Directory of .xml files, relative to the import-data root
        #[arg(long)]
        file_dir: String,

        /// Fully qualified handler class
        #[arg(long)]
        handler: String,
    },

    /// Import a SKOS vocabulary file via REST
    ImportSkos {
        /// Scope (vocabulary id) the batch belongs to
        #[arg(long)]
        scope: String,

        /// Log file name or URL-encoded log message
        #[arg(long)]
        log: String,

        /// RDF file path, relative to the import-data root
        #[arg(long)]
        file: String,
    },

    /// Import a CSV file via REST
    ImportCsv {
        /// Scope the batch belongs to
        #[arg(long)]
        scope: String,

        /// Log file name, created under the import logs directory
        #[arg(long)]
        log: String,

        /// CSV importer class name, e.g. PersonalitiesImporter
        #[arg(long)]
        importer: String,

        /// CSV file path, relative to the import-data root
        #[arg(long)]
        file: String,
    },

    /// Reindex user profiles and groups
    ReindexUsers,

    /// Reindex authorities, vocabularies and concepts
    ReindexConcepts,

    /// Reindex virtual collections
    ReindexVirtualcollections,

    /// Clear and reindex the items held by one repository
    ReindexRepository {
        /// Repository id, e.g. gb-003348
        repo_id: String,
    },

    /// Clear the whole search index and rebuild it
    ReindexAll,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_env_defaults_to_test() {
        let cli = Cli::try_parse_from(["ehri-ops", "start"]).unwrap();
        assert_eq!(cli.env, Env::Test);
        assert!(!cli.yes);
    }

    #[test]
    fn test_import_csv_arguments() {
        let cli = Cli::try_parse_from([
            "ehri-ops",
            "--env",
            "stage",
            "import-csv",
            "--scope",
            "terezin-victims",
            "--log",
            "terezin.log",
            "--importer",
            "PersonalitiesImporter",
            "--file",
            "wp2/terezin/authoritativeSet/terezin-victims.csv",
        ])
        .unwrap();

        assert_eq!(cli.env, Env::Stage);
        match cli.command {
            Commands::ImportCsv { scope, importer, .. } => {
                assert_eq!(scope, "terezin-victims");
                assert_eq!(importer, "PersonalitiesImporter");
            }
            _ => panic!("expected import-csv"),
        }
    }
}
