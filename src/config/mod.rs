//! # Operations Configuration
//!
//! Built once per invocation from the selected environment, read-only
//! afterward. Baked-in defaults describe the standard host layout; an
//! optional YAML file (via `--config` or `EHRI_OPS_CONFIG`) can override
//! any individual field, e.g.:
//!
//! ```yaml
//! hosts:
//!   stage: ehristage-new
//! service_name: neo4j-service
//! artifact: assembly/target/assembly-0.2.tar.gz
//! ```

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;

pub const PROJECT_NAME: &str = "ehri-rest";

/// Target environment: selects the remote host and the production flag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Env {
    /// The remote testing server
    Test,
    /// The remote staging server
    Stage,
    /// The remote production server
    Prod,
}

impl Env {
    pub fn name(&self) -> &'static str {
        match self {
            Env::Test => "test",
            Env::Stage => "stage",
            Env::Prod => "prod",
        }
    }

    fn default_host(&self) -> &'static str {
        match self {
            Env::Test => "ehritest",
            Env::Stage => "ehristage",
            Env::Prod => "ehriprod",
        }
    }
}

impl std::fmt::Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// All host/path settings for one invocation.
#[derive(Debug, Clone)]
pub struct OpsConfig {
    /// Remote host (an ssh config alias)
    pub host: String,
    /// True when targeting the production server
    pub prod: bool,
    /// Service-manager unit for the backend
    pub service_name: String,
    /// Application root holding deploys/ and the current symlink
    pub app_root: String,
    /// Neo4j installation directory
    pub neo4j_install: String,
    /// Path to the indexer jar on the remote host
    pub index_helper: String,
    /// Root of remotely staged import files
    pub import_data: String,
    /// Directory for generated import file-list manifests
    pub import_metadata: String,
    /// Directory holding import .properties files on the remote host
    pub properties_dir: String,
    /// Local directory containing the working-copy .properties files
    pub properties_src: String,
    /// Local path of the packaged application artifact
    pub artifact: String,
    /// Group owning the remote database directory
    pub admin_group: String,
    /// Operating user, passed as the Authorization header on imports.
    /// Resolved from the local `USER` (accounts match across hosts);
    /// overridable via the config file when they don't.
    pub user: String,
    /// Solr search endpoint for the indexer
    pub solr_url: String,
    /// Backend REST endpoint (imports and indexing read from here)
    pub rest_url: String,
}

/// Field-by-field overrides loaded from the optional YAML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverrides {
    hosts: Option<HashMap<String, String>>,
    service_name: Option<String>,
    app_root: Option<String>,
    neo4j_install: Option<String>,
    index_helper: Option<String>,
    import_data: Option<String>,
    import_metadata: Option<String>,
    properties_dir: Option<String>,
    properties_src: Option<String>,
    artifact: Option<String>,
    admin_group: Option<String>,
    user: Option<String>,
    solr_url: Option<String>,
    rest_url: Option<String>,
}

impl OpsConfig {
    /// Build the default configuration for an environment.
    pub fn for_env(env: Env) -> Result<Self> {
        let user =
            std::env::var("USER").context("USER environment variable is not set")?;

        Ok(Self {
            host: env.default_host().to_string(),
            prod: env == Env::Prod,
            service_name: "neo4j-service".to_string(),
            app_root: format!("/opt/webapps/{}", PROJECT_NAME),
            neo4j_install: "/opt/webapps/neo4j-version".to_string(),
            index_helper: "/opt/webapps/docview/bin/indexer.jar".to_string(),
            import_data: "/opt/webapps/data/import-data".to_string(),
            import_metadata: "/opt/webapps/data/import-metadata".to_string(),
            properties_dir: "/opt/webapps/data/import-data/properties".to_string(),
            properties_src: "ehri-importers/src/main/resources".to_string(),
            artifact: "assembly/target/assembly-0.1.tar.gz".to_string(),
            admin_group: "webadm".to_string(),
            user,
            solr_url: "http://localhost:8080/ehri/portal".to_string(),
            rest_url: "http://localhost:7474/ehri".to_string(),
        })
    }

    /// Build the configuration for an environment, applying overrides
    /// from a YAML file when one is given.
    pub fn load(env: Env, config_file: Option<&Path>) -> Result<Self> {
        let mut config = Self::for_env(env)?;

        if let Some(path) = config_file {
            let content =
                std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })?;
            let overrides: ConfigOverrides =
                serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                    message: e.to_string(),
                })?;
            config.apply(env, overrides);
        }

        Ok(config)
    }

    fn apply(&mut self, env: Env, overrides: ConfigOverrides) {
        if let Some(hosts) = overrides.hosts {
            if let Some(host) = hosts.get(env.name()) {
                self.host = host.clone();
            }
        }
        if let Some(v) = overrides.service_name {
            self.service_name = v;
        }
        if let Some(v) = overrides.app_root {
            self.app_root = v;
        }
        if let Some(v) = overrides.neo4j_install {
            self.neo4j_install = v;
        }
        if let Some(v) = overrides.index_helper {
            self.index_helper = v;
        }
        if let Some(v) = overrides.import_data {
            self.import_data = v;
        }
        if let Some(v) = overrides.import_metadata {
            self.import_metadata = v;
        }
        if let Some(v) = overrides.properties_dir {
            self.properties_dir = v;
        }
        if let Some(v) = overrides.properties_src {
            self.properties_src = v;
        }
        if let Some(v) = overrides.artifact {
            self.artifact = v;
        }
        if let Some(v) = overrides.admin_group {
            self.admin_group = v;
        }
        if let Some(v) = overrides.user {
            self.user = v;
        }
        if let Some(v) = overrides.solr_url {
            self.solr_url = v;
        }
        if let Some(v) = overrides.rest_url {
            self.rest_url = v;
        }
    }

    /// The live database data directory on the remote host.
    pub fn db_data_dir(&self) -> String {
        format!("{}/data/graph.db", self.neo4j_install)
    }

    /// Path of an import log file on the remote host.
    pub fn import_log_path(&self, log: &str) -> String {
        format!("{}/logs/{}", self.import_data, log)
    }

    /// Path of an import properties file on the remote host.
    pub fn properties_path(&self, properties: &str) -> String {
        format!("{}/{}", self.properties_dir, properties)
    }

    /// Path of a staged import file on the remote host.
    pub fn import_file_path(&self, file: &str) -> String {
        format!("{}/{}", self.import_data, file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn with_user<T>(f: impl FnOnce() -> T) -> T {
        std::env::set_var("USER", "tester");
        f()
    }

    #[test]
    fn test_env_selects_host_and_prod_flag() {
        with_user(|| {
            let test = OpsConfig::for_env(Env::Test).unwrap();
            assert_eq!(test.host, "ehritest");
            assert!(!test.prod);

            let prod = OpsConfig::for_env(Env::Prod).unwrap();
            assert_eq!(prod.host, "ehriprod");
            assert!(prod.prod);
        });
    }

    #[test]
    fn test_default_paths() {
        with_user(|| {
            let config = OpsConfig::for_env(Env::Stage).unwrap();
            assert_eq!(config.app_root, "/opt/webapps/ehri-rest");
            assert_eq!(
                config.db_data_dir(),
                "/opt/webapps/neo4j-version/data/graph.db"
            );
            assert_eq!(
                config.import_log_path("wiener-log.txt"),
                "/opt/webapps/data/import-data/logs/wiener-log.txt"
            );
            assert_eq!(
                config.properties_path("wienerlib.properties"),
                "/opt/webapps/data/import-data/properties/wienerlib.properties"
            );
        });
    }

    #[test]
    fn test_yaml_overrides_replace_defaults_field_by_field() {
        with_user(|| {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(
                file,
                "hosts:\n  stage: ehristage-new\nservice_name: neo4j\nartifact: assembly/target/assembly-0.2.tar.gz"
            )
            .unwrap();

            let config = OpsConfig::load(Env::Stage, Some(file.path())).unwrap();
            assert_eq!(config.host, "ehristage-new");
            assert_eq!(config.service_name, "neo4j");
            assert_eq!(config.artifact, "assembly/target/assembly-0.2.tar.gz");
            // Untouched fields keep their defaults
            assert_eq!(config.neo4j_install, "/opt/webapps/neo4j-version");
        });
    }

    #[test]
    fn test_host_override_only_applies_to_selected_env() {
        with_user(|| {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "hosts:\n  prod: ehriprod-new").unwrap();

            let config = OpsConfig::load(Env::Stage, Some(file.path())).unwrap();
            assert_eq!(config.host, "ehristage");
        });
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        with_user(|| {
            let result = OpsConfig::load(Env::Test, Some(Path::new("/no/such/file.yaml")));
            assert!(result.is_err());
        });
    }
}
