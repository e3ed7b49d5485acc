//! Search reindex triggers.
//!
//! All variants shell out to the indexer jar on the remote host with the
//! same flag set: an optional clear step, then `--index` for a list of
//! entity types (or one `type|id` composite token).

use anyhow::Result;
use tracing::info;

use crate::config::OpsConfig;
use crate::exec::{Cmd, Executor};

const USER_TYPES: &[&str] = &["userProfile", "group"];

const CONCEPT_TYPES: &[&str] = &[
    "historicalAgent",
    "cvocVocabulary",
    "cvocConcept",
    "authoritativeSet",
];

const VIRTUAL_COLLECTION_TYPES: &[&str] = &["virtualUnit"];

const ALL_TYPES: &[&str] = &[
    "documentaryUnit",
    "repository",
    "country",
    "historicalAgent",
    "cvocVocabulary",
    "cvocConcept",
    "authoritativeSet",
    "userProfile",
    "group",
    "virtualUnit",
    "annotation",
    "link",
];

enum Clear {
    None,
    All,
    KeyValue { key: String, value: String },
}

/// Reindex user profiles and groups.
pub async fn users(exec: &dyn Executor, config: &OpsConfig) -> Result<()> {
    run_indexer(exec, config, &Clear::None, USER_TYPES).await
}

/// Reindex authorities, vocabularies and concepts.
pub async fn concepts(exec: &dyn Executor, config: &OpsConfig) -> Result<()> {
    run_indexer(exec, config, &Clear::None, CONCEPT_TYPES).await
}

/// Reindex virtual collections.
pub async fn virtual_collections(exec: &dyn Executor, config: &OpsConfig) -> Result<()> {
    run_indexer(exec, config, &Clear::None, VIRTUAL_COLLECTION_TYPES).await
}

/// Clear and reindex the items held by one repository.
pub async fn repository(exec: &dyn Executor, config: &OpsConfig, repo_id: &str) -> Result<()> {
    let token = format!("repository|{}", repo_id);
    run_indexer(
        exec,
        config,
        &Clear::KeyValue {
            key: "holderId".to_string(),
            value: repo_id.to_string(),
        },
        &[token.as_str()],
    )
    .await
}

/// Clear the whole search index and rebuild every entity type.
pub async fn all(exec: &dyn Executor, config: &OpsConfig) -> Result<()> {
    run_indexer(exec, config, &Clear::All, ALL_TYPES).await
}

async fn run_indexer(
    exec: &dyn Executor,
    config: &OpsConfig,
    clear: &Clear,
    tokens: &[&str],
) -> Result<()> {
    info!("Reindexing {} token(s) on {}", tokens.len(), config.host);

    let mut cmd = Cmd::new("java").args(["-jar", config.index_helper.as_str()]);
    match clear {
        Clear::All => {
            cmd = cmd.arg("--clear-all");
        }
        Clear::KeyValue { key, value } => {
            cmd = cmd
                .arg("--clear-key-value")
                .arg(format!("{}={}", key, value));
        }
        Clear::None => {}
    }
    cmd = cmd
        .arg("--index")
        .args(["-H", "Authorization=admin"])
        .arg("--stats")
        .args(["--solr", config.solr_url.as_str()])
        .args(["--rest", config.rest_url.as_str()]);
    for token in tokens {
        cmd = cmd.arg(*token);
    }

    exec.run(&cmd).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Env;
    use crate::exec::mock::{Call, MockExecutor};

    fn test_config() -> OpsConfig {
        std::env::set_var("USER", "tester");
        OpsConfig::for_env(Env::Test).unwrap()
    }

    fn first_run(exec: &MockExecutor) -> String {
        match &exec.calls()[0] {
            Call::Run(line) => line.clone(),
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reindex_users_flags_and_types() {
        let exec = MockExecutor::new();
        users(&exec, &test_config()).await.unwrap();

        let line = first_run(&exec);
        assert!(line.starts_with("java -jar /opt/webapps/docview/bin/indexer.jar --index"));
        assert!(line.contains("-H Authorization=admin"));
        assert!(line.contains("--stats"));
        assert!(line.contains("--solr http://localhost:8080/ehri/portal"));
        assert!(line.contains("--rest http://localhost:7474/ehri"));
        assert!(line.ends_with("userProfile group"));
        assert!(!line.contains("--clear"));
    }

    #[tokio::test]
    async fn test_reindex_all_clears_first() {
        let exec = MockExecutor::new();
        all(&exec, &test_config()).await.unwrap();

        let line = first_run(&exec);
        assert!(line.contains("--clear-all --index"));
        for entity in super::ALL_TYPES {
            assert!(line.contains(entity), "missing {}", entity);
        }
    }

    #[tokio::test]
    async fn test_reindex_repository_scopes_clear_and_token() {
        let exec = MockExecutor::new();
        repository(&exec, &test_config(), "gb-003348").await.unwrap();

        let line = first_run(&exec);
        assert!(line.contains("--clear-key-value holderId=gb-003348"));
        assert!(line.ends_with("'repository|gb-003348'"));
    }
}
