//! Neo4j service control.
//!
//! Start and stop are fire-and-forget `sudo service` invocations; restart
//! is gated behind operator confirmation to avoid accidental outages.

use anyhow::Result;
use colored::Colorize;
use tracing::info;

use crate::config::OpsConfig;
use crate::exec::{Cmd, Executor};
use crate::ui::Prompt;

pub async fn start(exec: &dyn Executor, config: &OpsConfig) -> Result<()> {
    info!("Starting {} on {}", config.service_name, config.host);
    exec.run(&Cmd::new("sudo").args(["service", config.service_name.as_str(), "start"]))
        .await?;
    Ok(())
}

pub async fn stop(exec: &dyn Executor, config: &OpsConfig) -> Result<()> {
    info!("Stopping {} on {}", config.service_name, config.host);
    exec.run(&Cmd::new("sudo").args(["service", config.service_name.as_str(), "stop"]))
        .await?;
    Ok(())
}

/// Restart the service if the operator confirms. A declined restart is a
/// successful no-op.
pub async fn restart(exec: &dyn Executor, config: &OpsConfig, prompt: &dyn Prompt) -> Result<()> {
    if !prompt.confirm("Restart Neo4j server?")? {
        println!("{}", "Restart skipped.".yellow());
        return Ok(());
    }

    info!("Restarting {} on {}", config.service_name, config.host);
    exec.run(&Cmd::new("sudo").args(["service", config.service_name.as_str(), "restart"]))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Env, OpsConfig};
    use crate::exec::mock::{Call, MockExecutor};
    use crate::ui::scripted::ScriptedPrompt;

    fn test_config() -> OpsConfig {
        std::env::set_var("USER", "tester");
        OpsConfig::for_env(Env::Test).unwrap()
    }

    #[tokio::test]
    async fn test_start_issues_service_command() {
        let exec = MockExecutor::new();
        start(&exec, &test_config()).await.unwrap();
        assert_eq!(
            exec.calls(),
            vec![Call::Run("sudo service neo4j-service start".to_string())]
        );
    }

    #[tokio::test]
    async fn test_restart_confirmed() {
        let exec = MockExecutor::new();
        let prompt = ScriptedPrompt::new(&[true]);
        restart(&exec, &test_config(), &prompt).await.unwrap();
        assert_eq!(
            exec.calls(),
            vec![Call::Run("sudo service neo4j-service restart".to_string())]
        );
    }

    #[tokio::test]
    async fn test_restart_declined_is_a_no_op() {
        let exec = MockExecutor::new();
        let prompt = ScriptedPrompt::new(&[false]);
        restart(&exec, &test_config(), &prompt).await.unwrap();
        assert!(exec.calls().is_empty());
    }
}
