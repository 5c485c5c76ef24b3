//! Remediation status query: is the agent's CLI installed and signed in?

use crate::config::{CoordinatorConfig, ToolConfig};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

const AUTH_CHECK_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationStatus {
    pub agent: String,
    pub binary: String,
    pub installed: bool,
    pub binary_path: Option<PathBuf>,
    /// `None` when not installed, no check is configured, or the check could not run.
    pub authenticated: Option<bool>,
}

#[async_trait]
pub trait RemediationProbe: Send + Sync {
    async fn status(&self, agent: &str) -> RemediationStatus;
}

/// Probes the local system: `which` for the binary, then the configured
/// auth check command.
pub struct SystemProbe {
    config: CoordinatorConfig,
}

impl SystemProbe {
    pub fn new(config: &CoordinatorConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl RemediationProbe for SystemProbe {
    async fn status(&self, agent: &str) -> RemediationStatus {
        let tool = self.config.tool_for(agent);
        let binary_path = which::which(&tool.binary).ok();

        let authenticated = match &binary_path {
            Some(path) if !tool.auth_check.is_empty() => run_auth_check(path, &tool.auth_check).await,
            _ => None,
        };

        RemediationStatus {
            agent: agent.to_string(),
            binary: tool.binary,
            installed: binary_path.is_some(),
            binary_path,
            authenticated,
        }
    }
}

async fn run_auth_check(binary: &Path, args: &[String]) -> Option<bool> {
    let child = tokio::process::Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    match tokio::time::timeout(AUTH_CHECK_TIMEOUT, child).await {
        Ok(Ok(status)) => Some(status.success()),
        Ok(Err(e)) => {
            tracing::warn!("Auth check for {} failed to run: {}", binary.display(), e);
            None
        }
        Err(_) => {
            tracing::warn!(
                "Auth check for {} timed out after {}s",
                binary.display(),
                AUTH_CHECK_TIMEOUT.as_secs()
            );
            None
        }
    }
}
