use crate::domain::failure::RemediationKind;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a config file to load instead of the default.
pub const CONFIG_ENV_VAR: &str = "PHASECTL_CONFIG";

/// Upper bound for `approval_stall_timeout_secs` (one week).
pub const MAX_APPROVAL_STALL_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

const DEFAULT_CONFIG_YAML: &str = include_str!("../coordinator.yaml");

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoordinatorConfig {
    /// Capacity of the bounded channel between the event subscription and the coordinator.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Seconds to wait for a terminal event after an accepted approve/reject. 0 disables.
    #[serde(default = "default_approval_stall_timeout_secs")]
    pub approval_stall_timeout_secs: u64,
    #[serde(default)]
    pub remediation: RemediationConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

fn default_channel_capacity() -> usize {
    256
}

fn default_approval_stall_timeout_secs() -> u64 {
    300
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            approval_stall_timeout_secs: default_approval_stall_timeout_secs(),
            remediation: RemediationConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemediationConfig {
    #[serde(default = "default_signatures")]
    pub signatures: Vec<SignatureConfig>,
    /// Per-agent CLI used by the remediation status query.
    #[serde(default)]
    pub tools: HashMap<String, ToolConfig>,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            signatures: default_signatures(),
            tools: HashMap::new(),
        }
    }
}

fn default_signatures() -> Vec<SignatureConfig> {
    [
        RemediationKind::ToolNotInstalled,
        RemediationKind::NotAuthenticated,
    ]
    .into_iter()
    .map(|kind| SignatureConfig {
        kind,
        pattern: kind.default_pattern().to_string(),
    })
    .collect()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SignatureConfig {
    pub kind: RemediationKind,
    pub pattern: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ToolConfig {
    pub binary: String,
    /// Arguments for a command that exits 0 when the tool is authenticated.
    #[serde(default)]
    pub auth_check: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuditConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Defaults to `~/.phasectl/audit`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl AuditConfig {
    pub fn resolved_dir(&self) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(config_home()?.join("audit")),
        }
    }
}

/// Returns `~/.phasectl`.
pub fn config_home() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".phasectl"))
}

impl CoordinatorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file as YAML: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses the configuration compiled into the binary.
    pub fn embedded() -> Result<Self> {
        let config: Self = serde_yaml::from_str(DEFAULT_CONFIG_YAML)
            .context("Failed to parse embedded coordinator.yaml")?;
        config.validate()?;
        Ok(config)
    }

    /// Picks the config source: explicit path, then `PHASECTL_CONFIG`,
    /// then `~/.phasectl/config.yaml`, then the embedded defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::load(Path::new(&path));
        }
        if let Ok(home) = config_home() {
            let path = home.join("config.yaml");
            if path.exists() {
                return Self::load(&path);
            }
        }
        Self::embedded()
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be greater than zero");
        }
        if self.approval_stall_timeout_secs > MAX_APPROVAL_STALL_TIMEOUT_SECS {
            anyhow::bail!(
                "approval_stall_timeout_secs must be at most {} (got {})",
                MAX_APPROVAL_STALL_TIMEOUT_SECS,
                self.approval_stall_timeout_secs
            );
        }

        for signature in &self.remediation.signatures {
            Regex::new(&signature.pattern).with_context(|| {
                format!(
                    "Invalid {} signature pattern: {}",
                    signature.kind.display_name(),
                    signature.pattern
                )
            })?;
        }

        for (agent, tool) in &self.remediation.tools {
            if tool.binary.trim().is_empty() {
                anyhow::bail!("Tool for agent '{}' has an empty binary name", agent);
            }
        }

        Ok(())
    }

    pub fn approval_stall_timeout(&self) -> Option<Duration> {
        match self.approval_stall_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Tool settings for an agent; unknown agents use their own name as the binary.
    pub fn tool_for(&self, agent: &str) -> ToolConfig {
        self.remediation
            .tools
            .get(agent)
            .cloned()
            .unwrap_or_else(|| ToolConfig {
                binary: agent.to_string(),
                auth_check: Vec::new(),
            })
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
