//! Static workflow definition referenced by a run.

use crate::domain::types::PhaseNumber;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDefinition {
    pub number: PhaseNumber,
    pub name: String,
    pub agent: String,
    #[serde(default)]
    pub requires_approval: bool,
    /// Skill attached to the phase's agent, if any.
    #[serde(default)]
    pub skill: Option<String>,
}

/// Ordered phase list of a workflow plus its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub phases: Vec<PhaseDefinition>,
}

impl WorkflowDefinition {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow definition: {}", path.display()))?;
        let definition: Self = serde_yaml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse workflow definition as YAML: {}",
                path.display()
            )
        })?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn validate(&self) -> Result<()> {
        if self.phases.is_empty() {
            bail!("Workflow '{}' defines no phases", self.id);
        }
        let mut seen = HashSet::new();
        for phase in &self.phases {
            if !seen.insert(phase.number) {
                bail!(
                    "Workflow '{}' defines phase {} more than once",
                    self.id,
                    phase.number
                );
            }
        }
        Ok(())
    }

    pub fn phase(&self, number: PhaseNumber) -> Option<&PhaseDefinition> {
        self.phases.iter().find(|p| p.number == number)
    }

    /// Phases unknown to the definition never require approval.
    pub fn requires_approval(&self, number: PhaseNumber) -> bool {
        self.phase(number).is_some_and(|p| p.requires_approval)
    }
}
