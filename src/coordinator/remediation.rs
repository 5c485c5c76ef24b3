//! Classifies phase failures into recoverable remediations.

use crate::config::RemediationConfig;
use crate::domain::RemediationKind;
use anyhow::{Context, Result};
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: RemediationKind,
    /// The error line that matched.
    pub detail: String,
}

/// Ordered signature list; the first matching signature wins.
pub struct ErrorClassifier {
    signatures: Vec<(RemediationKind, Regex)>,
}

impl ErrorClassifier {
    pub fn new(config: &RemediationConfig) -> Result<Self> {
        let signatures = config
            .signatures
            .iter()
            .map(|signature| {
                Regex::new(&signature.pattern)
                    .map(|regex| (signature.kind, regex))
                    .with_context(|| {
                        format!(
                            "Invalid {} signature pattern: {}",
                            signature.kind.display_name(),
                            signature.pattern
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { signatures })
    }

    /// Returns `None` for terminal (unrecognized) failures.
    pub fn classify(&self, error: &str) -> Option<Classification> {
        self.signatures.iter().find_map(|(kind, regex)| {
            let found = regex.find(error)?;
            let detail = error
                .lines()
                .find(|line| regex.is_match(line))
                .unwrap_or(found.as_str())
                .trim()
                .to_string();
            Some(Classification {
                kind: *kind,
                detail,
            })
        })
    }
}
