//! Out-of-band user input requests raised by the execution backend.
//!
//! These are distinct from normal phase output: the backend pauses a node
//! and asks the operator for a value, correlated by `requestId`.

use crate::domain::types::RequestId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Text,
    Textarea,
    Number,
    Select,
}

impl InputType {
    /// Length bounds only apply to free-text inputs.
    pub fn is_free_text(self) -> bool {
        matches!(self, InputType::Text | InputType::Textarea)
    }
}

/// Length bounds, counted in characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputValidation {
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputOption {
    pub value: String,
    pub label: String,
}

/// A value typed by the operator (or seeded from a default).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputAnswer {
    Number(f64),
    Text(String),
}

impl InputAnswer {
    pub fn is_blank(&self) -> bool {
        match self {
            InputAnswer::Number(_) => false,
            InputAnswer::Text(text) => text.trim().is_empty(),
        }
    }
}

impl From<&str> for InputAnswer {
    fn from(s: &str) -> Self {
        InputAnswer::Text(s.to_string())
    }
}

impl std::fmt::Display for InputAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputAnswer::Number(n) => write!(f, "{}", n),
            InputAnswer::Text(text) => write!(f, "{}", text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInputRequest {
    pub request_id: RequestId,
    pub node_id: String,
    pub node_name: String,
    pub prompt: String,
    pub input_type: InputType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub validation: Option<InputValidation>,
    #[serde(default)]
    pub options: Vec<InputOption>,
    #[serde(default)]
    pub default_value: Option<InputAnswer>,
}

impl UserInputRequest {
    /// The value the answer buffer starts with.
    ///
    /// Number inputs without a default start undefined; every other type
    /// starts with empty text.
    pub fn initial_answer(&self) -> Option<InputAnswer> {
        if let Some(default) = &self.default_value {
            return Some(default.clone());
        }
        match self.input_type {
            InputType::Number => None,
            InputType::Text | InputType::Textarea | InputType::Select => {
                Some(InputAnswer::Text(String::new()))
            }
        }
    }
}
