//! CommandParser trait: the abstraction over the semantic-parsing service.

use crate::command::{Command, ValueCategory};
use crate::error::ParserError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One ranked interpretation of an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// The command, as a JSON document.
    pub answer: String,
    #[serde(default)]
    pub prob: f64,
    #[serde(default)]
    pub score: f64,
}

impl Candidate {
    pub fn command(&self) -> Result<Command, ParserError> {
        serde_json::from_str(&self.answer).map_err(|e| ParserError::Malformed(e.to_string()))
    }
}

/// Turns utterances into ranked candidate commands.
#[async_trait]
pub trait CommandParser: Send + Sync {
    /// Parse `utterance`, hinting the expected answer modality and the
    /// labels of a pending multiple-choice question.
    async fn parse(
        &self,
        utterance: &str,
        expecting: Option<&ValueCategory>,
        choices: &[String],
    ) -> Result<Vec<Candidate>, ParserError>;

    /// Teach the service that `utterance` means `target`. Fire-and-forget.
    fn learn(&self, utterance: &str, target: &Command);
}
