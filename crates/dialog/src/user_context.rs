//! Resolving `$context.<key>` from the user's stored context.
//!
//! Home and work locations the assistant does not know yet are asked for
//! once and remembered.

use crate::context::Turn;
use crate::flow::{FlowOutcome, FlowResult};
use rulecraft_core::{Command, Error, Prompt, Result, Value, ValueCategory};
use tracing::{debug, info};

#[derive(Debug)]
pub struct UserContextDialog {
    key: String,
    prompt: Option<Prompt>,
}

impl UserContextDialog {
    /// `key` is the part after `$context.`, e.g. `location.home`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            prompt: None,
        }
    }

    pub fn expecting(&self) -> Option<&ValueCategory> {
        self.prompt.as_ref().map(|p| &p.category)
    }

    fn question(&self) -> Option<&'static str> {
        match self.key.as_str() {
            "location.home" => Some("What is your home address?"),
            "location.work" => Some("What is your work address?"),
            _ => None,
        }
    }

    pub async fn start(&mut self, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        if let Some(value) = turn.caps.user_context.read(&self.key).await? {
            debug!(key = %self.key, "Context value found");
            return Ok(FlowOutcome::Complete(FlowResult::Value(value)));
        }
        let Some(question) = self.question() else {
            return Err(Error::resolution_failed(
                format!("$context.{}", self.key),
                "no value is known",
            ));
        };
        let prompt = Prompt::new(ValueCategory::Location, question);
        self.prompt = Some(prompt.clone());
        Ok(FlowOutcome::Ask(prompt))
    }

    pub async fn handle(&mut self, command: Command, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        let Some(prompt) = self.prompt.clone() else {
            return self.start(turn).await;
        };
        match command {
            Command::Answer(value @ Value::Location(_)) => {
                turn.caps.user_context.store(&self.key, value.clone()).await?;
                info!(key = %self.key, "Stored context value");
                Ok(FlowOutcome::Complete(FlowResult::Value(value)))
            }
            _ => {
                turn.reply("Sorry, I need a location.");
                Ok(FlowOutcome::Ask(prompt))
            }
        }
    }
}
