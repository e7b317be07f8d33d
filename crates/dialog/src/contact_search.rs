//! Resolving `$contact(<name>)` through the address book.

use crate::context::Turn;
use crate::flow::{FlowOutcome, FlowResult};
use crate::slot_filling::{CHOOSE_AGAIN, choice_index};
use rulecraft_core::{Command, ContactMatch, Error, Prompt, Result, Type, Value, ValueCategory};
use tracing::debug;

#[derive(Debug)]
pub struct ContactSearchDialog {
    name: String,
    ty: Type,
    candidates: Vec<ContactMatch>,
    prompt: Option<Prompt>,
}

impl ContactSearchDialog {
    /// Search for `name`, producing a value of the slot's type `ty`.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            candidates: Vec::new(),
            prompt: None,
        }
    }

    pub fn expecting(&self) -> Option<&ValueCategory> {
        self.prompt.as_ref().map(|p| &p.category)
    }

    pub async fn start(&mut self, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        let what = format!("contact '{}'", self.name);
        let Some(book) = &turn.caps.address_book else {
            return Err(Error::resolution_failed(what, "no address book is available"));
        };

        let mut matches = book.lookup(&self.ty, &self.name).await?;
        debug!(name = %self.name, found = matches.len(), "Address book lookup");
        match matches.len() {
            0 => Err(Error::resolution_failed(what, "no such contact")),
            1 => Ok(FlowOutcome::Complete(FlowResult::Value(matches.remove(0).value))),
            _ => {
                let titles: Vec<String> = matches
                    .iter()
                    .map(|m| format!("{} ({})", m.display_name, contact_text(&m.value)))
                    .collect();
                let prompt = Prompt::multiple_choice(
                    format!("Multiple contacts match \"{}\". Who do you mean?", self.name),
                    "contact",
                    titles,
                );
                self.candidates = matches;
                self.prompt = Some(prompt.clone());
                Ok(FlowOutcome::Ask(prompt))
            }
        }
    }

    pub async fn handle(&mut self, command: Command, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        let chosen = match command {
            Command::Answer(Value::Number(n)) => choice_index(n, self.candidates.len()),
            _ => None,
        };
        if let Some(i) = chosen {
            let value = self.candidates[i].value.clone();
            return Ok(FlowOutcome::Complete(FlowResult::Value(value)));
        }
        let Some(prompt) = self.prompt.clone() else {
            return self.start(turn).await;
        };
        turn.reply(CHOOSE_AGAIN);
        Ok(FlowOutcome::Ask(prompt))
    }
}

fn contact_text(value: &Value) -> &str {
    match value {
        Value::PhoneNumber(c) | Value::EmailAddress(c) => &c.value,
        _ => "",
    }
}
