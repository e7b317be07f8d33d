//! Slot filling: asking for whatever an invocation is still missing.
//!
//! The machine first concretizes placeholders (contacts, user context), then
//! asks for unbound slots, both in slot order. Each question's modality is
//! derived from the slot type.

use crate::assign::assign_slots;
use crate::concretize::{Placeholder, classify};
use crate::contact_search::ContactSearchDialog;
use crate::context::Turn;
use crate::flow::{Flow, FlowOutcome, FlowResult};
use crate::user_context::UserContextDialog;
use rulecraft_codegen::describe::{MISSING, Template, describe_value};
use rulecraft_core::{
    Command, Comparison, Error, Invocation, Prompt, Resolved, Result, Scope, Slot, Type, Value,
    ValueCategory,
};
use std::collections::VecDeque;
use tracing::{debug, warn};

pub(crate) const CHOOSE_AGAIN: &str = "Please click on one of the provided choices.";

#[derive(Debug)]
pub struct SlotFillingDialog {
    slots: Vec<Slot>,
    values: Vec<Option<Value>>,
    comparisons: Vec<Comparison>,
    to_concretize: VecDeque<usize>,
    to_fill: VecDeque<usize>,
    /// The slot a question or sub-flow is outstanding for.
    resolving: Option<usize>,
    /// Values behind the options of a multiple-choice question.
    choices: Vec<Value>,
    prompt: Option<Prompt>,
    done: bool,
}

impl SlotFillingDialog {
    pub fn new(
        slots: Vec<Slot>,
        prefilled: &[Comparison],
        fill_all: bool,
        must_fill: &[String],
        scope: &mut Scope,
    ) -> Result<Self> {
        let assignment = assign_slots(&slots, prefilled, fill_all, must_fill, scope)?;
        Ok(Self {
            to_concretize: assignment.to_concretize().into(),
            to_fill: assignment.to_fill.into(),
            values: assignment.values,
            comparisons: assignment.comparisons,
            slots,
            resolving: None,
            choices: Vec::new(),
            prompt: None,
            done: false,
        })
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn comparisons(&self) -> &[Comparison] {
        &self.comparisons
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn expecting(&self) -> Option<&ValueCategory> {
        self.resolving
            .and(self.prompt.as_ref())
            .map(|prompt| &prompt.category)
    }

    fn result(&self) -> FlowResult {
        FlowResult::Slots {
            values: self.values.clone(),
            comparisons: self.comparisons.clone(),
        }
    }

    /// Take the next step: concretize, ask, or complete.
    ///
    /// Once complete the machine is inert and keeps returning the same
    /// result.
    pub async fn advance(&mut self, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        if self.done {
            return Ok(FlowOutcome::Complete(self.result()));
        }

        while let Some(index) = self.to_concretize.pop_front() {
            self.resolving = Some(index);
            if let Some(outcome) = self.concretize(index) {
                return Ok(outcome);
            }
            self.resolving = None;
        }

        if let Some(index) = self.to_fill.pop_front() {
            self.resolving = Some(index);
            return self.ask(index, turn).await;
        }

        self.done = true;
        self.resolving = None;
        self.prompt = None;
        Ok(FlowOutcome::Complete(self.result()))
    }

    /// Start the sub-flow that turns the placeholder at `index` into a
    /// value; `None` if it is left for code generation.
    fn concretize(&self, index: usize) -> Option<FlowOutcome> {
        let Some(Value::VarRef(name)) = &self.values[index] else {
            return None;
        };
        let flow = match classify(name) {
            Placeholder::Contact(contact) => Flow::ContactSearch(ContactSearchDialog::new(
                contact,
                self.slots[index].ty.clone(),
            )),
            Placeholder::Context(key) => Flow::UserContext(UserContextDialog::new(key)),
            Placeholder::Symbol => return None,
        };
        debug!(slot = %self.slots[index].name, placeholder = %name, "Concretizing");
        Some(FlowOutcome::Push(Box::new(flow)))
    }

    /// The slot's question, with earlier values filled in.
    fn question(&self, index: usize) -> String {
        let slot = &self.slots[index];
        let Some(question) = &slot.question else {
            return format!("What is the value of argument {}?", slot.canonical);
        };
        Template::parse(question).render(|name| {
            match self.slots.iter().position(|s| s.name == name) {
                Some(i) => self.values[i]
                    .as_ref()
                    .map_or_else(|| MISSING.to_string(), describe_value),
                None => format!("${name}"),
            }
        })
    }

    async fn ask(&mut self, index: usize, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        let question = self.question(index);
        let ty = self.slots[index].ty.clone();
        self.choices.clear();

        let category = match ty {
            Type::String => ValueCategory::RawString,
            Type::Measure(unit) => ValueCategory::Measure(unit),
            Type::Number => ValueCategory::Number,
            Type::Boolean => ValueCategory::YesNo,
            Type::Date => ValueCategory::Date,
            Type::Picture => ValueCategory::Picture,
            Type::Location => ValueCategory::Location,
            Type::PhoneNumber => ValueCategory::PhoneNumber,
            Type::EmailAddress => ValueCategory::EmailAddress,
            Type::Enum(Some(entries)) => {
                self.choices = entries.iter().cloned().map(Value::Enum).collect();
                return Ok(self.ask_prompt(Prompt::multiple_choice(question, "choice", entries)));
            }
            Type::Feed => {
                let Some(messaging) = &turn.caps.messaging else {
                    turn.reply("Messaging is not available, cannot choose a feed.");
                    return Ok(FlowOutcome::SwitchToDefault);
                };
                let feeds = messaging.feeds().await?;
                let titles: Vec<String> = feeds.iter().map(|f| f.name.clone()).collect();
                self.choices = feeds.into_iter().map(Value::Feed).collect();
                return Ok(self.ask_prompt(Prompt::multiple_choice(question, "feed", titles)));
            }
            ty @ (Type::Any | Type::Enum(None) | Type::Array(_)) => {
                return Err(Error::UnsupportedSlotType {
                    slot: self.slots[index].name.clone(),
                    ty,
                });
            }
        };
        Ok(self.ask_prompt(Prompt::new(category, question)))
    }

    fn ask_prompt(&mut self, prompt: Prompt) -> FlowOutcome {
        self.prompt = Some(prompt.clone());
        FlowOutcome::Ask(prompt)
    }

    fn reask(&self) -> Result<FlowOutcome> {
        self.prompt
            .clone()
            .map(FlowOutcome::Ask)
            .ok_or_else(|| Error::Internal("slot filling has no question to repeat".into()))
    }

    pub async fn handle(&mut self, command: Command, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        let Some(index) = self.resolving else {
            return self.advance(turn).await;
        };
        let Some(category) = self.expecting().cloned() else {
            return self.advance(turn).await;
        };

        let value = match (category, command) {
            (ValueCategory::YesNo, Command::Yes) => Value::Boolean(true),
            (ValueCategory::YesNo, Command::No) => Value::Boolean(false),
            (ValueCategory::MultipleChoice, Command::Answer(Value::Number(n))) => {
                match choice_index(n, self.choices.len()) {
                    Some(i) => self.choices[i].clone(),
                    None => {
                        turn.reply(CHOOSE_AGAIN);
                        return self.reask();
                    }
                }
            }
            (ValueCategory::MultipleChoice, _) => {
                turn.reply(CHOOSE_AGAIN);
                return self.reask();
            }
            (_, Command::Answer(value)) => value,
            (category, other) => {
                warn!(?category, command = ?other, "Unexpected command while filling a slot");
                return self.reask();
            }
        };

        let slot = &self.slots[index];
        if let Err(e) = slot.accepts(&value) {
            turn.reply(format!(
                "Sorry, that is not a valid value for {}: {e}.",
                slot.canonical
            ));
            return self.reask();
        }
        self.bind(index, value, turn).await
    }

    pub async fn handle_raw(&mut self, text: &str, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        match (self.resolving, self.expecting()) {
            (Some(index), Some(ValueCategory::RawString)) => {
                self.bind(index, Value::String(text.to_string()), turn).await
            }
            _ => self.reask(),
        }
    }

    /// Store an answer; a placeholder answer is concretized at the same index.
    async fn bind(&mut self, index: usize, value: Value, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        debug!(slot = %self.slots[index].name, "Slot answered");
        self.values[index] = Some(value);
        self.choices.clear();
        self.prompt = None;
        if let Some(outcome) = self.concretize(index) {
            return Ok(outcome);
        }
        self.resolving = None;
        self.advance(turn).await
    }

    /// A concretization sub-flow finished.
    pub async fn on_resume(&mut self, result: FlowResult, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        if let (Some(index), FlowResult::Value(value)) = (self.resolving, result) {
            let slot = &self.slots[index];
            slot.accepts(&value).map_err(|source| Error::TypeMismatch {
                slot: slot.name.clone(),
                source,
            })?;
            self.values[index] = Some(value);
        }
        self.resolving = None;
        self.advance(turn).await
    }
}

/// Validate a multiple-choice answer: integral and in `0..len`.
pub(crate) fn choice_index(n: f64, len: usize) -> Option<usize> {
    (n.fract() == 0.0 && n >= 0.0 && n < len as f64).then_some(n as usize)
}

/// How [`resolve_invocation`] left things.
#[derive(Debug)]
pub enum Resolution {
    /// Values were copied into the invocation without asking anything.
    Resolved,
    /// The dialog needs the user; push it and process `outcome`.
    Suspended {
        dialog: Box<SlotFillingDialog>,
        outcome: FlowOutcome,
    },
}

/// Resolve an invocation's arguments, synchronously when possible.
pub async fn resolve_invocation(
    invocation: &mut Invocation,
    fill_all: bool,
    must_fill: &[String],
    scope: &mut Scope,
    turn: &mut Turn<'_>,
) -> Result<Resolution> {
    if invocation.is_resolved() {
        return Ok(Resolution::Resolved);
    }

    let mut dialog = SlotFillingDialog::new(
        invocation.schema.slots.clone(),
        &invocation.args,
        fill_all,
        must_fill,
        scope,
    )?;
    match dialog.advance(turn).await? {
        FlowOutcome::Complete(FlowResult::Slots { values, comparisons }) => {
            invocation.resolved = Some(Resolved { values, comparisons });
            Ok(Resolution::Resolved)
        }
        outcome => Ok(Resolution::Suspended {
            dialog: Box::new(dialog),
            outcome,
        }),
    }
}
