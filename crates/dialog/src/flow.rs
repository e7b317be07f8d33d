//! The dialog stack's unit of work.
//!
//! A [`Flow`] never calls another flow. When it needs a sub-dialog it returns
//! [`FlowOutcome::Push`], and the session starts the child; when the child
//! completes, the session pops it and hands its [`FlowResult`] to the parent's
//! `on_resume`.

use crate::context::{Capabilities, Turn};
use crate::contact_search::ContactSearchDialog;
use crate::default::DefaultDialog;
use crate::discovery::DiscoveryDialog;
use crate::list::ListDialog;
use crate::rule::RuleDialog;
use crate::slot_filling::SlotFillingDialog;
use crate::user_context::UserContextDialog;
use rulecraft_codegen::GeneratedProgram;
use rulecraft_core::{Command, Comparison, DiscoveredDevice, Prompt, Result, Value, ValueCategory};

/// What a flow produced when it finished.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowResult {
    /// Slot filling: values parallel to the slots, and leftover predicates.
    Slots {
        values: Vec<Option<Value>>,
        comparisons: Vec<Comparison>,
    },
    /// A single concrete value (contact search, user context).
    Value(Value),
    Program(GeneratedProgram),
    Device(DiscoveredDevice),
    Nothing,
}

/// What the session should do after a flow step.
#[derive(Debug)]
pub enum FlowOutcome {
    /// Send the question and wait for the answer.
    Ask(Prompt),
    /// Push a child flow and start it.
    Push(Box<Flow>),
    /// Push a child flow that already took its first step.
    Suspend {
        flow: Box<Flow>,
        outcome: Box<FlowOutcome>,
    },
    /// Pop this flow and resume the parent with the result.
    Complete(FlowResult),
    /// Nothing more to do this turn.
    Handled,
    /// Unwind the whole stack.
    SwitchToDefault,
}

/// Every kind of flow a session can run.
#[derive(Debug)]
pub enum Flow {
    Default(DefaultDialog),
    Rule(Box<RuleDialog>),
    SlotFilling(Box<SlotFillingDialog>),
    ContactSearch(ContactSearchDialog),
    UserContext(UserContextDialog),
    Discovery(DiscoveryDialog),
    List(ListDialog),
}

impl Default for Flow {
    fn default() -> Self {
        Flow::Default(DefaultDialog)
    }
}

impl Flow {
    pub fn name(&self) -> &'static str {
        match self {
            Flow::Default(_) => "default",
            Flow::Rule(_) => "rule",
            Flow::SlotFilling(_) => "slot_filling",
            Flow::ContactSearch(_) => "contact_search",
            Flow::UserContext(_) => "user_context",
            Flow::Discovery(_) => "discovery",
            Flow::List(_) => "list",
        }
    }

    /// The answer modality this flow is waiting for, if any.
    pub fn expecting(&self) -> Option<&ValueCategory> {
        match self {
            Flow::Default(_) => None,
            Flow::Rule(d) => d.expecting(),
            Flow::SlotFilling(d) => d.expecting(),
            Flow::ContactSearch(d) => d.expecting(),
            Flow::UserContext(d) => d.expecting(),
            Flow::Discovery(d) => d.expecting(),
            Flow::List(d) => d.expecting(),
        }
    }

    /// First step after being pushed.
    pub async fn start(&mut self, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        match self {
            Flow::Default(_) => Ok(FlowOutcome::Handled),
            Flow::Rule(d) => d.start(turn).await,
            Flow::SlotFilling(d) => d.advance(turn).await,
            Flow::ContactSearch(d) => d.start(turn).await,
            Flow::UserContext(d) => d.start(turn).await,
            Flow::Discovery(d) => d.start(turn).await,
            Flow::List(d) => d.start(turn).await,
        }
    }

    pub async fn handle(&mut self, command: Command, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        match self {
            Flow::Default(d) => d.handle(command, turn).await,
            Flow::Rule(d) => d.handle(command, turn).await,
            Flow::SlotFilling(d) => d.handle(command, turn).await,
            Flow::ContactSearch(d) => d.handle(command, turn).await,
            Flow::UserContext(d) => d.handle(command, turn).await,
            Flow::Discovery(d) => d.handle(command, turn).await,
            Flow::List(d) => d.handle(command, turn).await,
        }
    }

    /// Free text typed in answer to a `RawString` question.
    pub async fn handle_raw(&mut self, text: &str, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        match self {
            Flow::SlotFilling(d) => d.handle_raw(text, turn).await,
            Flow::Discovery(d) => d.handle_raw(text, turn).await,
            _ => {
                turn.reply("Sorry, I did not understand that.");
                Ok(FlowOutcome::Handled)
            }
        }
    }

    /// A child flow completed with `result`.
    pub async fn on_resume(
        &mut self,
        result: FlowResult,
        turn: &mut Turn<'_>,
    ) -> Result<FlowOutcome> {
        match self {
            Flow::Default(d) => d.on_resume(result, turn),
            Flow::Rule(d) => d.on_resume(result, turn).await,
            Flow::SlotFilling(d) => d.on_resume(result, turn).await,
            // These never push children.
            Flow::ContactSearch(_) | Flow::UserContext(_) | Flow::Discovery(_) | Flow::List(_) => {
                Ok(FlowOutcome::Handled)
            }
        }
    }

    /// The flow is being discarded (cancel, reset or an error).
    pub async fn stop(&mut self, caps: &Capabilities) {
        if let Flow::Discovery(d) = self {
            d.stop(caps).await;
        }
    }
}
