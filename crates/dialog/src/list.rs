//! "List my devices" and "what can you do".

use crate::context::Turn;
use crate::flow::FlowOutcome;
use crate::slot_filling::{CHOOSE_AGAIN, choice_index};
use rulecraft_codegen::describe_invocation;
use rulecraft_core::{Command, Invocation, ListKind, Prompt, Result, Value, ValueCategory};
use std::collections::BTreeSet;

const CHOICES: [ListKind; 2] = [ListKind::Device, ListKind::Command];

#[derive(Debug)]
pub struct ListDialog {
    what: Option<ListKind>,
    prompt: Option<Prompt>,
}

impl ListDialog {
    pub fn new(what: Option<ListKind>) -> Self {
        Self { what, prompt: None }
    }

    pub fn expecting(&self) -> Option<&ValueCategory> {
        self.prompt.as_ref().map(|p| &p.category)
    }

    pub async fn start(&mut self, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        match self.what {
            Some(ListKind::Device) => list_devices(turn).await,
            Some(ListKind::Command) => list_commands(turn).await,
            None => {
                let prompt = Prompt::multiple_choice(
                    "What do you want me to list?",
                    "list",
                    ["devices", "commands"],
                );
                self.prompt = Some(prompt.clone());
                Ok(FlowOutcome::Ask(prompt))
            }
        }
    }

    pub async fn handle(&mut self, command: Command, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        let Some(prompt) = self.prompt.clone() else {
            return self.start(turn).await;
        };
        match command {
            Command::Answer(Value::Number(n)) => {
                match choice_index(n, CHOICES.len()) {
                    Some(i) => {
                        self.what = Some(CHOICES[i]);
                        self.prompt = None;
                        self.start(turn).await
                    }
                    None => {
                        turn.reply(CHOOSE_AGAIN);
                        Ok(FlowOutcome::Ask(prompt))
                    }
                }
            }
            Command::List { what: Some(what) } => {
                self.what = Some(what);
                self.prompt = None;
                self.start(turn).await
            }
            _ => Ok(FlowOutcome::Ask(prompt)),
        }
    }
}

async fn list_devices(turn: &mut Turn<'_>) -> Result<FlowOutcome> {
    let devices: Vec<_> = turn
        .caps
        .devices
        .devices()
        .await
        .into_iter()
        .filter(|d| !d.is_system())
        .collect();
    if devices.is_empty() {
        turn.reply("You don't have any device set up yet.");
    } else {
        turn.reply("You have the following devices:");
        for device in devices {
            turn.reply(format!("{} ({})", device.name, device.kind));
        }
    }
    Ok(FlowOutcome::SwitchToDefault)
}

async fn list_commands(turn: &mut Turn<'_>) -> Result<FlowOutcome> {
    let kinds: BTreeSet<String> = turn
        .caps
        .devices
        .devices()
        .await
        .into_iter()
        .filter(|d| !d.is_system())
        .map(|d| d.kind)
        .collect();
    if kinds.is_empty() {
        turn.reply("You don't have any device set up yet.");
        turn.reply("Try adding some devices first.");
        return Ok(FlowOutcome::SwitchToDefault);
    }

    let kinds: Vec<String> = kinds.into_iter().collect();
    let schemas = turn.caps.schemas.schemas_for(&kinds).await;
    turn.reply("Here's what I can do for you.");
    for schema in schemas {
        let channel_type = schema.channel_type;
        let invocation = Invocation::new(schema, Vec::new());
        turn.reply(format!("{channel_type}: {}", describe_invocation(&invocation)));
    }
    Ok(FlowOutcome::SwitchToDefault)
}
