//! The flow at the bottom of every stack: routes new requests.

use crate::context::Turn;
use crate::discovery::DiscoveryDialog;
use crate::flow::{Flow, FlowOutcome, FlowResult};
use crate::list::ListDialog;
use crate::rule::RuleDialog;
use rulecraft_core::{Command, Reply, Result};
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDialog;

impl DefaultDialog {
    pub async fn handle(&self, command: Command, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        let flow = match command {
            Command::Rule {
                trigger,
                query,
                action,
            } => Flow::Rule(Box::new(RuleDialog::new(trigger, query, action))),
            Command::Trigger(intent) => Flow::Rule(Box::new(RuleDialog::new(Some(intent), None, None))),
            Command::Query(intent) => Flow::Rule(Box::new(RuleDialog::new(None, Some(intent), None))),
            Command::Action(intent) => Flow::Rule(Box::new(RuleDialog::new(None, None, Some(intent)))),
            Command::Discover { name } => Flow::Discovery(DiscoveryDialog::new(name)),
            Command::List { what } => Flow::List(ListDialog::new(what)),
            Command::Yes | Command::No | Command::Answer(_) => {
                turn.reply("Sorry, I did not ask you anything.");
                return Ok(FlowOutcome::Handled);
            }
            // intercepted by the session
            Command::Cancel | Command::Reset | Command::Help => return Ok(FlowOutcome::Handled),
        };
        debug!(flow = flow.name(), "Starting a new request");
        Ok(FlowOutcome::Push(Box::new(flow)))
    }

    /// Deliver what a finished request produced.
    pub fn on_resume(&self, result: FlowResult, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        match result {
            FlowResult::Program(program) => turn.push(Reply::Program {
                name: program.name,
                code: program.code,
            }),
            FlowResult::Device(device) => turn.reply(format!("Ok, let's set up {}.", device.name)),
            FlowResult::Slots { .. } | FlowResult::Value(_) | FlowResult::Nothing => {}
        }
        Ok(FlowOutcome::Handled)
    }
}
