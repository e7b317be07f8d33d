//! One conversation: a stack of flows driven by user commands.
//!
//! Each entry point runs a single turn and returns the replies it produced.
//! Generic commands (cancel, reset, help) are handled here before any flow
//! sees them, and a command of the wrong modality for the pending question
//! is rejected without touching the stack.

use crate::context::{Capabilities, Turn};
use crate::flow::{Flow, FlowOutcome, FlowResult};
use crate::slot_filling::CHOOSE_AGAIN;
use chrono::Utc;
use rulecraft_core::{
    Command, CommandParser, DialogEvent, Error, EventBus, Prompt, Reply, Result, ValueCategory,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const NOT_UNDERSTOOD: &str = "Sorry, I did not understand that.";

const GENERAL_HELP: &str = "Tell me what you want automated, for example \
    \"when the temperature is above 25 C, notify me\". You can also ask me \
    to list your devices or to discover new ones.";

pub struct Session {
    id: String,
    caps: Arc<Capabilities>,
    events: Arc<EventBus>,
    parser: Option<Arc<dyn CommandParser>>,
    /// Never empty; the default flow sits at the bottom.
    stack: Vec<Flow>,
    /// The question the user is expected to answer.
    pending: Option<Prompt>,
}

impl Session {
    pub fn new(caps: Arc<Capabilities>, events: Arc<EventBus>) -> Self {
        let id = caps.ids.next_id("session");
        info!(session_id = %id, "Session started");
        Self {
            id,
            caps,
            events,
            parser: None,
            stack: vec![Flow::default()],
            pending: None,
        }
    }

    /// Use `parser` for free-text input.
    pub fn with_parser(mut self, parser: Arc<dyn CommandParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pending(&self) -> Option<&Prompt> {
        self.pending.as_ref()
    }

    /// Number of flows on the stack, the default flow included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current_flow(&self) -> &'static str {
        self.stack.last().map_or("default", Flow::name)
    }

    /// Process one structured command.
    ///
    /// Recoverable failures are reported to the user and unwind the stack;
    /// programming and configuration errors also unwind, then are returned.
    pub async fn handle_command(&mut self, command: Command) -> Result<Vec<Reply>> {
        let caps = Arc::clone(&self.caps);
        let mut replies = Vec::new();
        let mut turn = Turn::new(&caps, &mut replies);
        debug!(session_id = %self.id, ?command, flow = self.current_flow(), "Command");

        match command {
            Command::Cancel => {
                self.unwind(Some("cancelled")).await;
                turn.reply("Cancelled.");
            }
            Command::Reset => self.unwind(None).await,
            Command::Help => self.help(&mut turn),
            command => {
                if let Some(prompt) = self.mismatch(&command) {
                    debug!(session_id = %self.id, expecting = %prompt.category, "Modality mismatch");
                    turn.reply(hint(&prompt.category));
                    turn.push(Reply::Question { prompt });
                } else {
                    let outcome = self.top().handle(command, &mut turn).await;
                    self.drive(outcome, &mut turn).await?;
                }
            }
        }
        Ok(replies)
    }

    /// Process free text: the answer to a raw-text question, or an utterance
    /// for the parser.
    pub async fn handle_raw(&mut self, text: &str) -> Result<Vec<Reply>> {
        let expecting_text = self
            .pending
            .as_ref()
            .is_some_and(|p| p.category == ValueCategory::RawString);
        if expecting_text {
            let caps = Arc::clone(&self.caps);
            let mut replies = Vec::new();
            let mut turn = Turn::new(&caps, &mut replies);
            let outcome = self.top().handle_raw(text, &mut turn).await;
            self.drive(outcome, &mut turn).await?;
            return Ok(replies);
        }

        let Some(parser) = self.parser.clone() else {
            return Ok(vec![Reply::text(NOT_UNDERSTOOD)]);
        };
        let expecting = self.pending.as_ref().map(|p| &p.category);
        let choices = self
            .pending
            .as_ref()
            .map(Prompt::choice_titles)
            .unwrap_or_default();

        let candidates = match parser.parse(text, expecting, &choices).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(session_id = %self.id, "Parser failed: {e}");
                return Ok(vec![Reply::text(format!("Sorry, I could not process that: {e}."))]);
            }
        };
        let Some(best) = candidates.first() else {
            return Ok(vec![Reply::text(NOT_UNDERSTOOD)]);
        };
        match best.command() {
            Ok(command) => self.handle_command(command).await,
            Err(e) => {
                warn!(session_id = %self.id, answer = %best.answer, "Unusable parse: {e}");
                Ok(vec![Reply::text(NOT_UNDERSTOOD)])
            }
        }
    }

    /// Tell the parser what an utterance should have meant.
    pub fn teach(&self, utterance: &str, target: &Command) {
        if let Some(parser) = &self.parser {
            parser.learn(utterance, target);
        }
    }

    fn top(&mut self) -> &mut Flow {
        if self.stack.is_empty() {
            self.stack.push(Flow::default());
        }
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// The pending prompt, if `command` is not an acceptable answer to it.
    fn mismatch(&self, command: &Command) -> Option<Prompt> {
        let prompt = self.pending.as_ref()?;
        (!prompt.category.accepts(command)).then(|| prompt.clone())
    }

    fn help(&self, turn: &mut Turn<'_>) {
        match &self.pending {
            Some(prompt) => {
                turn.reply(hint(&prompt.category));
                turn.push(Reply::Question {
                    prompt: prompt.clone(),
                });
            }
            None => turn.reply(GENERAL_HELP),
        }
    }

    /// Apply flow outcomes until the turn needs the user again.
    async fn drive(&mut self, first: Result<FlowOutcome>, turn: &mut Turn<'_>) -> Result<()> {
        let mut next = first;
        loop {
            let outcome = match next {
                Ok(outcome) => outcome,
                Err(e) => return self.fail(e, turn).await,
            };
            next = match outcome {
                FlowOutcome::Ask(prompt) => {
                    self.pending = Some(prompt.clone());
                    turn.push(Reply::Question { prompt });
                    return Ok(());
                }
                FlowOutcome::Handled => return Ok(()),
                FlowOutcome::Push(flow) => {
                    self.push(*flow);
                    self.top().start(turn).await
                }
                FlowOutcome::Suspend { flow, outcome } => {
                    self.push(*flow);
                    Ok(*outcome)
                }
                FlowOutcome::Complete(result) => {
                    self.pending = None;
                    if self.stack.len() <= 1 {
                        return Ok(());
                    }
                    if let Some(done) = self.stack.pop() {
                        self.events.publish(DialogEvent::FlowCompleted {
                            session_id: self.id.clone(),
                            flow: done.name().to_string(),
                            timestamp: Utc::now(),
                        });
                    }
                    self.announce(&result);
                    self.top().on_resume(result, turn).await
                }
                FlowOutcome::SwitchToDefault => {
                    self.unwind(Some("reverted")).await;
                    return Ok(());
                }
            };
        }
    }

    fn push(&mut self, flow: Flow) {
        self.pending = None;
        let name = flow.name();
        self.stack.push(flow);
        debug!(session_id = %self.id, flow = name, depth = self.stack.len(), "Flow pushed");
        self.events.publish(DialogEvent::FlowPushed {
            session_id: self.id.clone(),
            flow: name.to_string(),
            depth: self.stack.len(),
            timestamp: Utc::now(),
        });
    }

    fn announce(&self, result: &FlowResult) {
        match result {
            FlowResult::Program(program) => self.events.publish(DialogEvent::ProgramGenerated {
                session_id: self.id.clone(),
                app_id: program.id.clone(),
                name: program.name.clone(),
                code: program.code.clone(),
                timestamp: Utc::now(),
            }),
            FlowResult::Device(device) => self.events.publish(DialogEvent::DeviceSelected {
                session_id: self.id.clone(),
                device_id: device.id.clone(),
                kind: device.kind.clone(),
                timestamp: Utc::now(),
            }),
            _ => {}
        }
    }

    /// Stop and pop everything above the default flow.
    async fn unwind(&mut self, reason: Option<&str>) {
        self.pending = None;
        if self.stack.len() <= 1 {
            return;
        }
        while self.stack.len() > 1 {
            if let Some(mut flow) = self.stack.pop() {
                flow.stop(&self.caps).await;
            }
        }
        if let Some(reason) = reason {
            info!(session_id = %self.id, reason, "Dialog aborted");
            self.events.publish(DialogEvent::FlowAborted {
                session_id: self.id.clone(),
                reason: reason.to_string(),
                timestamp: Utc::now(),
            });
        }
    }

    async fn fail(&mut self, error: Error, turn: &mut Turn<'_>) -> Result<()> {
        let recoverable = error.is_recoverable();
        warn!(session_id = %self.id, recoverable, "Request failed: {error}");
        if recoverable {
            turn.reply(format!("Sorry, that did not work: {error}."));
        }
        self.unwind(Some(&error.to_string())).await;
        if recoverable { Ok(()) } else { Err(error) }
    }
}

/// What to say when the answer did not have the expected shape.
fn hint(category: &ValueCategory) -> String {
    match category {
        ValueCategory::YesNo => "Just answer yes or no.".into(),
        ValueCategory::MultipleChoice => CHOOSE_AGAIN.into(),
        ValueCategory::RawString => "Just type your answer.".into(),
        ValueCategory::Number => "Please give me a number.".into(),
        ValueCategory::Measure(unit) => format!("Please give me a value in {unit}."),
        ValueCategory::Date => "Please give me a date.".into(),
        ValueCategory::Picture => "Please give me a picture.".into(),
        ValueCategory::Location => "Please give me a location.".into(),
        ValueCategory::PhoneNumber => "Please give me a phone number.".into(),
        ValueCategory::EmailAddress => "Please give me an email address.".into(),
    }
}
