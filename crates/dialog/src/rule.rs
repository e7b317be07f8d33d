//! Turning a parsed rule (or a lone trigger, query or action) into a program.
//!
//! Each present part is looked up, then resolved in order trigger, query,
//! action over one shared scope, so that later parts can refer to what
//! earlier parts produce. Once everything is resolved the program is
//! generated and, unless disabled, confirmed with the user.

use crate::context::Turn;
use crate::flow::{Flow, FlowOutcome, FlowResult};
use crate::slot_filling::{Resolution, resolve_invocation};
use rulecraft_codegen::{GeneratedProgram, describe_program, generate_program};
use rulecraft_core::{
    ChannelType, Command, Error, Intent, Invocation, Prompt, Resolved, Result, Scope,
    ValueCategory,
};
use tracing::{debug, info};

const ROLES: [ChannelType; 3] = [ChannelType::Trigger, ChannelType::Query, ChannelType::Action];

#[derive(Debug)]
pub struct RuleDialog {
    intents: [Option<Intent>; 3],
    invocations: [Option<Invocation>; 3],
    scope: Scope,
    /// The part a pushed slot-filling flow is working on.
    current: Option<usize>,
    program: Option<GeneratedProgram>,
    prompt: Option<Prompt>,
}

impl RuleDialog {
    pub fn new(trigger: Option<Intent>, query: Option<Intent>, action: Option<Intent>) -> Self {
        Self {
            intents: [trigger, query, action],
            invocations: [None, None, None],
            scope: Scope::new(),
            current: None,
            program: None,
            prompt: None,
        }
    }

    pub fn expecting(&self) -> Option<&ValueCategory> {
        self.prompt.as_ref().map(|p| &p.category)
    }

    pub async fn start(&mut self, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        for (i, role) in ROLES.into_iter().enumerate() {
            let Some(intent) = self.intents[i].take() else {
                continue;
            };
            let schema = turn
                .caps
                .schemas
                .get_schema(&intent.kind, &intent.channel, role)
                .await?;
            let mut invocation = Invocation::new(schema, intent.args);
            invocation.id = intent.id;
            invocation.must_fill = intent.must_fill;
            self.invocations[i] = Some(invocation);
        }
        if self.invocations.iter().all(Option::is_none) {
            return Err(Error::ProgramInvalid("nothing to generate".into()));
        }
        self.next(turn).await
    }

    /// Resolve the next unresolved part, or generate once all are.
    async fn next(&mut self, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        for (i, slot) in self.invocations.iter_mut().enumerate() {
            let Some(invocation) = slot.as_mut() else {
                continue;
            };
            // actions take no predicates, so every argument must bind a slot
            let fill_all = ROLES[i] == ChannelType::Action;
            let must_fill = invocation.must_fill.clone();
            match resolve_invocation(invocation, fill_all, &must_fill, &mut self.scope, turn).await? {
                Resolution::Resolved => {}
                Resolution::Suspended { dialog, outcome } => {
                    debug!(part = %ROLES[i], "Waiting on slot filling");
                    self.current = Some(i);
                    return Ok(FlowOutcome::Suspend {
                        flow: Box::new(Flow::SlotFilling(dialog)),
                        outcome: Box::new(outcome),
                    });
                }
            }
        }
        self.finish(turn).await
    }

    async fn finish(&mut self, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        let [trigger, query, action] = &self.invocations;
        let program = generate_program(
            turn.caps.compiler.as_ref(),
            turn.caps.ids.as_ref(),
            trigger.as_ref(),
            query.as_ref(),
            action.as_ref(),
        )
        .await?;

        if !turn.caps.settings.confirm_programs {
            return Ok(FlowOutcome::Complete(FlowResult::Program(program)));
        }
        let description = describe_program(trigger.as_ref(), query.as_ref(), action.as_ref());
        let prompt = Prompt::new(
            ValueCategory::YesNo,
            format!("Ok, so you want me to {description}. Is that right?"),
        );
        self.program = Some(program);
        self.prompt = Some(prompt.clone());
        Ok(FlowOutcome::Ask(prompt))
    }

    pub async fn handle(&mut self, command: Command, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        let Some(prompt) = self.prompt.clone() else {
            return self.next(turn).await;
        };
        match command {
            Command::Yes => {
                self.prompt = None;
                let program = self
                    .program
                    .take()
                    .ok_or_else(|| Error::Internal("confirmed a program that was never generated".into()))?;
                info!(name = %program.name, "Program confirmed");
                Ok(FlowOutcome::Complete(FlowResult::Program(program)))
            }
            Command::No => {
                self.prompt = None;
                self.program = None;
                turn.reply("Ok, I'm not going to do it.");
                Ok(FlowOutcome::SwitchToDefault)
            }
            _ => Ok(FlowOutcome::Ask(prompt)),
        }
    }

    /// A slot-filling flow finished the current part.
    pub async fn on_resume(&mut self, result: FlowResult, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        let (values, comparisons) = match result {
            FlowResult::Slots { values, comparisons } => (values, comparisons),
            other => return Err(Error::Internal(format!("rule flow resumed with {other:?}"))),
        };
        let index = self
            .current
            .take()
            .ok_or_else(|| Error::Internal("rule flow resumed without a pending part".into()))?;
        if let Some(invocation) = self.invocations[index].as_mut() {
            invocation.resolved = Some(Resolved { values, comparisons });
        }
        self.next(turn).await
    }
}
