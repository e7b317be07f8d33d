//! Finding a nearby device to set up.

use crate::context::{Capabilities, Turn};
use crate::flow::{FlowOutcome, FlowResult};
use crate::slot_filling::{CHOOSE_AGAIN, choice_index};
use rulecraft_core::{Command, DiscoveredDevice, Prompt, Result, Value, ValueCategory};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct DiscoveryDialog {
    name: Option<String>,
    candidates: Vec<DiscoveredDevice>,
    prompt: Option<Prompt>,
    /// Set while a search is in flight, so that a dropped turn still stops it.
    discovering: bool,
}

impl DiscoveryDialog {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn expecting(&self) -> Option<&ValueCategory> {
        self.prompt.as_ref().map(|p| &p.category)
    }

    fn ask(&mut self, prompt: Prompt) -> Result<FlowOutcome> {
        self.prompt = Some(prompt.clone());
        Ok(FlowOutcome::Ask(prompt))
    }

    pub async fn start(&mut self, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        if turn.caps.discovery.is_none() {
            turn.reply("Discovery is not available in this installation.");
            return Ok(FlowOutcome::SwitchToDefault);
        }
        match self.name.clone() {
            Some(name) => self.search(&name, turn).await,
            None => self.ask(Prompt::new(
                ValueCategory::RawString,
                "What device do you want to discover?",
            )),
        }
    }

    async fn search(&mut self, name: &str, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        let caps = turn.caps;
        let Some(discovery) = &caps.discovery else {
            turn.reply("Discovery is not available in this installation.");
            return Ok(FlowOutcome::SwitchToDefault);
        };

        turn.reply("Discovering...");
        self.discovering = true;
        let found = discovery.discover(name, caps.settings.discovery_timeout).await;
        self.discovering = false;

        let devices = match found {
            Ok(devices) => devices,
            Err(e) => {
                warn!(name, "Discovery failed: {e}");
                turn.reply(format!("Discovery failed: {e}"));
                return Ok(FlowOutcome::SwitchToDefault);
            }
        };
        info!(name, found = devices.len(), "Discovery finished");

        match devices.len() {
            0 => {
                turn.reply("Can't find devices around.");
                Ok(FlowOutcome::SwitchToDefault)
            }
            1 => {
                let question = format!("Found {}. Do you want to set it up now?", devices[0].name);
                self.candidates = devices;
                self.ask(Prompt::new(ValueCategory::YesNo, question))
            }
            _ => {
                let titles: Vec<String> = devices.iter().map(|d| d.name.clone()).collect();
                self.candidates = devices;
                self.ask(Prompt::multiple_choice(
                    "Found the following devices. Which one do you want to set up?",
                    "device",
                    titles,
                ))
            }
        }
    }

    pub async fn handle_raw(&mut self, text: &str, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        if self.expecting() != Some(&ValueCategory::RawString) {
            turn.reply("Sorry, I did not understand that.");
            return Ok(FlowOutcome::Handled);
        }
        let name = text.trim().to_string();
        self.prompt = None;
        self.name = Some(name.clone());
        self.search(&name, turn).await
    }

    pub async fn handle(&mut self, command: Command, turn: &mut Turn<'_>) -> Result<FlowOutcome> {
        let Some(prompt) = self.prompt.clone() else {
            return self.start(turn).await;
        };
        match (&prompt.category, command) {
            (ValueCategory::YesNo, Command::Yes) => self.select(0),
            (ValueCategory::YesNo, Command::No) => Ok(FlowOutcome::SwitchToDefault),
            (ValueCategory::MultipleChoice, Command::Answer(Value::Number(n))) => {
                match choice_index(n, self.candidates.len()) {
                    Some(i) => self.select(i),
                    None => {
                        turn.reply(CHOOSE_AGAIN);
                        Ok(FlowOutcome::Ask(prompt))
                    }
                }
            }
            _ => Ok(FlowOutcome::Ask(prompt)),
        }
    }

    fn select(&mut self, index: usize) -> Result<FlowOutcome> {
        let device = self.candidates.swap_remove(index);
        info!(device_id = %device.id, kind = %device.kind, "Device selected");
        Ok(FlowOutcome::Complete(FlowResult::Device(device)))
    }

    pub async fn stop(&mut self, caps: &Capabilities) {
        if !self.discovering {
            return;
        }
        self.discovering = false;
        if let Some(discovery) = &caps.discovery {
            if let Err(e) = discovery.stop().await {
                warn!("Failed to stop discovery: {e}");
            }
        }
    }
}
