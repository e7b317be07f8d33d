//! Wiring between the configuration file and a dialog session, shared by the
//! `rulecraft` binary and its end-to-end tests.

use rulecraft_config::AppConfig;
use rulecraft_core::in_memory::{
    InMemoryAddressBook, InMemoryDevices, InMemorySchemas, InMemoryUserContext, StaticDiscovery,
    StaticMessaging,
};
use rulecraft_core::{
    Command, CommandParser, EventBus, ParserError, Prompt, Reply, Value, ValueCategory,
};
use rulecraft_dialog::{Capabilities, DialogSettings, Session};
use rulecraft_parser::ParserClient;
use std::sync::Arc;
use tracing::debug;

/// Build the capabilities a session runs on from `config`.
///
/// Contacts, feeds and discovery are only offered when configured.
pub fn capabilities(config: &AppConfig) -> Capabilities {
    let mut schemas = InMemorySchemas::with_builtins();
    for schema in config.channel_schemas() {
        schemas.insert(schema);
    }
    debug!(schemas = schemas.len(), "Loaded channel schemas");

    let mut caps = Capabilities::new(Arc::new(schemas))
        .with_user_context(Arc::new(InMemoryUserContext::with_values(
            config.context_values(),
        )))
        .with_devices(Arc::new(InMemoryDevices::new(config.devices.clone())))
        .with_settings(DialogSettings {
            discovery_timeout: config.discovery_timeout(),
            confirm_programs: config.session.confirm_programs,
        });

    if !config.contacts.is_empty() {
        caps = caps.with_address_book(Arc::new(InMemoryAddressBook::new(config.contacts.clone())));
    }
    if !config.feeds.is_empty() {
        caps = caps.with_messaging(Arc::new(StaticMessaging::new(config.feeds.clone())));
    }
    if config.discovery.enabled {
        caps = caps.with_discovery(Arc::new(StaticDiscovery::new(config.discoverable.clone())));
    }
    caps
}

/// A client for the configured parsing service.
pub fn parser(config: &AppConfig) -> Result<ParserClient, ParserError> {
    Ok(ParserClient::new(&config.parser.url, &config.parser.locale, config.parser_timeout())?
        .with_limit(config.parser.limit))
}

/// A fresh session over `config`, with its event bus.
pub fn session(
    config: &AppConfig,
    parser: Option<Arc<dyn CommandParser>>,
) -> (Session, Arc<EventBus>) {
    let events = Arc::new(EventBus::new(config.session.event_capacity));
    let mut session = Session::new(Arc::new(capabilities(config)), Arc::clone(&events));
    if let Some(parser) = parser {
        session = session.with_parser(parser);
    }
    (session, events)
}

/// One line of chat input.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Free text, for the parser or a raw-text question.
    Text(String),
    /// `\c <json>`: a structured command, bypassing the parser.
    Command(Command),
    /// `\q`, `exit` or `quit`.
    Quit,
    Empty,
}

/// Parse one line typed at the chat prompt.
pub fn read_input(line: &str) -> Result<Input, serde_json::Error> {
    let line = line.trim();
    match line {
        "" => Ok(Input::Empty),
        "\\q" | "exit" | "quit" => Ok(Input::Quit),
        _ => match line.strip_prefix("\\c") {
            Some(json) => Ok(Input::Command(serde_json::from_str(json.trim())?)),
            None => Ok(Input::Text(line.to_string())),
        },
    }
}

/// Read one scripted input (a `generate --answer`) against the pending
/// question.
///
/// A raw-text question takes the input as typed, or the text of an
/// `{"answer":{"type":"String",..}}` command. Anything else must be a JSON
/// command.
pub fn scripted_input(pending: Option<&Prompt>, input: &str) -> Result<Input, serde_json::Error> {
    let expecting_text = pending.is_some_and(|p| p.category == ValueCategory::RawString);
    match serde_json::from_str::<Command>(input.trim()) {
        Ok(Command::Answer(Value::String(text))) if expecting_text => Ok(Input::Text(text)),
        Ok(command) => Ok(Input::Command(command)),
        Err(_) if expecting_text => Ok(Input::Text(input.to_string())),
        Err(e) => Err(e),
    }
}

/// Feed `inputs` to `session` in order and collect every reply.
pub async fn run_script<S: AsRef<str>>(
    session: &mut Session,
    inputs: &[S],
) -> Result<Vec<Reply>, Box<dyn std::error::Error>> {
    let mut replies = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        let parsed = scripted_input(session.pending(), input)
            .map_err(|e| format!("Invalid command '{input}': {e}"))?;
        let step = match parsed {
            Input::Text(text) => session.handle_raw(&text).await?,
            Input::Command(command) => session.handle_command(command).await?,
            Input::Quit | Input::Empty => Vec::new(),
        };
        replies.extend(step);
    }
    Ok(replies)
}

/// Answers the terminal understands without the parser: `yes`/`no` to a
/// yes-no question, and a choice number (as printed by [`render`]) to a
/// multiple-choice one.
pub fn shortcut(pending: Option<&Prompt>, text: &str) -> Option<Command> {
    let text = text.trim().to_lowercase();
    match &pending?.category {
        ValueCategory::YesNo => match text.as_str() {
            "yes" | "y" => Some(Command::Yes),
            "no" | "n" => Some(Command::No),
            _ => None,
        },
        ValueCategory::MultipleChoice => {
            let n: usize = text.parse().ok()?;
            let index = n.checked_sub(1)?;
            Some(Command::Answer(Value::Number(index as f64)))
        }
        _ => None,
    }
}

/// Render a reply as terminal text.
pub fn render(reply: &Reply) -> String {
    match reply {
        Reply::Text { text } => text.clone(),
        Reply::Question { prompt } => {
            let mut out = prompt.question.clone();
            for choice in &prompt.choices {
                out.push_str(&format!("\n  [{}] {}", choice.index + 1, choice.title));
            }
            out
        }
        Reply::Program { name, code } => format!("Program {name}:\n{code}"),
    }
}
