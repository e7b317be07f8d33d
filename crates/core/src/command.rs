//! User commands, prompts and replies: the conversational wire types.
//!
//! A [`Command`] is what the semantic parser (or a raw JSON command typed by
//! the user) produces. A [`Prompt`] is a question the dialog asks, and a
//! [`Reply`] is anything sent back to the user during one turn.

use crate::slot::Comparison;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The modality of an expected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueCategory {
    YesNo,
    MultipleChoice,
    RawString,
    Number,
    /// A measurement in the given base unit.
    Measure(String),
    Date,
    Picture,
    Location,
    PhoneNumber,
    EmailAddress,
}

impl ValueCategory {
    /// Does `command` have the shape this modality expects?
    ///
    /// Raw text is matched separately (it never becomes a `Command`).
    pub fn accepts(&self, command: &Command) -> bool {
        match self {
            ValueCategory::YesNo => matches!(command, Command::Yes | Command::No),
            ValueCategory::RawString => false,
            _ => matches!(command, Command::Answer(_)),
        }
    }
}

impl fmt::Display for ValueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueCategory::YesNo => write!(f, "YesNo"),
            ValueCategory::MultipleChoice => write!(f, "MultipleChoice"),
            ValueCategory::RawString => write!(f, "RawString"),
            ValueCategory::Number => write!(f, "Number"),
            ValueCategory::Measure(unit) => write!(f, "Measure({unit})"),
            ValueCategory::Date => write!(f, "Date"),
            ValueCategory::Picture => write!(f, "Picture"),
            ValueCategory::Location => write!(f, "Location"),
            ValueCategory::PhoneNumber => write!(f, "PhoneNumber"),
            ValueCategory::EmailAddress => write!(f, "EmailAddress"),
        }
    }
}

/// One selectable option of a multiple-choice prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub index: usize,
    /// What kind of thing is being chosen ("device", "feed", "choice", ...).
    pub kind: String,
    pub title: String,
}

/// A question awaiting an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub category: ValueCategory,
    pub question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl Prompt {
    pub fn new(category: ValueCategory, question: impl Into<String>) -> Self {
        Self {
            category,
            question: question.into(),
            choices: Vec::new(),
        }
    }

    pub fn multiple_choice<I, S>(question: impl Into<String>, kind: &str, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices = titles
            .into_iter()
            .enumerate()
            .map(|(index, title)| Choice {
                index,
                kind: kind.to_string(),
                title: title.into(),
            })
            .collect();
        Self {
            category: ValueCategory::MultipleChoice,
            question: question.into(),
            choices,
        }
    }

    /// Choice labels, as the parser expects them.
    pub fn choice_titles(&self) -> Vec<String> {
        self.choices.iter().map(|c| c.title.clone()).collect()
    }
}

/// Something sent to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Text { text: String },
    Question { prompt: Prompt },
    Program { name: String, code: String },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text { text: text.into() }
    }
}

/// A partially specified call, as produced by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: String,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub args: Vec<Comparison>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_fill: Vec<String>,
}

impl Intent {
    pub fn new(kind: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            channel: channel.into(),
            id: None,
            args: Vec::new(),
            must_fill: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: Comparison) -> Self {
        self.args.push(arg);
        self
    }
}

/// What to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Device,
    #[serde(alias = "query")]
    Command,
}

/// A parsed user command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Yes,
    No,
    Cancel,
    Reset,
    Help,
    Answer(Value),
    Discover {
        #[serde(default)]
        name: Option<String>,
    },
    List {
        #[serde(default)]
        what: Option<ListKind>,
    },
    Rule {
        #[serde(default)]
        trigger: Option<Intent>,
        #[serde(default)]
        query: Option<Intent>,
        #[serde(default)]
        action: Option<Intent>,
    },
    Trigger(Intent),
    Query(Intent),
    Action(Intent),
}

impl Command {
    /// Commands handled before any flow sees them.
    pub fn is_generic(&self) -> bool {
        matches!(self, Command::Cancel | Command::Reset | Command::Help)
    }

    /// Commands that only make sense as an answer to a question.
    pub fn is_answer(&self) -> bool {
        matches!(self, Command::Yes | Command::No | Command::Answer(_))
    }
}
