//! Typed values carried by slots, answers and generated programs.

use crate::types::{Type, base_unit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value bound to a slot.
///
/// `VarRef` is a symbolic placeholder (`$contact(bob)`, `$context.location.home`,
/// `$event`) that must be concretized or rewritten before it is usable;
/// every other variant is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    String(String),
    Number(f64),
    Boolean(bool),
    Measure { value: f64, unit: String },
    Date(DateTime<Utc>),
    Enum(String),
    PhoneNumber(Contact),
    EmailAddress(Contact),
    Location(Location),
    Picture(String),
    Feed(FeedHandle),
    VarRef(String),
}

/// A phone number or email address, with an optional display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// An absolute geographic location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// A handle on a messaging feed (a conversation the user can post to).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedHandle {
    pub id: String,
    pub name: String,
}

impl Value {
    /// Infer the type of this value.
    pub fn ty(&self) -> Type {
        match self {
            Value::String(_) => Type::String,
            Value::Number(_) => Type::Number,
            Value::Boolean(_) => Type::Boolean,
            Value::Measure { unit, .. } => Type::Measure(base_unit(unit).to_string()),
            Value::Date(_) => Type::Date,
            Value::Enum(_) => Type::Enum(None),
            Value::PhoneNumber(_) => Type::PhoneNumber,
            Value::EmailAddress(_) => Type::EmailAddress,
            Value::Location(_) => Type::Location,
            Value::Picture(_) => Type::Picture,
            Value::Feed(_) => Type::Feed,
            Value::VarRef(_) => Type::Any,
        }
    }

    pub fn is_var_ref(&self) -> bool {
        matches!(self, Value::VarRef(_))
    }

    /// The placeholder name, if this is a `VarRef`.
    pub fn var_name(&self) -> Option<&str> {
        match self {
            Value::VarRef(name) => Some(name),
            _ => None,
        }
    }

    pub fn email(value: impl Into<String>) -> Self {
        Value::EmailAddress(Contact {
            value: value.into(),
            display: None,
        })
    }

    pub fn phone(value: impl Into<String>) -> Self {
        Value::PhoneNumber(Contact {
            value: value.into(),
            display: None,
        })
    }

    pub fn measure(value: f64, unit: impl Into<String>) -> Self {
        Value::Measure {
            value,
            unit: unit.into(),
        }
    }
}

/// Literal rendering, as it appears in generated program text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Measure { value, unit } => write!(f, "{value}{unit}"),
            Value::Date(d) => write!(f, "makeDate({:?})", d.to_rfc3339()),
            Value::Enum(e) => write!(f, "enum({e})"),
            Value::PhoneNumber(c) => write!(f, "{:?}^^tt:phone_number", c.value),
            Value::EmailAddress(c) => write!(f, "{:?}^^tt:email_address", c.value),
            Value::Location(l) => write!(f, "makeLocation({}, {})", l.latitude, l.longitude),
            Value::Picture(url) => write!(f, "{url:?}^^tt:picture"),
            Value::Feed(feed) => write!(f, "{:?}^^tt:feed", feed.id),
            Value::VarRef(name) => write!(f, "{name}"),
        }
    }
}
