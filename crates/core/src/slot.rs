//! Slots, comparisons, channel schemas and invocations.

use crate::types::{Type, TypeError, unify};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named, typed parameter of a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Unique within one slot list.
    pub name: String,

    /// Human-readable label.
    #[serde(default)]
    pub canonical: String,

    #[serde(rename = "type")]
    pub ty: Type,

    /// Prompt template; may reference earlier slots as `$name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,

    #[serde(default)]
    pub required: bool,
}

impl Slot {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        let name = name.into();
        Self {
            canonical: name.replace('_', " "),
            name,
            ty,
            question: None,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    /// Check that `value` may be bound to this slot.
    ///
    /// Placeholders are always accepted; enum values must also be one of
    /// the declared entries.
    pub fn accepts(&self, value: &Value) -> Result<(), TypeError> {
        if value.is_var_ref() {
            return Ok(());
        }
        unify(&self.ty, &value.ty())?;
        if let (Type::Enum(Some(entries)), Value::Enum(entry)) = (&self.ty, value) {
            if !entries.contains(entry) {
                return Err(TypeError::NotAnEntry {
                    entry: entry.clone(),
                    entries: entries.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Slots left unbound by one invocation, exposed to later stages of the
/// same command.
pub type Scope = BTreeMap<String, Slot>;

/// A comparison operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Is,
    Has,
    Contains,
    LessThan,
    GreaterThan,
    /// Anything the parser produced that this crate does not know.
    Other(String),
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "is" | "=" => Operator::Is,
            "has" => Operator::Has,
            "contains" => Operator::Contains,
            "<" => Operator::LessThan,
            ">" => Operator::GreaterThan,
            _ => Operator::Other(s),
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Is => write!(f, "is"),
            Operator::Has => write!(f, "has"),
            Operator::Contains => write!(f, "contains"),
            Operator::LessThan => write!(f, "<"),
            Operator::GreaterThan => write!(f, ">"),
            Operator::Other(op) => write!(f, "{op}"),
        }
    }
}

/// A `(name, operator, value)` triple.
///
/// Pre-supplied arguments use this shape; the ones that are not consumed
/// as `is` bindings become comparison predicates on the invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub name: String,
    pub operator: Operator,
    pub value: Value,
}

impl Comparison {
    pub fn new(name: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            name: name.into(),
            operator,
            value,
        }
    }

    pub fn is(name: impl Into<String>, value: Value) -> Self {
        Self::new(name, Operator::Is, value)
    }
}

/// Where a channel sits in a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Trigger,
    Query,
    Action,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::Trigger => write!(f, "trigger"),
            ChannelType::Query => write!(f, "query"),
            ChannelType::Action => write!(f, "action"),
        }
    }
}

/// Whether a device kind has one global instance or many configured ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindType {
    #[default]
    Other,
    Global,
}

/// The declared interface of one channel of one device kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSchema {
    pub kind: String,
    pub channel: String,
    pub channel_type: ChannelType,
    #[serde(default)]
    pub kind_type: KindType,
    /// Confirmation template, e.g. `"send an email to $to"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<String>,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

impl ChannelSchema {
    pub fn new(
        kind: impl Into<String>,
        channel: impl Into<String>,
        channel_type: ChannelType,
        slots: Vec<Slot>,
    ) -> Self {
        Self {
            kind: kind.into(),
            channel: channel.into(),
            channel_type,
            kind_type: KindType::Other,
            confirmation: None,
            slots,
        }
    }

    pub fn global(mut self) -> Self {
        self.kind_type = KindType::Global;
        self
    }

    pub fn with_confirmation(mut self, confirmation: impl Into<String>) -> Self {
        self.confirmation = Some(confirmation.into());
        self
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.name == name)
    }
}

/// Values and predicates produced by slot filling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolved {
    /// Parallel to the schema's slots; `None` for slots left unbound.
    pub values: Vec<Option<Value>>,
    pub comparisons: Vec<Comparison>,
}

/// A call to one channel of one device kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub kind: String,
    pub channel: String,
    /// A specific configured instance, if the user named one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub schema: ChannelSchema,
    /// Pre-supplied arguments from the parser.
    #[serde(default)]
    pub args: Vec<Comparison>,
    /// Optional slots the caller wants filled anyway.
    #[serde(default)]
    pub must_fill: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<Resolved>,
}

impl Invocation {
    pub fn new(schema: ChannelSchema, args: Vec<Comparison>) -> Self {
        Self {
            kind: schema.kind.clone(),
            channel: schema.channel.clone(),
            id: None,
            schema,
            args,
            must_fill: Vec::new(),
            resolved: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn channel_type(&self) -> ChannelType {
        self.schema.channel_type
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}
