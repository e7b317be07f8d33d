//! Natural-language descriptions of values, invocations and programs.
//!
//! Templates such as `"send an email to $to"` are parsed once into text and
//! placeholder segments, then rendered with a lookup. This is kept apart from
//! AST construction: descriptions are for the user, the AST is for the
//! compiler.

use rulecraft_core::{Invocation, Operator, Value};
use std::collections::HashSet;

/// Rendered in place of a value that is not known yet.
pub const MISSING: &str = "____";

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Placeholder(String),
}

/// A parsed `$name` / `${name}` template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template. A `$` not followed by a name is kept literally.
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                text.push(c);
                continue;
            }

            let braced = chars.peek() == Some(&'{');
            if braced {
                chars.next();
            }
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            let closed = !braced || chars.peek() == Some(&'}');
            if braced && closed {
                chars.next();
            }

            if name.is_empty() || !closed {
                text.push('$');
                if braced {
                    text.push('{');
                }
                text.push_str(&name);
                if braced && closed {
                    text.push('}');
                }
                continue;
            }
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(Segment::Placeholder(name));
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Self { segments }
    }

    /// Placeholder names, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Render, substituting each placeholder with `lookup(name)`.
    pub fn render<F>(&self, mut lookup: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(name) => out.push_str(&lookup(name)),
            }
        }
        out
    }
}

/// Describe a value the way a person would say it.
pub fn describe_value(value: &Value) -> String {
    match value {
        Value::VarRef(name) => describe_placeholder(name),
        Value::String(s) => format!("\"{s}\""),
        Value::Number(n) => n.to_string(),
        Value::Boolean(true) => "on".into(),
        Value::Boolean(false) => "off".into(),
        Value::Measure { value, unit } => format!("{value} {unit}"),
        Value::Date(date) => date.format("%Y-%m-%d %H:%M").to_string(),
        Value::Enum(entry) => entry.clone(),
        Value::PhoneNumber(contact) | Value::EmailAddress(contact) => contact
            .display
            .clone()
            .unwrap_or_else(|| contact.value.clone()),
        Value::Location(location) => location
            .display
            .clone()
            .unwrap_or_else(|| format!("[{}, {}]", location.latitude, location.longitude)),
        Value::Picture(url) => url.clone(),
        Value::Feed(feed) => feed.name.clone(),
    }
}

fn describe_placeholder(name: &str) -> String {
    if let Some(contact) = name
        .strip_prefix("$contact(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return contact.to_string();
    }
    match name {
        "$context.location.current_location" => "here".into(),
        "$context.location.home" => "at home".into(),
        "$context.location.work" => "at work".into(),
        "$event" => "the event".into(),
        "$event.title" => "the event's title".into(),
        "$event.body" => "the event's long description".into(),
        other => other.to_string(),
    }
}

/// Describe one invocation, using its schema's confirmation template when
/// present, plus a phrase for each bound argument the template does not
/// mention and each comparison.
pub fn describe_invocation(invocation: &Invocation) -> String {
    let schema = &invocation.schema;
    let resolved = invocation.resolved.as_ref();
    let value_at = |i: usize| resolved.and_then(|r| r.values.get(i)).and_then(Option::as_ref);

    let template = Template::parse(
        schema
            .confirmation
            .as_deref()
            .unwrap_or(&format!("{} on {}", invocation.channel, invocation.kind)),
    );
    let substituted: HashSet<&str> = template.placeholders().collect();
    let mut out = template.render(|name| {
        match schema.slots.iter().position(|s| s.name == name) {
            Some(i) => value_at(i).map_or_else(|| MISSING.to_string(), describe_value),
            None => format!("${name}"),
        }
    });

    for (i, slot) in schema.slots.iter().enumerate() {
        if substituted.contains(slot.name.as_str()) {
            continue;
        }
        if let Some(value) = value_at(i) {
            out.push_str(&format!(" and {} is {}", slot.canonical, describe_value(value)));
        }
    }

    for comparison in resolved.map(|r| r.comparisons.as_slice()).unwrap_or_default() {
        let canonical = schema
            .slot(&comparison.name)
            .map_or(comparison.name.as_str(), |s| s.canonical.as_str());
        let relation = match &comparison.operator {
            Operator::Is => "is",
            Operator::Has => "has",
            Operator::Contains => "contains",
            Operator::LessThan => "is less than",
            Operator::GreaterThan => "is greater than",
            Operator::Other(_) => continue,
        };
        out.push_str(&format!(
            " and {canonical} {relation} {}",
            describe_value(&comparison.value)
        ));
    }
    out
}

/// Describe a whole program, as used in the confirmation question.
pub fn describe_program(
    trigger: Option<&Invocation>,
    query: Option<&Invocation>,
    action: Option<&Invocation>,
) -> String {
    if let (Some(trigger), None, None) = (trigger, query, action) {
        return format!("notify if {}", describe_invocation(trigger));
    }
    let mut out = action.map_or_else(|| "notify you".to_string(), describe_invocation);
    if let Some(query) = query {
        out = format!("get {} and {out}", describe_invocation(query));
    }
    if let Some(trigger) = trigger {
        out = format!("{out} if {}", describe_invocation(trigger));
    }
    out
}
