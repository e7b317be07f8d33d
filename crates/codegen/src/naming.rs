//! Program names.
//!
//! Generated programs are named after the shape of the rule and the device
//! kinds involved, e.g. `RulecraftGeneratedTwitterToGmail`.

/// Which of the four program shapes is being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramShape {
    /// A trigger (and possibly a query) feeding an action.
    Rule,
    /// A trigger alone, results sent to the notification sink.
    Monitor,
    /// A query alone, run once, results sent to the notification sink.
    Query,
    /// An action alone, run once.
    Immediate,
}

impl ProgramShape {
    pub fn prefix(&self) -> &'static str {
        match self {
            ProgramShape::Rule => "RulecraftGenerated",
            ProgramShape::Monitor => "RulecraftGeneratedMonitor",
            ProgramShape::Query => "RulecraftGeneratedQuery",
            ProgramShape::Immediate => "RulecraftImmediate",
        }
    }
}

/// Uppercase the first letter and camel-case across `-` and `_`.
///
/// `"google-drive"` becomes `"GoogleDrive"`, `"send_sms"` becomes `"SendSms"`.
pub fn capitalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = true;
    for c in s.chars() {
        if c == '-' || c == '_' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// The name segment for one invocation: the kind, or the channel for builtins.
pub fn capitalize_selector(kind: &str, channel: &str) -> String {
    if kind == "builtin" {
        capitalize(channel)
    } else {
        capitalize(kind)
    }
}

/// Build the program name from its shape and the `(kind, channel)` pairs of
/// the invocations actually present, in trigger, query, action order.
pub fn program_name(shape: ProgramShape, parts: &[(&str, &str)]) -> String {
    let segments: Vec<String> = parts
        .iter()
        .map(|(kind, channel)| capitalize_selector(kind, channel))
        .collect();
    format!("{}{}", shape.prefix(), segments.join("To"))
}
