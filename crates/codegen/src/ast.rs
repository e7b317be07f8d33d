//! Program AST: the structured form handed to the compiler.
//!
//! The `Display` impls produce the canonical program text:
//!
//! ```text
//! RulecraftGeneratedTwitterToGmail() {
//!     @(type="twitter").source(text, from), text =~ "cat" => @(type="gmail").send("bob@example.com"^^tt:email_address, text);
//! }
//! ```

use rulecraft_core::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete program: a name and its statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub statements: Vec<Statement>,
}

/// One statement. Each inner Vec is a stage (an invocation and its conditions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// A standing rule: the first stage is a trigger.
    Rule(Vec<Vec<RulePart>>),
    /// Runs once, immediately.
    Command(Vec<Vec<RulePart>>),
}

impl Statement {
    pub fn stages(&self) -> &[Vec<RulePart>] {
        match self {
            Statement::Rule(stages) | Statement::Command(stages) => stages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RulePart {
    Invocation(InvocationPart),
    Condition(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationPart {
    pub selector: Selector,
    /// `None` for builtin selectors, which name the channel themselves.
    pub channel: Option<String>,
    pub params: Vec<Expression>,
}

/// How an invocation addresses its device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selector {
    /// `@$timer`, `@$notify`: scoped to the owning program.
    Builtin(String),
    /// `@weather`: a singleton kind.
    GlobalName(String),
    /// `@(type="x")` or `@(type="x", id="y")`.
    Attributes(Vec<Attribute>),
}

impl Selector {
    /// The attribute value for `name`, if this is an attribute selector.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        match self {
            Selector::Attributes(attrs) => attrs.iter().find(|a| a.name == name).map(|a| &a.value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: Value,
}

impl Attribute {
    pub fn string(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: Value::String(value.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Constant(Value),
    VarRef(String),
    FunctionCall { name: String, args: Vec<Expression> },
    BinaryOp {
        lhs: Box<Expression>,
        rhs: Box<Expression>,
        op: BinaryOp,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    /// Substring / set membership.
    Like,
    Lt,
    Gt,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}() {{", self.name)?;
        for statement in &self.statements {
            writeln!(f, "    {statement}")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Statement::Command(_) = self {
            write!(f, "now => ")?;
        }
        for (i, stage) in self.stages().iter().enumerate() {
            if i > 0 {
                write!(f, " => ")?;
            }
            for (j, part) in stage.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{part}")?;
            }
        }
        write!(f, ";")
    }
}

impl fmt::Display for RulePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulePart::Invocation(inv) => write!(f, "{inv}"),
            RulePart::Condition(expr) => write!(f, "{expr}"),
        }
    }
}

impl fmt::Display for InvocationPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector)?;
        if let Some(channel) = &self.channel {
            write!(f, ".{channel}")?;
        }
        write!(f, "(")?;
        write_list(f, &self.params)?;
        write!(f, ")")
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Builtin(channel) => write!(f, "@${channel}"),
            Selector::GlobalName(kind) => write!(f, "@{kind}"),
            Selector::Attributes(attrs) => {
                write!(f, "@(")?;
                for (i, attr) in attrs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", attr.name, attr.value)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(value) => write!(f, "{value}"),
            Expression::VarRef(name) => write!(f, "{name}"),
            Expression::FunctionCall { name, args } => {
                write!(f, "${name}(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expression::BinaryOp { lhs, rhs, op } => write!(f, "{lhs} {op} {rhs}"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinaryOp::Eq => "=",
            BinaryOp::Like => "=~",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
        };
        write!(f, "{op}")
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
