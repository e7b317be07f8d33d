//! Program validation.
//!
//! [`ProgramCompiler`] is the seam to the automation runtime's compiler. The
//! reference [`SchemaCompiler`] type-checks a program against the schema
//! registry and renders it canonically; hosts with a real runtime plug in
//! their own implementation.

use crate::ast::{BinaryOp, Expression, InvocationPart, Program, RulePart, Selector, Statement};
use async_trait::async_trait;
use rulecraft_core::{ChannelSchema, ChannelType, SchemaRegistry, Type, TypeError, Value, unify};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Why a program failed to compile.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("unknown channel {kind}.{channel} ({channel_type})")]
    UnknownChannel {
        kind: String,
        channel: String,
        channel_type: ChannelType,
    },

    #[error("{kind}.{channel} takes {expected} parameters, {found} given")]
    Arity {
        kind: String,
        channel: String,
        expected: usize,
        found: usize,
    },

    #[error("parameter '{param}' of {kind}.{channel}: {source}")]
    ParamType {
        kind: String,
        channel: String,
        param: String,
        #[source]
        source: TypeError,
    },

    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("type error in condition: {0}")]
    Condition(TypeError),

    #[error("{0}")]
    Structure(String),
}

/// Validates a program and produces its final text.
#[async_trait]
pub trait ProgramCompiler: Send + Sync {
    async fn compile(&self, program: &Program) -> Result<String, CompileError>;
}

/// Checks programs against channel schemas.
///
/// - every invocation must name a known channel of the type its position
///   implies (first stage of a rule is a trigger, the last stage is an
///   action, anything in between is a query)
/// - parameter counts and constant types must match the schema
/// - variables are bound by trigger and query outputs and must be bound
///   before an action or a condition uses them
pub struct SchemaCompiler {
    schemas: Arc<dyn SchemaRegistry>,
}

impl SchemaCompiler {
    pub fn new(schemas: Arc<dyn SchemaRegistry>) -> Self {
        Self { schemas }
    }

    async fn check_statement(&self, statement: &Statement) -> Result<(), CompileError> {
        let stages = statement.stages();
        let is_rule = matches!(statement, Statement::Rule(_));
        if stages.is_empty() || (is_rule && stages.len() < 2) {
            return Err(CompileError::Structure(
                "a rule needs a trigger and an action".into(),
            ));
        }

        let mut bound: HashMap<String, Type> = HashMap::new();
        let last = stages.len() - 1;
        for (i, stage) in stages.iter().enumerate() {
            let channel_type = if i == last {
                ChannelType::Action
            } else if i == 0 && is_rule {
                ChannelType::Trigger
            } else {
                ChannelType::Query
            };

            let mut parts = stage.iter();
            let Some(RulePart::Invocation(invocation)) = parts.next() else {
                return Err(CompileError::Structure(
                    "every stage must start with an invocation".into(),
                ));
            };
            self.check_invocation(invocation, channel_type, i > 0, &mut bound)
                .await?;

            for part in parts {
                match part {
                    RulePart::Condition(_) if channel_type == ChannelType::Action => {
                        return Err(CompileError::Structure(
                            "actions cannot have conditions".into(),
                        ));
                    }
                    RulePart::Condition(expr) => check_condition(expr, &bound)?,
                    RulePart::Invocation(_) => {
                        return Err(CompileError::Structure(
                            "only one invocation per stage".into(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    async fn check_invocation(
        &self,
        invocation: &InvocationPart,
        channel_type: ChannelType,
        has_event: bool,
        bound: &mut HashMap<String, Type>,
    ) -> Result<(), CompileError> {
        let (kind, channel) = selector_target(invocation)?;
        let schema = self
            .schemas
            .get_schema(&kind, &channel, channel_type)
            .await
            .map_err(|_| CompileError::UnknownChannel {
                kind: kind.clone(),
                channel: channel.clone(),
                channel_type,
            })?;

        if invocation.params.len() != schema.slots.len() {
            return Err(CompileError::Arity {
                kind,
                channel,
                expected: schema.slots.len(),
                found: invocation.params.len(),
            });
        }

        let binds_outputs = channel_type != ChannelType::Action;
        for (param, slot) in invocation.params.iter().zip(&schema.slots) {
            let param_error = |source| CompileError::ParamType {
                kind: schema.kind.clone(),
                channel: schema.channel.clone(),
                param: slot.name.clone(),
                source,
            };
            match param {
                Expression::Constant(value) => slot.accepts(value).map_err(param_error)?,
                Expression::VarRef(name) => match bound.get(name) {
                    Some(ty) => {
                        unify(&slot.ty, ty).map_err(param_error)?;
                    }
                    None if binds_outputs => {
                        bound.insert(name.clone(), slot.ty.clone());
                    }
                    None => return Err(CompileError::UndefinedVariable(name.clone())),
                },
                Expression::FunctionCall { name, args } if name == "eventToString" => {
                    if !has_event {
                        return Err(CompileError::Structure(format!(
                            "{} uses the event before anything produced one",
                            describe_target(&schema)
                        )));
                    }
                    check_event_args(args)?;
                    unify(&slot.ty, &Type::String).map_err(param_error)?;
                }
                other => {
                    return Err(CompileError::Structure(format!(
                        "unsupported parameter expression {other}"
                    )));
                }
            }
        }
        debug!(kind = %schema.kind, channel = %schema.channel, %channel_type, "Invocation checks out");
        Ok(())
    }
}

#[async_trait]
impl ProgramCompiler for SchemaCompiler {
    async fn compile(&self, program: &Program) -> Result<String, CompileError> {
        if program.statements.is_empty() {
            return Err(CompileError::Structure("program has no statements".into()));
        }
        for statement in &program.statements {
            self.check_statement(statement).await?;
        }
        Ok(program.to_string())
    }
}

fn selector_target(invocation: &InvocationPart) -> Result<(String, String), CompileError> {
    let missing_channel = || CompileError::Structure("invocation has no channel".into());
    match &invocation.selector {
        Selector::Builtin(channel) => Ok(("builtin".into(), channel.clone())),
        Selector::GlobalName(kind) => {
            let channel = invocation.channel.clone().ok_or_else(missing_channel)?;
            Ok((kind.clone(), channel))
        }
        selector @ Selector::Attributes(_) => {
            let Some(Value::String(kind)) = selector.attribute("type") else {
                return Err(CompileError::Structure(
                    "selector has no type attribute".into(),
                ));
            };
            let channel = invocation.channel.clone().ok_or_else(missing_channel)?;
            Ok((kind.clone(), channel))
        }
    }
}

fn describe_target(schema: &ChannelSchema) -> String {
    format!("{}.{}", schema.kind, schema.channel)
}

fn check_event_args(args: &[Expression]) -> Result<(), CompileError> {
    match args {
        [] => Ok(()),
        [Expression::Constant(Value::String(format))]
            if format == "string-title" || format == "string-body" =>
        {
            Ok(())
        }
        _ => Err(CompileError::Structure(
            "eventToString takes an optional \"string-title\" or \"string-body\"".into(),
        )),
    }
}

fn expression_type(expr: &Expression, bound: &HashMap<String, Type>) -> Result<Type, CompileError> {
    match expr {
        Expression::Constant(value) => Ok(value.ty()),
        Expression::VarRef(name) => bound
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::UndefinedVariable(name.clone())),
        other => Err(CompileError::Structure(format!(
            "unsupported operand {other}"
        ))),
    }
}

fn check_condition(expr: &Expression, bound: &HashMap<String, Type>) -> Result<(), CompileError> {
    match expr {
        Expression::BinaryOp { lhs, rhs, op } => {
            let lhs = expression_type(lhs, bound)?;
            let rhs = expression_type(rhs, bound)?;
            match op {
                BinaryOp::Eq => {
                    unify(&lhs, &rhs).map_err(CompileError::Condition)?;
                }
                BinaryOp::Like => {
                    unify(&Type::String, &lhs).map_err(CompileError::Condition)?;
                    unify(&Type::String, &rhs).map_err(CompileError::Condition)?;
                }
                BinaryOp::Lt | BinaryOp::Gt => {
                    let ty = unify(&lhs, &rhs).map_err(CompileError::Condition)?;
                    if !ty.is_numeric() && ty != Type::Any {
                        return Err(CompileError::Condition(TypeError::Incompatible {
                            expected: Type::Number,
                            found: ty,
                        }));
                    }
                }
            }
            Ok(())
        }
        Expression::FunctionCall { name, args } if name == "contains" => {
            let [haystack, needle] = args.as_slice() else {
                return Err(CompileError::Structure(
                    "contains takes two arguments".into(),
                ));
            };
            let haystack = expression_type(haystack, bound)?;
            let needle = expression_type(needle, bound)?;
            match haystack {
                Type::Array(inner) => {
                    unify(&inner, &needle).map_err(CompileError::Condition)?;
                    Ok(())
                }
                Type::Any => Ok(()),
                other => Err(CompileError::Condition(TypeError::Incompatible {
                    expected: Type::Array(Box::new(needle)),
                    found: other,
                })),
            }
        }
        other => Err(CompileError::Structure(format!(
            "unsupported condition {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Attribute;
    use rulecraft_core::in_memory::InMemorySchemas;
    use rulecraft_core::{ChannelSchema, Slot};

    fn compiler() -> SchemaCompiler {
        let mut schemas = InMemorySchemas::with_builtins();
        schemas.insert(ChannelSchema::new(
            "twitter",
            "source",
            ChannelType::Trigger,
            vec![
                Slot::new("text", Type::String),
                Slot::new("hashtags", Type::Array(Box::new(Type::String))),
            ],
        ));
        schemas.insert(ChannelSchema::new(
            "gmail",
            "send",
            ChannelType::Action,
            vec![
                Slot::new("to", Type::EmailAddress),
                Slot::new("body", Type::String),
            ],
        ));
        SchemaCompiler::new(Arc::new(schemas))
    }

    fn invocation(kind: &str, channel: &str, params: Vec<Expression>) -> RulePart {
        RulePart::Invocation(InvocationPart {
            selector: Selector::Attributes(vec![Attribute::string("type", kind)]),
            channel: Some(channel.into()),
            params,
        })
    }

    fn var(name: &str) -> Expression {
        Expression::VarRef(name.into())
    }

    fn program(statement: Statement) -> Program {
        Program {
            name: "Test".into(),
            statements: vec![statement],
        }
    }

    #[tokio::test]
    async fn accepts_well_typed_rule() {
        let statement = Statement::Rule(vec![
            vec![
                invocation("twitter", "source", vec![var("text"), var("hashtags")]),
                RulePart::Condition(Expression::FunctionCall {
                    name: "contains".into(),
                    args: vec![var("hashtags"), Expression::Constant(Value::String("cat".into()))],
                }),
            ],
            vec![invocation(
                "gmail",
                "send",
                vec![
                    Expression::Constant(Value::email("bob@example.com")),
                    var("text"),
                ],
            )],
        ]);
        let code = compiler().compile(&program(statement)).await.unwrap();
        assert!(code.contains(r#"$contains(hashtags, "cat")"#));
        assert!(code.starts_with("Test() {"));
    }

    #[tokio::test]
    async fn rejects_unbound_action_variable() {
        let statement = Statement::Command(vec![vec![invocation(
            "gmail",
            "send",
            vec![var("to"), Expression::Constant(Value::String("hi".into()))],
        )]]);
        let err = compiler().compile(&program(statement)).await.unwrap_err();
        assert_eq!(err, CompileError::UndefinedVariable("to".into()));
    }

    #[tokio::test]
    async fn rejects_wrong_constant_type() {
        let statement = Statement::Command(vec![vec![invocation(
            "gmail",
            "send",
            vec![
                Expression::Constant(Value::Number(3.0)),
                Expression::Constant(Value::String("hi".into())),
            ],
        )]]);
        let err = compiler().compile(&program(statement)).await.unwrap_err();
        assert!(matches!(err, CompileError::ParamType { ref param, .. } if param == "to"));
    }

    #[tokio::test]
    async fn rejects_channel_in_wrong_position() {
        let statement = Statement::Command(vec![vec![invocation(
            "twitter",
            "source",
            vec![var("text"), var("hashtags")],
        )]]);
        let err = compiler().compile(&program(statement)).await.unwrap_err();
        assert!(matches!(err, CompileError::UnknownChannel { channel_type: ChannelType::Action, .. }));
    }

    #[tokio::test]
    async fn event_needs_a_producer() {
        let statement = Statement::Command(vec![vec![invocation(
            "gmail",
            "send",
            vec![
                Expression::Constant(Value::email("a@b.c")),
                Expression::FunctionCall {
                    name: "eventToString".into(),
                    args: vec![],
                },
            ],
        )]]);
        let err = compiler().compile(&program(statement)).await.unwrap_err();
        assert!(matches!(err, CompileError::Structure(_)));
    }

    #[tokio::test]
    async fn like_requires_strings() {
        let statement = Statement::Rule(vec![
            vec![
                invocation("twitter", "source", vec![var("text"), var("hashtags")]),
                RulePart::Condition(Expression::BinaryOp {
                    lhs: Box::new(var("hashtags")),
                    rhs: Box::new(Expression::Constant(Value::String("x".into()))),
                    op: BinaryOp::Like,
                }),
            ],
            vec![RulePart::Invocation(InvocationPart {
                selector: Selector::Builtin("notify".into()),
                channel: None,
                params: vec![],
            })],
        ]);
        let err = compiler().compile(&program(statement)).await.unwrap_err();
        assert!(matches!(err, CompileError::Condition(_)));
    }
}
