//! Program generation from resolved invocations.

use crate::ast::{
    Attribute, BinaryOp, Expression, InvocationPart, Program, RulePart, Selector, Statement,
};
use crate::compiler::ProgramCompiler;
use crate::naming::{ProgramShape, program_name};
use rulecraft_core::{
    ChannelType, Comparison, Error, IdGenerator, Invocation, KindType, Operator, Result, Value,
};
use serde::Serialize;
use tracing::{debug, info};

/// A validated program, ready to install.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedProgram {
    /// Fresh application identifier.
    pub id: String,
    pub name: String,
    #[serde(skip)]
    pub program: Program,
    /// Canonical text, as returned by the compiler.
    pub code: String,
}

/// Rewrite a resolved value into an expression.
///
/// The event placeholders become calls that format the triggering event;
/// every other placeholder stays a free variable.
pub fn value_expression(value: &Value) -> Expression {
    match value {
        Value::VarRef(name) => match name.as_str() {
            "$event" => event_to_string(None),
            "$event.title" => event_to_string(Some("string-title")),
            "$event.body" => event_to_string(Some("string-body")),
            _ => Expression::VarRef(name.clone()),
        },
        other => Expression::Constant(other.clone()),
    }
}

fn event_to_string(format: Option<&str>) -> Expression {
    Expression::FunctionCall {
        name: "eventToString".into(),
        args: format
            .map(|f| Expression::Constant(Value::String(f.into())))
            .into_iter()
            .collect(),
    }
}

/// Translate a comparison into a condition on the invocation's output.
pub fn comparison_expression(comparison: &Comparison) -> Result<Expression> {
    let lhs = Expression::VarRef(comparison.name.clone());
    let rhs = match &comparison.value {
        Value::VarRef(name) => Expression::VarRef(name.clone()),
        other => Expression::Constant(other.clone()),
    };
    let op = match &comparison.operator {
        Operator::Is => BinaryOp::Eq,
        Operator::Contains => BinaryOp::Like,
        Operator::LessThan => BinaryOp::Lt,
        Operator::GreaterThan => BinaryOp::Gt,
        Operator::Has => {
            return Ok(Expression::FunctionCall {
                name: "contains".into(),
                args: vec![lhs, rhs],
            });
        }
        other @ Operator::Other(_) => return Err(Error::UnsupportedOperator(other.clone())),
    };
    Ok(Expression::BinaryOp {
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        op,
    })
}

fn selector(invocation: &Invocation) -> (Selector, Option<String>) {
    if invocation.kind == "builtin" && matches!(invocation.channel.as_str(), "timer" | "notify") {
        return (Selector::Builtin(invocation.channel.clone()), None);
    }
    let selector = match (&invocation.id, invocation.schema.kind_type) {
        (Some(id), _) => Selector::Attributes(vec![
            Attribute::string("type", &invocation.kind),
            Attribute::string("id", id),
        ]),
        (None, KindType::Global) => Selector::GlobalName(invocation.kind.clone()),
        (None, KindType::Other) => {
            Selector::Attributes(vec![Attribute::string("type", &invocation.kind)])
        }
    };
    (selector, Some(invocation.channel.clone()))
}

fn notify() -> Vec<RulePart> {
    vec![RulePart::Invocation(InvocationPart {
        selector: Selector::Builtin("notify".into()),
        channel: None,
        params: Vec::new(),
    })]
}

/// Build the stage for one resolved invocation.
fn invocation_stage(invocation: &Invocation) -> Result<Vec<RulePart>> {
    let resolved = invocation.resolved.as_ref().ok_or_else(|| {
        Error::Internal(format!(
            "{}.{} reached code generation unresolved",
            invocation.kind, invocation.channel
        ))
    })?;
    let slots = &invocation.schema.slots;
    if resolved.values.len() != slots.len() {
        return Err(Error::Internal(format!(
            "{}.{} has {} values for {} slots",
            invocation.kind,
            invocation.channel,
            resolved.values.len(),
            slots.len()
        )));
    }

    let is_action = invocation.channel_type() == ChannelType::Action;
    if let (true, Some(comparison)) = (is_action, resolved.comparisons.first()) {
        return Err(Error::InvalidPredicate {
            name: comparison.name.clone(),
        });
    }

    let params = resolved
        .values
        .iter()
        .zip(slots)
        .map(|(value, slot)| match value {
            Some(value) => Ok(value_expression(value)),
            None if is_action => Err(Error::ProgramInvalid(format!(
                "no value for '{}' of {}.{}",
                slot.name, invocation.kind, invocation.channel
            ))),
            None => Ok(Expression::VarRef(slot.name.clone())),
        })
        .collect::<Result<Vec<_>>>()?;

    let (selector, channel) = selector(invocation);
    let mut stage = vec![RulePart::Invocation(InvocationPart {
        selector,
        channel,
        params,
    })];
    for comparison in &resolved.comparisons {
        stage.push(RulePart::Condition(comparison_expression(comparison)?));
    }
    Ok(stage)
}

/// Assemble, name and validate a program from resolved invocations.
///
/// A lone trigger becomes a monitor, a lone query or action runs once, and
/// anything else is a rule. A missing action is replaced by the notification
/// sink. Nothing is returned unless the compiler accepts the program.
pub async fn generate_program(
    compiler: &dyn ProgramCompiler,
    ids: &dyn IdGenerator,
    trigger: Option<&Invocation>,
    query: Option<&Invocation>,
    action: Option<&Invocation>,
) -> Result<GeneratedProgram> {
    let shape = match (trigger, query, action) {
        (None, None, None) => {
            return Err(Error::ProgramInvalid("nothing to generate".into()));
        }
        (Some(_), None, None) => ProgramShape::Monitor,
        (None, Some(_), None) => ProgramShape::Query,
        (None, None, Some(_)) => ProgramShape::Immediate,
        _ => ProgramShape::Rule,
    };

    let mut stages = Vec::with_capacity(3);
    for invocation in [trigger, query].into_iter().flatten() {
        stages.push(invocation_stage(invocation)?);
    }
    stages.push(match action {
        Some(action) => invocation_stage(action)?,
        None => notify(),
    });
    let statement = if trigger.is_some() {
        Statement::Rule(stages)
    } else {
        Statement::Command(stages)
    };

    let parts: Vec<(&str, &str)> = [trigger, query, action]
        .into_iter()
        .flatten()
        .map(|inv| (inv.kind.as_str(), inv.channel.as_str()))
        .collect();
    let name = program_name(shape, &parts);
    let program = Program {
        name: name.clone(),
        statements: vec![statement],
    };
    debug!(%name, shape = ?shape, "Assembled program");

    let code = compiler
        .compile(&program)
        .await
        .map_err(|e| Error::ProgramInvalid(e.to_string()))?;
    let id = ids.next_id("app");
    info!(app_id = %id, %name, "Generated program");

    Ok(GeneratedProgram {
        id,
        name,
        program,
        code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileError, SchemaCompiler};
    use async_trait::async_trait;
    use rulecraft_core::ids::SequentialIds;
    use rulecraft_core::in_memory::InMemorySchemas;
    use rulecraft_core::{ChannelSchema, Resolved, Slot, Type};
    use std::sync::Arc;

    fn resolved(schema: ChannelSchema, values: Vec<Option<Value>>, comparisons: Vec<Comparison>) -> Invocation {
        let mut invocation = Invocation::new(schema, vec![]);
        invocation.resolved = Some(Resolved { values, comparisons });
        invocation
    }

    fn twitter() -> ChannelSchema {
        ChannelSchema::new(
            "twitter",
            "source",
            ChannelType::Trigger,
            vec![Slot::new("text", Type::String), Slot::new("from", Type::String)],
        )
    }

    fn sms() -> ChannelSchema {
        ChannelSchema::new(
            "phone",
            "send_sms",
            ChannelType::Action,
            vec![
                Slot::new("to", Type::PhoneNumber).required(),
                Slot::new("body", Type::String).required(),
            ],
        )
        .global()
    }

    fn compiler() -> SchemaCompiler {
        let mut schemas = InMemorySchemas::with_builtins();
        schemas.insert(twitter());
        schemas.insert(sms());
        SchemaCompiler::new(Arc::new(schemas))
    }

    #[test]
    fn rewrites_event_placeholders() {
        assert_eq!(
            value_expression(&Value::VarRef("$event.body".into())).to_string(),
            r#"$eventToString("string-body")"#
        );
        assert_eq!(
            value_expression(&Value::VarRef("$event".into())).to_string(),
            "$eventToString()"
        );
        assert_eq!(
            value_expression(&Value::VarRef("$other".into())),
            Expression::VarRef("$other".into())
        );
    }

    #[test]
    fn maps_operators() {
        let has = comparison_expression(&Comparison::new(
            "tags",
            Operator::Has,
            Value::String("x".into()),
        ))
        .unwrap();
        assert!(matches!(has, Expression::FunctionCall { ref name, .. } if name == "contains"));

        let err = comparison_expression(&Comparison::new(
            "tags",
            Operator::Other("~=".into()),
            Value::String("x".into()),
        ))
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperator(_)));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn generates_rule_with_condition() {
        let trigger = resolved(
            twitter(),
            vec![None, None],
            vec![Comparison::new("text", Operator::Contains, Value::String("cat".into()))],
        );
        let action = resolved(
            sms(),
            vec![
                Some(Value::phone("+15550100")),
                Some(Value::VarRef("$event".into())),
            ],
            vec![],
        );
        let ids = SequentialIds::new();
        let program = generate_program(&compiler(), &ids, Some(&trigger), None, Some(&action))
            .await
            .unwrap();
        assert_eq!(program.name, "RulecraftGeneratedTwitterToPhone");
        assert_eq!(program.id, "app-0");
        assert!(program.code.contains(
            r#"@(type="twitter").source(text, from), text =~ "cat" => @phone.send_sms("+15550100"^^tt:phone_number, $eventToString());"#
        ));
    }

    #[tokio::test]
    async fn lone_trigger_is_a_monitor() {
        let timer = ChannelSchema::new(
            "builtin",
            "timer",
            ChannelType::Trigger,
            vec![Slot::new("interval", Type::Measure("ms".into())).required()],
        );
        let trigger = resolved(timer, vec![Some(Value::measure(5.0, "min"))], vec![]);
        let program = generate_program(&compiler(), &SequentialIds::new(), Some(&trigger), None, None)
            .await
            .unwrap();
        assert_eq!(program.name, "RulecraftGeneratedMonitorTimer");
        assert!(program.code.contains("@$timer(5min) => @$notify();"));
    }

    #[tokio::test]
    async fn lone_action_is_immediate() {
        let mut action = resolved(
            sms(),
            vec![Some(Value::phone("+1")), Some(Value::String("hi".into()))],
            vec![],
        );
        action.id = Some("phone-1".into());
        let program = generate_program(&compiler(), &SequentialIds::new(), None, None, Some(&action))
            .await
            .unwrap();
        assert_eq!(program.name, "RulecraftImmediatePhone");
        assert!(program.code.contains(r#"now => @(type="phone", id="phone-1").send_sms("#));
    }

    #[tokio::test]
    async fn unbound_action_parameter_is_invalid() {
        let action = resolved(sms(), vec![Some(Value::phone("+1")), None], vec![]);
        let err = generate_program(&compiler(), &SequentialIds::new(), None, None, Some(&action))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProgramInvalid(_)));
    }

    struct Rejecting;

    #[async_trait]
    impl ProgramCompiler for Rejecting {
        async fn compile(&self, _program: &Program) -> std::result::Result<String, CompileError> {
            Err(CompileError::Structure("no".into()))
        }
    }

    #[tokio::test]
    async fn compiler_rejection_yields_nothing() {
        let action = resolved(
            sms(),
            vec![Some(Value::phone("+1")), Some(Value::String("hi".into()))],
            vec![],
        );
        let ids = SequentialIds::new();
        let err = generate_program(&Rejecting, &ids, None, None, Some(&action))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProgramInvalid(ref msg) if msg == "no"));
        // no identifier was consumed
        assert_eq!(ids.next_id("app"), "app-0");
    }
}
