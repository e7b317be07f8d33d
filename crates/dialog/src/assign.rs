//! Slot assignment: deciding, from what the parser already supplied, which
//! slots are bound, which must be asked for, and which arguments are really
//! predicates.

use rulecraft_core::{Comparison, Error, Operator, Result, Scope, Slot, Value};
use tracing::debug;

/// The outcome of [`assign_slots`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotAssignment {
    /// Parallel to the slots; `None` where nothing was supplied.
    pub values: Vec<Option<Value>>,
    /// Supplied arguments that did not bind a slot.
    pub comparisons: Vec<Comparison>,
    /// Indices of slots that must be asked for, in slot order.
    pub to_fill: Vec<usize>,
}

impl SlotAssignment {
    /// Indices of slots bound to a placeholder, in slot order.
    pub fn to_concretize(&self) -> Vec<usize> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.as_ref().is_some_and(Value::is_var_ref))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Match pre-supplied arguments against slots.
///
/// For every slot, the first `is` argument with the same name binds it. An
/// unbound slot is queued for asking when `fill_all` is set, when it is
/// required, or when it is listed in `must_fill`; otherwise it is published
/// into `scope` so later stages of the same command can see it. Arguments not
/// consumed as bindings become comparisons, which `fill_all` forbids.
///
/// `scope` is only touched when assignment succeeds.
pub fn assign_slots(
    slots: &[Slot],
    prefilled: &[Comparison],
    fill_all: bool,
    must_fill: &[String],
    scope: &mut Scope,
) -> Result<SlotAssignment> {
    let mut assigned = vec![false; prefilled.len()];
    let mut assignment = SlotAssignment {
        values: Vec::with_capacity(slots.len()),
        ..Default::default()
    };
    let mut published = Vec::new();

    for (i, slot) in slots.iter().enumerate() {
        let binding = prefilled
            .iter()
            .enumerate()
            .find(|(_, pre)| pre.name == slot.name && pre.operator == Operator::Is);

        match binding {
            Some((j, pre)) => {
                slot.accepts(&pre.value)
                    .map_err(|source| Error::TypeMismatch {
                        slot: slot.name.clone(),
                        source,
                    })?;
                assignment.values.push(Some(pre.value.clone()));
                assigned[j] = true;
            }
            None => {
                assignment.values.push(None);
                if fill_all || slot.required || must_fill.contains(&slot.name) {
                    assignment.to_fill.push(i);
                } else {
                    published.push(slot);
                }
            }
        }
    }

    for (pre, assigned) in prefilled.iter().zip(assigned) {
        if !slots.iter().any(|s| s.name == pre.name) {
            return Err(Error::UnresolvedReference {
                name: pre.name.clone(),
                operator: pre.operator.clone(),
                value: pre.value.to_string(),
            });
        }
        if !assigned {
            assignment.comparisons.push(pre.clone());
        }
    }

    if let (true, Some(first)) = (fill_all, assignment.comparisons.first()) {
        return Err(Error::InvalidPredicate {
            name: first.name.clone(),
        });
    }

    for slot in published {
        scope.insert(slot.name.clone(), slot.clone());
    }
    debug!(
        bound = assignment.values.iter().filter(|v| v.is_some()).count(),
        to_fill = assignment.to_fill.len(),
        comparisons = assignment.comparisons.len(),
        "Assigned slots"
    );
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulecraft_core::Type;

    fn slots() -> Vec<Slot> {
        vec![
            Slot::new("a", Type::String).required(),
            Slot::new("b", Type::Number),
            Slot::new("c", Type::Measure("C".into())).required(),
        ]
    }

    #[test]
    fn required_slots_are_queued_and_optional_published() {
        let mut scope = Scope::new();
        let result = assign_slots(&slots(), &[], false, &[], &mut scope).unwrap();
        assert_eq!(result.to_fill, vec![0, 2]);
        assert_eq!(result.values, vec![None, None, None]);
        assert!(scope.contains_key("b"));
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn fill_all_and_must_fill_queue_everything_named() {
        let mut scope = Scope::new();
        let all = assign_slots(&slots(), &[], true, &[], &mut scope).unwrap();
        assert_eq!(all.to_fill, vec![0, 1, 2]);
        assert!(scope.is_empty());

        let must = assign_slots(&slots(), &[], false, &["b".into()], &mut scope).unwrap();
        assert_eq!(must.to_fill, vec![0, 1, 2]);
    }

    #[test]
    fn first_is_binds_and_the_rest_become_comparisons() {
        let prefilled = vec![
            Comparison::new("b", Operator::GreaterThan, Value::Number(1.0)),
            Comparison::is("b", Value::Number(5.0)),
            Comparison::is("b", Value::Number(6.0)),
        ];
        let mut scope = Scope::new();
        let result = assign_slots(&slots(), &prefilled, false, &[], &mut scope).unwrap();
        assert_eq!(result.values[1], Some(Value::Number(5.0)));
        assert_eq!(result.comparisons, vec![prefilled[0].clone(), prefilled[2].clone()]);
        assert!(!scope.contains_key("b"));
    }

    #[test]
    fn placeholders_bind_without_type_check() {
        let prefilled = vec![Comparison::is("a", Value::VarRef("$contact(bob)".into()))];
        let mut scope = Scope::new();
        let result = assign_slots(&slots(), &prefilled, false, &[], &mut scope).unwrap();
        assert_eq!(result.to_concretize(), vec![0]);
        assert_eq!(result.to_fill, vec![2]);
    }

    #[test]
    fn type_mismatch_is_reported() {
        let prefilled = vec![Comparison::is("c", Value::measure(3.0, "kg"))];
        let err = assign_slots(&slots(), &prefilled, false, &[], &mut Scope::new()).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref slot, .. } if slot == "c"));
    }

    #[test]
    fn unknown_argument_is_unresolved() {
        let prefilled = vec![Comparison::is("zzz", Value::Number(1.0))];
        let mut scope = Scope::new();
        let err = assign_slots(&slots(), &prefilled, false, &[], &mut scope).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { ref name, .. } if name == "zzz"));
        assert!(scope.is_empty());
    }

    #[test]
    fn actions_cannot_have_conditions() {
        let prefilled = vec![Comparison::new("b", Operator::LessThan, Value::Number(3.0))];
        let mut scope = Scope::new();
        let err = assign_slots(&slots(), &prefilled, true, &[], &mut scope).unwrap_err();
        assert!(matches!(err, Error::InvalidPredicate { ref name } if name == "b"));
        assert!(scope.is_empty());
    }
}
