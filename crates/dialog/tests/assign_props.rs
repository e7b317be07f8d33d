//! Slot assignment properties.

use proptest::prelude::*;
use rulecraft_core::{Comparison, Error, Operator, Scope, Slot, Type, Value};
use rulecraft_dialog::assign_slots;

// ── Assignment properties ─────────────────────────────────────────────────

fn slot_strategy() -> impl Strategy<Value = Vec<(bool, bool, bool)>> {
    // (required, prefilled, must_fill) per slot
    prop::collection::vec((any::<bool>(), any::<bool>(), any::<bool>()), 0..8)
}

fn build(layout: &[(bool, bool, bool)]) -> (Vec<Slot>, Vec<Comparison>, Vec<String>) {
    let mut slots = Vec::new();
    let mut prefilled = Vec::new();
    let mut must_fill = Vec::new();
    for (i, (required, filled, must)) in layout.iter().enumerate() {
        let name = format!("s{i}");
        let mut slot = Slot::new(&name, Type::Number);
        if *required {
            slot = slot.required();
        }
        slots.push(slot);
        if *filled {
            prefilled.push(Comparison::is(&name, Value::Number(i as f64)));
        }
        if *must {
            must_fill.push(name);
        }
    }
    (slots, prefilled, must_fill)
}

proptest! {
    #![proptest_config(ProptestConfig { failure_persistence: None, ..ProptestConfig::default() })]

    #[test]
    fn every_slot_is_bound_queued_or_published(layout in slot_strategy(), fill_all in any::<bool>()) {
        let (slots, prefilled, must_fill) = build(&layout);
        let mut scope = Scope::new();
        let assignment = assign_slots(&slots, &prefilled, fill_all, &must_fill, &mut scope).unwrap();

        prop_assert_eq!(assignment.values.len(), slots.len());
        prop_assert!(assignment.comparisons.is_empty());
        prop_assert!(assignment.to_fill.windows(2).all(|w| w[0] < w[1]));

        for (i, slot) in slots.iter().enumerate() {
            let bound = assignment.values[i].is_some();
            let queued = assignment.to_fill.contains(&i);
            let published = scope.contains_key(&slot.name);
            prop_assert_eq!(
                [bound, queued, published].iter().filter(|b| **b).count(),
                1,
                "slot {} is bound={} queued={} published={}",
                slot.name, bound, queued, published
            );
            if fill_all {
                prop_assert!(!published);
            }
            if !bound && (slot.required || must_fill.contains(&slot.name)) {
                prop_assert!(queued);
            }
        }
    }

    #[test]
    fn predicates_are_refused_when_filling_everything(layout in slot_strategy()) {
        prop_assume!(!layout.is_empty());
        let (slots, mut prefilled, must_fill) = build(&layout);
        prefilled.push(Comparison::new("s0", Operator::GreaterThan, Value::Number(1.0)));

        let mut scope = Scope::new();
        let err = assign_slots(&slots, &prefilled, true, &must_fill, &mut scope).unwrap_err();
        prop_assert!(matches!(err, Error::InvalidPredicate { .. }), "unexpected error");
        prop_assert!(scope.is_empty());

        let kept = assign_slots(&slots, &prefilled, false, &must_fill, &mut Scope::new()).unwrap();
        prop_assert_eq!(kept.comparisons.len(), 1);
    }
}

#[test]
fn unknown_argument_is_an_unresolved_reference() {
    let slots = vec![Slot::new("a", Type::String)];
    let prefilled = vec![Comparison::is("zzz", Value::String("x".into()))];
    let mut scope = Scope::new();
    let err = assign_slots(&slots, &prefilled, false, &[], &mut scope).unwrap_err();
    assert!(matches!(err, Error::UnresolvedReference { ref name, .. } if name == "zzz"));
    assert!(scope.is_empty());
}
