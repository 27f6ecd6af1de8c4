//! Property-based tests for the evaluator.

use num_bigint::BigInt;
use proptest::prelude::*;
use quarry_core::analyzer::{EvaluatedKind, JsValue};
use quarry_core::{Analyzer, AnalyzerOptions, EvaluatedExpression};

fn evaluate(source: &str) -> EvaluatedExpression {
    let analyzer = Analyzer::<()>::new(AnalyzerOptions::default()).expect("default options");
    analyzer.evaluate(source).expect("valid expression")
}

// ============================================================================
// Strategies
// ============================================================================

/// A literal's source text and the value it denotes.
fn arb_literal() -> impl Strategy<Value = (String, JsValue)> {
    prop_oneof![
        (0u32..1_000_000).prop_map(|n| (n.to_string(), JsValue::Number(f64::from(n)))),
        (0u32..10_000, 0u32..1000).prop_map(|(whole, frac)| {
            let text = format!("{whole}.{frac:03}");
            let value = text.parse().unwrap_or(f64::NAN);
            (text, JsValue::Number(value))
        }),
        "[a-zA-Z0-9 _./-]{0,16}".prop_map(|s| (format!("'{s}'"), JsValue::String(s))),
        any::<bool>().prop_map(|b| (b.to_string(), JsValue::Boolean(b))),
        "0|[1-9][0-9]{0,60}".prop_map(|digits| {
            let value = digits.parse::<BigInt>().unwrap_or_default();
            (format!("{digits}n"), JsValue::BigInt(value))
        }),
        Just(("null".to_string(), JsValue::Null)),
    ]
}

fn arb_string_literal() -> impl Strategy<Value = String> {
    "[a-z0-9]{0,8}".prop_map(|s| format!("\"{s}\""))
}

fn arb_identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}".prop_map(|s| format!("v_{s}"))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn literals_round_trip((source, value) in arb_literal()) {
        let evaluated = evaluate(&source);
        prop_assert_eq!(evaluated.as_compile_time_value(), Some(value));
        prop_assert!(!evaluated.could_have_side_effects());
    }

    #[test]
    fn string_concatenation_is_associative(
        a in arb_string_literal(),
        b in arb_string_literal(),
        c in arb_string_literal(),
    ) {
        let right = evaluate(&format!("{a} + ({b} + {c})"));
        let left = evaluate(&format!("({a} + {b}) + {c}"));
        prop_assert!(matches!(left.kind(), EvaluatedKind::String(_)));
        prop_assert_eq!(left.as_string(), right.as_string());
    }

    #[test]
    fn wrapped_strings_keep_their_edges(prefix in "[a-z./]{1,8}", postfix in "[a-z.]{1,8}", name in arb_identifier()) {
        let evaluated = evaluate(&format!("'{prefix}' + {name} + '{postfix}'"));
        let wrapped = evaluated.wrapped_value().expect("wrapped");
        prop_assert_eq!(wrapped.prefix.as_ref().and_then(|p| p.as_string()), Some(prefix));
        prop_assert_eq!(wrapped.postfix.as_ref().and_then(|p| p.as_string()), Some(postfix));
    }

    #[test]
    fn concat_extends_wrapped_postfix(
        prefix in "[a-z./]{1,8}",
        postfix in "[a-z.]{1,8}",
        tail in "[a-z]{1,4}",
        name in arb_identifier(),
    ) {
        let evaluated = evaluate(&format!("('{prefix}' + {name} + '{postfix}').concat('{tail}')"));
        let wrapped = evaluated.wrapped_value().expect("wrapped");
        prop_assert_eq!(wrapped.prefix.as_ref().and_then(|p| p.as_string()), Some(prefix));
        prop_assert_eq!(wrapped.postfix.as_ref().and_then(|p| p.as_string()), Some(format!("{postfix}{tail}")));
    }

    #[test]
    fn unknown_test_yields_both_options_in_order(name in arb_identifier()) {
        let evaluated = evaluate(&format!("{name} ? 'a' : 'b'"));
        let options: Vec<_> = evaluated
            .options_value()
            .expect("conditional")
            .iter()
            .map(|o| o.as_string())
            .collect();
        prop_assert_eq!(options, vec![Some("a".to_string()), Some("b".to_string())]);
    }
}

#[test]
fn concrete_cases() {
    assert_eq!(evaluate("1 + 3").kind(), &EvaluatedKind::Number(4.0));
    assert_eq!(evaluate("\"ab\" + 1").kind(), &EvaluatedKind::String("ab1".into()));
    assert_eq!(evaluate("typeof 123").kind(), &EvaluatedKind::String("number".into()));
    assert!(evaluate("[1,2,a]").is_unknown());
    assert_eq!(evaluate("false ? \"a\" : \"b\"").kind(), &EvaluatedKind::String("b".into()));
}
