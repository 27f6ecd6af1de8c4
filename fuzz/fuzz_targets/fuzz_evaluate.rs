#![no_main]

use libfuzzer_sys::fuzz_target;
use quarry_core::{Analyzer, AnalyzerOptions};

// Evaluate arbitrary expressions.  Whatever the evaluator folds must be
// internally consistent: a compile-time value has no unknown parts, and its
// string form agrees with `as_string`.
fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    if source.len() > 4 * 1024 {
        return;
    }
    let Ok(analyzer) = Analyzer::<()>::new(AnalyzerOptions::default()) else {
        return;
    };
    let Ok(evaluated) = analyzer.evaluate(source) else {
        return;
    };
    if let Some(value) = evaluated.as_compile_time_value() {
        assert!(evaluated.is_compile_time_value());
        if !value.is_object() {
            assert_eq!(evaluated.as_string(), Some(value.to_js_string()));
        }
    }
    let _ = evaluated.as_bool();
    let _ = evaluated.as_nullish();
});
