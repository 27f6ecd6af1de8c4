#![no_main]

use libfuzzer_sys::fuzz_target;
use quarry_core::{Analyzer, AnalyzerOptions};

// Parse and walk arbitrary UTF-8 with a handler on every common hook
// family.  Syntax errors are expected; panics and hangs are not.
fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    if source.len() > 16 * 1024 {
        return;
    }
    let Ok(mut analyzer) = Analyzer::<usize>::new(AnalyzerOptions::default()) else {
        return;
    };
    let hooks = analyzer.hooks_mut();
    hooks.call.for_name("require").tap("fuzz", |w, expr| {
        let _ = w.evaluate_expression(expr);
        *w.state_mut() += 1;
        None
    });
    hooks.can_rename.for_name("require").tap("fuzz", |_, _| Some(true));
    hooks.import_call.tap("fuzz", |w, expr| {
        let _ = w.parse_comment_options(expr.loc());
        None
    });
    hooks.statement.tap("fuzz", |w, stmt| {
        let _ = w.is_asi_position(stmt.loc().end.offset);
        None
    });
    let _ = analyzer.parse(source, 0);
});
