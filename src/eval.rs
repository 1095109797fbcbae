//! Purpose: Run evaluation requests through snix-eval.
//! Exports: `EvalOutcome`, `evaluate_request`.
//! Role: Safe evaluator core behind the C ABI surface in `abi`.
//! Invariants: The input expression is evaluated first and bound as the `input` builtin.
//! Invariants: A null value, a non-null value, and a failure are three distinct outcomes.
//! Invariants: Warnings go to diagnostics, never stdout.

use std::env;
use std::path::PathBuf;

use snix_eval::{Evaluation, Value};

/// Tagged result of one evaluation request.
#[derive(Debug)]
pub enum EvalOutcome {
    /// Evaluation succeeded; the value's display form.
    Value(String),
    /// Evaluation succeeded and produced the null value.
    Null,
    /// Evaluation failed; joined evaluator error messages.
    Failed(String),
}

/// Evaluate `input_expr`, bind the result as the `input` builtin, then
/// evaluate `code_expr` in that scope.
pub fn evaluate_request(input_expr: &str, code_expr: &str) -> EvalOutcome {
    let input = match evaluate(input_expr, None) {
        Ok(value) => value,
        Err(message) => return EvalOutcome::Failed(message),
    };
    match evaluate(code_expr, Some(input)) {
        Ok(Value::Null) => EvalOutcome::Null,
        Ok(value) => EvalOutcome::Value(value.to_string()),
        Err(message) => EvalOutcome::Failed(message),
    }
}

fn evaluate(code: &str, input: Option<Value>) -> Result<Value, String> {
    let mut builder = Evaluation::builder_impure();
    if let Some(input) = input {
        builder = builder.add_builtins([("input", input)]);
    }
    let evaluator = builder.build();
    let source_map = evaluator.source_map();
    let result = evaluator.evaluate(code, Some(cwd()));

    for warning in &result.warnings {
        tracing::warn!("{}", warning.fancy_format_str(&source_map));
    }

    match result.value {
        Some(value) => Ok(value),
        None => {
            let details = result
                .errors
                .iter()
                .map(|err| err.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            if details.is_empty() {
                Err("evaluation produced no value".to_string())
            } else {
                Err(details)
            }
        }
    }
}

fn cwd() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| "/".into())
}

#[cfg(test)]
mod tests {
    use super::{EvalOutcome, evaluate_request};

    #[test]
    fn value_outcome_carries_display_form() {
        match evaluate_request("null", "with builtins; 1 + 1") {
            EvalOutcome::Value(text) => assert_eq!(text, "2"),
            other => panic!("expected value, got {other:?}"),
        }
    }

    #[test]
    fn input_is_bound_from_the_input_expression() {
        match evaluate_request("{ x = 41; }", "with builtins; input.x + 1") {
            EvalOutcome::Value(text) => assert_eq!(text, "42"),
            other => panic!("expected value, got {other:?}"),
        }
    }

    #[test]
    fn null_result_is_distinct_from_failure() {
        assert!(matches!(
            evaluate_request("null", "with builtins; null"),
            EvalOutcome::Null
        ));
    }

    #[test]
    fn failure_carries_a_message() {
        match evaluate_request("null", "with builtins; noSuchVariable") {
            EvalOutcome::Failed(message) => assert!(!message.is_empty()),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn failing_input_expression_fails_the_request() {
        assert!(matches!(
            evaluate_request("builtins.fromJSON (''not json'')", "with builtins; input"),
            EvalOutcome::Failed(_)
        ));
    }
}
