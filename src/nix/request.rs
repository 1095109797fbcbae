//! Purpose: Assemble the two expression arguments of an evaluation request.
//! Exports: `InputSource`, `EvalRequest`, `build_request`.
//! Role: Decide how the JSON payload reaches the evaluator; wrap the user code.
//! Invariants: The input expression and the code expression stay separate arguments.
//! Invariants: File paths and inline payloads both travel through `literal::string_literal`.

use std::path::Path;

use crate::nix::literal::string_literal;

/// Where the bound `input` value comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InputSource {
    /// No external data; `input` is bound to `null`.
    Bare,
    /// Parse JSON read from a file. The path must already be absolute.
    File(std::path::PathBuf),
    /// Parse JSON from captured text (usually stdin).
    Inline(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EvalRequest {
    pub input_expr: String,
    pub code_expr: String,
}

/// Build the request for `user_expr` against `source`.
///
/// The `with builtins;` prefix puts the standard builtins, including the
/// bound `input` value, in scope of the user expression by bare name.
pub fn build_request(source: &InputSource, user_expr: &str) -> EvalRequest {
    EvalRequest {
        input_expr: input_expr(source),
        code_expr: format!("with builtins; {user_expr}"),
    }
}

fn input_expr(source: &InputSource) -> String {
    match source {
        InputSource::Bare => "null".to_string(),
        InputSource::File(path) => {
            let path = normalize_separators(path);
            format!(
                "builtins.fromJSON (builtins.readFile {})",
                string_literal(&path)
            )
        }
        InputSource::Inline(text) => {
            format!("builtins.fromJSON ({})", string_literal(text))
        }
    }
}

fn normalize_separators(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::{InputSource, build_request};
    use std::path::PathBuf;

    #[test]
    fn bare_mode_binds_null() {
        let request = build_request(&InputSource::Bare, "1 + 1");
        assert_eq!(request.input_expr, "null");
        assert_eq!(request.code_expr, "with builtins; 1 + 1");
    }

    #[test]
    fn file_mode_quotes_the_path() {
        let source = InputSource::File(PathBuf::from("/tmp/it's data.json"));
        let request = build_request(&source, "input");
        assert_eq!(
            request.input_expr,
            "builtins.fromJSON (builtins.readFile ''/tmp/it''\\'s data.json'')"
        );
    }

    #[test]
    fn file_mode_normalizes_backslash_separators() {
        let source = InputSource::File(PathBuf::from(r"C:\data\in.json"));
        let request = build_request(&source, "input");
        assert_eq!(
            request.input_expr,
            "builtins.fromJSON (builtins.readFile ''C:/data/in.json'')"
        );
    }

    #[test]
    fn inline_mode_embeds_the_payload() {
        let source = InputSource::Inline("{\"x\": 1}".to_string());
        let request = build_request(&source, "input.x");
        assert_eq!(
            request.input_expr,
            "builtins.fromJSON (''{\"x\": 1}'')"
        );
        assert_eq!(request.code_expr, "with builtins; input.x");
    }

    #[test]
    fn hostile_inline_payload_cannot_break_out() {
        let source = InputSource::Inline("'' + (import /etc/passwd) + ''".to_string());
        let request = build_request(&source, "input");
        assert_eq!(
            request.input_expr,
            "builtins.fromJSON (''''\\'''\\' + (import /etc/passwd) + ''\\'''\\''')"
        );
    }
}
