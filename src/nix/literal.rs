//! Purpose: Encode arbitrary text as a Nix indented-string literal (`''…''`).
//! Exports: `string_literal`.
//! Role: Core embedding layer; lets a JSON payload travel inside generated Nix verbatim.
//! Invariants: Evaluating the produced literal yields exactly the input text.
//! Invariants: Quote runs, `${` interpolation starts, and indentation stripping are all neutralized.

/// Wrap `payload` in an indented-string literal that evaluates back to it.
///
/// Indented strings keep literal newlines, which is what makes them usable
/// for whole JSON documents. Three lexer behaviors have to be defused:
///
/// - `'` is escaped as `''\'` so the closing delimiter can never form;
/// - `${` is escaped as `''${` so payload text cannot start an interpolation;
/// - the first whitespace character of every line is escaped so the common
///   indentation is zero and the lexer's indent stripping is a no-op.
///
/// A payload-leading newline is written as the `''\n` escape because a
/// literal newline right after the opening quotes is dropped. `\r` is always
/// escaped since the lexer normalizes CRLF line endings.
pub fn string_literal(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len() + 8);
    out.push_str("''");
    let mut chars = payload.chars().peekable();
    let mut at_line_start = true;
    let mut first = true;
    while let Some(c) = chars.next() {
        match c {
            '\'' => out.push_str("''\\'"),
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push_str("''${");
            }
            '\r' => out.push_str("''\\r"),
            '\n' => {
                if first {
                    out.push_str("''\\n");
                } else {
                    out.push('\n');
                }
                first = false;
                at_line_start = true;
                continue;
            }
            ' ' if at_line_start => out.push_str("''\\ "),
            '\t' if at_line_start => out.push_str("''\\t"),
            other => out.push(other),
        }
        first = false;
        at_line_start = false;
    }
    out.push_str("''");
    out
}
