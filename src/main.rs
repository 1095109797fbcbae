//! Purpose: `nixq` CLI entry point: query JSON documents with Nix expressions.
//! Role: Binary crate root; parses args, builds one evaluation request, prints the result.
//! Invariants: Exactly one evaluator boundary call per invocation, no retries.
//! Invariants: Boundary-owned strings are released exactly once on every path.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `core::error::to_exit_code`.

use std::ffi::{CStr, CString, OsString};
use std::io::{self, IsTerminal, Read, Write};
use std::os::raw::c_char;
use std::path::PathBuf;
use std::ptr;

use clap::{Parser, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use nixq::abi;
use nixq::core::error::{Error, ErrorKind, to_exit_code};
use nixq::json::unescape::unescape;
use nixq::nix::request::{EvalRequest, InputSource, build_request};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `nixq --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    run_query(&cli).map_err(|err| (err, color_mode))
}

fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let replacement = arg.to_str().and_then(|value| match value {
                "help" => Some("--help"),
                _ => None,
            });
            replacement.map(OsString::from).unwrap_or_else(|| arg)
        })
        .collect()
}

#[derive(Parser)]
#[command(
    name = "nixq",
    version,
    about = "Query JSON documents with Nix expressions",
    override_usage = "nixq [OPTIONS] <NIX_EXPR> [JSON_FILE]",
    after_help = r#"EXAMPLES
  # Query JSON from stdin
  echo '{"key": "value"}' | nixq 'input.key'

  # Query JSON from a file
  nixq 'input.key' input.json

  # Evaluate a self-contained expression, no JSON input
  nixq --nix '1 + 1'

  # Unwrap a string result for shell consumption
  nixq --raw 'toJSON input' input.json"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        help = "Strip one layer of surrounding quotes and JSON-unescape the result"
    )]
    raw: bool,

    #[arg(
        long,
        help = "Treat <NIX_EXPR> as self-contained; skip JSON input entirely"
    )]
    nix: bool,

    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[arg(value_name = "NIX_EXPR", help = "The Nix expression to evaluate (quoted)")]
    expr: String,

    #[arg(
        value_name = "JSON_FILE",
        value_hint = ValueHint::FilePath,
        help = "Path to JSON input file; if omitted, reads from stdin"
    )]
    json_file: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

fn run_query(cli: &Cli) -> Result<RunOutcome, Error> {
    let source = gather_source(cli)?;
    let request = build_request(&source, &cli.expr);
    tracing::debug!(
        input_expr = %request.input_expr,
        code_expr = %request.code_expr,
        "built evaluation request"
    );

    match call_evaluator(&request)? {
        Some(result) if cli.raw => {
            let bytes = format_raw(&result)?;
            let mut stdout = io::stdout();
            stdout
                .write_all(&bytes)
                .and_then(|()| stdout.flush())
                .map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write result")
                        .with_source(err)
                })?;
        }
        Some(result) => println!("{result}"),
        None => println!("null"),
    }
    Ok(RunOutcome::ok())
}

fn gather_source(cli: &Cli) -> Result<InputSource, Error> {
    if cli.nix {
        return Ok(InputSource::Bare);
    }
    if let Some(path) = &cli.json_file {
        // Resolving to an absolute path here keeps relative paths working
        // even though the literal reaches the evaluator as a string.
        let resolved = std::fs::canonicalize(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to resolve json file {}", path.display()))
                .with_hint("Check that the file exists and the path is spelled correctly.")
                .with_source(err)
        })?;
        return Ok(InputSource::File(resolved));
    }
    let mut payload = String::new();
    io::stdin().read_to_string(&mut payload).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read JSON from stdin")
            .with_source(err)
    })?;
    Ok(InputSource::Inline(payload))
}

/// Owns a result string from the boundary; releases it exactly once on drop.
struct ResultHandle {
    ptr: *mut c_char,
}

impl ResultHandle {
    fn text(&self) -> Option<String> {
        if self.ptr.is_null() {
            return None;
        }
        Some(
            unsafe { CStr::from_ptr(self.ptr) }
                .to_string_lossy()
                .into_owned(),
        )
    }
}

impl Drop for ResultHandle {
    fn drop(&mut self) {
        abi::nixq_string_free(self.ptr);
    }
}

/// Owns an error handle from the boundary; releases it exactly once on drop.
struct ErrorHandle {
    ptr: *mut abi::nixq_error,
}

impl ErrorHandle {
    fn message(&self) -> Option<String> {
        if self.ptr.is_null() {
            return None;
        }
        let message = abi::nixq_error_message(self.ptr);
        if message.is_null() {
            return None;
        }
        Some(
            unsafe { CStr::from_ptr(message) }
                .to_string_lossy()
                .into_owned(),
        )
    }
}

impl Drop for ErrorHandle {
    fn drop(&mut self) {
        abi::nixq_error_free(self.ptr);
    }
}

/// The single boundary call. `Ok(None)` is a successful null result.
fn call_evaluator(request: &EvalRequest) -> Result<Option<String>, Error> {
    let input = expr_cstring(&request.input_expr)?;
    let code = expr_cstring(&request.code_expr)?;
    let mut out_result: *mut c_char = ptr::null_mut();
    let mut out_err: *mut abi::nixq_error = ptr::null_mut();
    let status = abi::nixq_eval(input.as_ptr(), code.as_ptr(), &mut out_result, &mut out_err);
    let result = ResultHandle { ptr: out_result };
    let error = ErrorHandle { ptr: out_err };

    match status {
        abi::NIXQ_EVAL_VALUE => result.text().map(Some).ok_or_else(|| {
            Error::new(ErrorKind::Internal).with_message("evaluator returned no result string")
        }),
        abi::NIXQ_EVAL_NULL => Ok(None),
        _ => {
            let mut err = Error::new(ErrorKind::Eval).with_message("evaluation failed");
            if let Some(hint) = error.message().filter(|hint| !hint.is_empty()) {
                err = err.with_hint(hint);
            }
            Err(err)
        }
    }
}

fn expr_cstring(expr: &str) -> Result<CString, Error> {
    CString::new(expr).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("input contains a NUL byte")
            .with_source(err)
    })
}

fn format_raw(result: &str) -> Result<Vec<u8>, Error> {
    unescape(strip_one_quote_layer(result)).map_err(|err| {
        Error::new(ErrorKind::Escape)
            .with_message("failed to decode result as a JSON-escaped string")
            .with_source(err)
    })
}

fn strip_one_quote_layer(result: &str) -> &str {
    let bytes = result.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        &result[1..result.len() - 1]
    } else {
        result
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Eval => "evaluation failed".to_string(),
        ErrorKind::Escape => "malformed escape in result".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = std::error::Error::source(err);
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{
        AnsiColor, Error, ErrorKind, colorize_label, error_json, error_text, format_raw,
        normalize_args, strip_one_quote_layer,
    };
    use std::ffi::OsString;

    #[test]
    fn normalize_args_maps_bare_help() {
        let args = normalize_args(vec![
            OsString::from("nixq"),
            OsString::from("help"),
            OsString::from("not-help"),
        ]);
        assert_eq!(args[1], OsString::from("--help"));
        assert_eq!(args[2], OsString::from("not-help"));
    }

    #[test]
    fn strip_one_quote_layer_is_single_layer() {
        assert_eq!(strip_one_quote_layer("\"hi\""), "hi");
        assert_eq!(strip_one_quote_layer("\"\"hi\"\""), "\"hi\"");
        assert_eq!(strip_one_quote_layer("hi"), "hi");
        assert_eq!(strip_one_quote_layer("\""), "\"");
        assert_eq!(strip_one_quote_layer(""), "");
    }

    #[test]
    fn format_raw_unescapes_the_inner_text() {
        assert_eq!(format_raw("\"a\\nb\"").unwrap(), b"a\nb");
        assert_eq!(format_raw("plain").unwrap(), b"plain");
    }

    #[test]
    fn format_raw_surfaces_escape_errors() {
        let err = format_raw("\"\\uZZZZ\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Escape);
    }

    #[test]
    fn error_text_respects_color_flag() {
        let err = Error::new(ErrorKind::Eval)
            .with_message("evaluation failed")
            .with_hint("check the expression");
        let plain = error_text(&err, false);
        assert!(plain.starts_with("error: evaluation failed"));
        assert!(plain.contains("hint: check the expression"));
        assert!(!plain.contains("\u{1b}["));

        let colored = error_text(&err, true);
        assert!(colored.contains("\u{1b}[31m"));
    }

    #[test]
    fn colorize_label_is_plain_when_disabled() {
        assert_eq!(colorize_label("error:", false, AnsiColor::Red), "error:");
    }

    #[test]
    fn error_json_envelope_has_kind_and_message() {
        let value = error_json(&Error::new(ErrorKind::Io).with_message("failed to read"));
        assert_eq!(value["error"]["kind"], "Io");
        assert_eq!(value["error"]["message"], "failed to read");
    }
}
