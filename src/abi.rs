//! Purpose: C ABI boundary for the expression evaluator (libnixq).
//! Exports: `nixq_eval`, `nixq_string_free`, `nixq_error_free`, status codes.
//! Role: Stable two-expression surface between front ends and the evaluator.
//! Invariants: Out strings are caller-owned and released exactly once via the paired free.
//! Invariants: Status is tagged: value, null result, and error are distinct.
//! Invariants: Error kinds map 1:1 with core error kinds.
#![allow(non_camel_case_types)]

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::core::error::{Error, ErrorKind};
use crate::eval::{EvalOutcome, evaluate_request};

/// Evaluation succeeded; `*out_result` holds the value's display form.
pub const NIXQ_EVAL_VALUE: i32 = 0;
/// Evaluation succeeded and produced the null value; no out string.
pub const NIXQ_EVAL_NULL: i32 = 1;
/// Evaluation failed; `*out_err` describes why.
pub const NIXQ_EVAL_ERROR: i32 = 2;

#[repr(C)]
pub struct nixq_error {
    kind: i32,
    message: *mut c_char,
}

/// Evaluate `input_expr`, bind its value as the `input` builtin, then
/// evaluate `code_expr` in that scope.
///
/// Both expressions are null-terminated UTF-8. On `NIXQ_EVAL_VALUE` the
/// caller owns `*out_result` and must release it with `nixq_string_free`; on
/// `NIXQ_EVAL_ERROR` the caller owns `*out_err` and must release it with
/// `nixq_error_free`.
#[unsafe(no_mangle)]
pub extern "C" fn nixq_eval(
    input_expr: *const c_char,
    code_expr: *const c_char,
    out_result: *mut *mut c_char,
    out_err: *mut *mut nixq_error,
) -> i32 {
    if !out_result.is_null() {
        unsafe { *out_result = ptr::null_mut() };
    }
    if out_result.is_null() {
        return fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message("out_result is null"),
        );
    }
    let input_expr = match parse_expr(input_expr, "input_expr") {
        Ok(text) => text,
        Err(err) => return fail(out_err, err),
    };
    let code_expr = match parse_expr(code_expr, "code_expr") {
        Ok(text) => text,
        Err(err) => return fail(out_err, err),
    };

    match evaluate_request(input_expr, code_expr) {
        EvalOutcome::Value(text) => match CString::new(text) {
            Ok(cstr) => {
                unsafe {
                    *out_result = cstr.into_raw();
                }
                NIXQ_EVAL_VALUE
            }
            Err(_) => fail(
                out_err,
                Error::new(ErrorKind::Internal)
                    .with_message("result contains an interior NUL byte"),
            ),
        },
        EvalOutcome::Null => NIXQ_EVAL_NULL,
        EvalOutcome::Failed(message) => {
            fail(out_err, Error::new(ErrorKind::Eval).with_message(message))
        }
    }
}

/// Release a string allocated by `nixq_eval`.
#[unsafe(no_mangle)]
pub extern "C" fn nixq_string_free(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(s));
    }
}

/// Release an error allocated by `nixq_eval`.
#[unsafe(no_mangle)]
pub extern "C" fn nixq_error_free(err: *mut nixq_error) {
    if err.is_null() {
        return;
    }
    unsafe {
        let err = Box::from_raw(err);
        nixq_string_free(err.message);
    }
}

/// Read the kind code of an error handle.
#[unsafe(no_mangle)]
pub extern "C" fn nixq_error_kind(err: *const nixq_error) -> i32 {
    if err.is_null() {
        return 0;
    }
    unsafe { (*err).kind }
}

/// Borrow the message of an error handle; valid until `nixq_error_free`.
#[unsafe(no_mangle)]
pub extern "C" fn nixq_error_message(err: *const nixq_error) -> *const c_char {
    if err.is_null() {
        return ptr::null();
    }
    unsafe { (*err).message }
}

fn parse_expr<'a>(input: *const c_char, name: &str) -> Result<&'a str, Error> {
    if input.is_null() {
        return Err(Error::new(ErrorKind::Usage).with_message(format!("{name} is null")));
    }
    unsafe { CStr::from_ptr(input) }
        .to_str()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message(format!("{name} is not valid UTF-8")))
}

fn fail(out_err: *mut *mut nixq_error, err: Error) -> i32 {
    if !out_err.is_null() {
        let error = Box::new(nixq_error {
            kind: error_kind_code(err.kind()),
            message: to_c_string(err.message().unwrap_or("")),
        });
        unsafe {
            *out_err = Box::into_raw(error);
        }
    }
    NIXQ_EVAL_ERROR
}

fn to_c_string(input: &str) -> *mut c_char {
    CString::new(input.replace('\0', " "))
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

fn error_kind_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Eval => 3,
        ErrorKind::Escape => 4,
        ErrorKind::Io => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        NIXQ_EVAL_ERROR, NIXQ_EVAL_NULL, NIXQ_EVAL_VALUE, nixq_error, nixq_error_free,
        nixq_error_kind, nixq_error_message, nixq_eval, nixq_string_free,
    };
    use std::ffi::{CStr, CString};
    use std::os::raw::c_char;
    use std::ptr;

    fn eval(input_expr: &str, code_expr: &str) -> (i32, Option<String>, Option<(i32, String)>) {
        let input = CString::new(input_expr).unwrap();
        let code = CString::new(code_expr).unwrap();
        let mut out_result: *mut c_char = ptr::null_mut();
        let mut out_err: *mut nixq_error = ptr::null_mut();
        let status = nixq_eval(input.as_ptr(), code.as_ptr(), &mut out_result, &mut out_err);

        let result = if out_result.is_null() {
            None
        } else {
            let text = unsafe { CStr::from_ptr(out_result) }
                .to_string_lossy()
                .into_owned();
            nixq_string_free(out_result);
            Some(text)
        };
        let error = if out_err.is_null() {
            None
        } else {
            let kind = nixq_error_kind(out_err);
            let message = unsafe { CStr::from_ptr(nixq_error_message(out_err)) }
                .to_string_lossy()
                .into_owned();
            nixq_error_free(out_err);
            Some((kind, message))
        };
        (status, result, error)
    }

    #[test]
    fn value_status_returns_a_string() {
        let (status, result, error) = eval("null", "with builtins; toString (1 + 1)");
        assert_eq!(status, NIXQ_EVAL_VALUE);
        assert_eq!(result.as_deref(), Some("\"2\""));
        assert!(error.is_none());
    }

    #[test]
    fn null_status_has_no_out_string() {
        let (status, result, error) = eval("null", "with builtins; null");
        assert_eq!(status, NIXQ_EVAL_NULL);
        assert!(result.is_none());
        assert!(error.is_none());
    }

    #[test]
    fn error_status_carries_kind_and_message() {
        let (status, result, error) = eval("null", "with builtins; noSuchVariable");
        assert_eq!(status, NIXQ_EVAL_ERROR);
        assert!(result.is_none());
        let (kind, message) = error.expect("error handle");
        assert_eq!(kind, 3);
        assert!(!message.is_empty());
    }

    #[test]
    fn null_arguments_are_usage_errors() {
        let code = CString::new("1").unwrap();
        let mut out_result: *mut c_char = ptr::null_mut();
        let mut out_err: *mut nixq_error = ptr::null_mut();
        let status = nixq_eval(ptr::null(), code.as_ptr(), &mut out_result, &mut out_err);
        assert_eq!(status, NIXQ_EVAL_ERROR);
        assert_eq!(nixq_error_kind(out_err), 2);
        nixq_error_free(out_err);
    }
}
