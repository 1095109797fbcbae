//! Purpose: Decode JSON string escapes back into raw bytes.
//! Exports: `unescape`, `push_utf8`, `UnescapeError`.
//! Role: Core transcoding layer behind `--raw` output formatting.
//! Invariants: Non-backslash bytes pass through verbatim, including raw multi-byte UTF-8.
//! Invariants: Unknown escapes are permissive (the escaped byte passes through).
//! Invariants: Surrogate pairs combine into one code point; a standalone half is an error.

use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnescapeError {
    /// A `\uXXXX` escape where one of the four digits is not hex.
    InvalidEscape { offset: usize },
    /// A `\uXXXX` escape with fewer than four bytes left in the buffer.
    TruncatedEscape { offset: usize },
    /// A surrogate escape without its matching pair half.
    LoneSurrogate { offset: usize, unit: u16 },
}

impl fmt::Display for UnescapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEscape { offset } => {
                write!(f, "invalid unicode escape at byte {offset}")
            }
            Self::TruncatedEscape { offset } => {
                write!(f, "truncated unicode escape at byte {offset}")
            }
            Self::LoneSurrogate { offset, unit } => {
                write!(f, "standalone surrogate escape \\u{unit:04x} at byte {offset}")
            }
        }
    }
}

impl StdError for UnescapeError {}

/// Append the canonical UTF-8 encoding of `cp` to `out`.
///
/// The caller guarantees `cp <= 0x10FFFF` and that surrogate halves never
/// arrive here standalone; `unescape` combines or rejects them first.
pub fn push_utf8(out: &mut Vec<u8>, cp: u32) {
    if cp <= 0x7F {
        out.push(cp as u8);
    } else if cp <= 0x7FF {
        out.push((0xC0 | (cp >> 6)) as u8);
        out.push((0x80 | (cp & 0x3F)) as u8);
    } else if cp <= 0xFFFF {
        out.push((0xE0 | (cp >> 12)) as u8);
        out.push((0x80 | ((cp >> 6) & 0x3F)) as u8);
        out.push((0x80 | (cp & 0x3F)) as u8);
    } else if cp <= 0x10FFFF {
        out.push((0xF0 | (cp >> 18)) as u8);
        out.push((0x80 | ((cp >> 12) & 0x3F)) as u8);
        out.push((0x80 | ((cp >> 6) & 0x3F)) as u8);
        out.push((0x80 | (cp & 0x3F)) as u8);
    }
}

/// Decode a JSON-escaped text run into the raw bytes it represents.
///
/// The input is the content of a JSON string (between the quotes), not a full
/// JSON document. A trailing lone backslash passes through literally.
pub fn unescape(input: &str) -> Result<Vec<u8>, UnescapeError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'\\' || i + 1 >= bytes.len() {
            out.push(b);
            i += 1;
            continue;
        }
        let escape_offset = i;
        let esc = bytes[i + 1];
        i += 2;
        match esc {
            b'"' | b'\\' | b'/' => out.push(esc),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'u' => {
                let unit = parse_hex4(bytes, i, escape_offset)?;
                i += 4;
                let cp = match unit {
                    0xD800..=0xDBFF => {
                        let low = take_low_surrogate(bytes, i).ok_or(
                            UnescapeError::LoneSurrogate {
                                offset: escape_offset,
                                unit,
                            },
                        )?;
                        i += 6;
                        0x10000 + (((unit as u32 - 0xD800) << 10) | (low as u32 - 0xDC00))
                    }
                    0xDC00..=0xDFFF => {
                        return Err(UnescapeError::LoneSurrogate {
                            offset: escape_offset,
                            unit,
                        });
                    }
                    _ => unit as u32,
                };
                push_utf8(&mut out, cp);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn parse_hex4(bytes: &[u8], at: usize, escape_offset: usize) -> Result<u16, UnescapeError> {
    if at + 4 > bytes.len() {
        return Err(UnescapeError::TruncatedEscape {
            offset: escape_offset,
        });
    }
    let mut unit: u16 = 0;
    for k in 0..4 {
        let digit = match bytes[at + k] {
            h @ b'0'..=b'9' => h - b'0',
            h @ b'a'..=b'f' => h - b'a' + 10,
            h @ b'A'..=b'F' => h - b'A' + 10,
            _ => {
                return Err(UnescapeError::InvalidEscape {
                    offset: escape_offset,
                });
            }
        };
        unit = (unit << 4) | digit as u16;
    }
    Ok(unit)
}

fn take_low_surrogate(bytes: &[u8], at: usize) -> Option<u16> {
    if at + 6 > bytes.len() || bytes[at] != b'\\' || bytes[at + 1] != b'u' {
        return None;
    }
    match parse_hex4(bytes, at + 2, at) {
        Ok(unit @ 0xDC00..=0xDFFF) => Some(unit),
        _ => None,
    }
}
