//! Purpose: JSON text transcoding shared by the CLI output path.
//! Exports: `unescape` module with the escape decoder and UTF-8 encoder.
//! Role: Single seam for escape handling so callsites avoid ad hoc decode logic.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub mod unescape;
