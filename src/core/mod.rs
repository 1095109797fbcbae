//! Purpose: Hold cross-cutting primitives shared by the CLI, evaluator, and ABI.
//! Exports: `error`.
//! Invariants: Nothing in here talks to the evaluator or the terminal.

pub mod error;
