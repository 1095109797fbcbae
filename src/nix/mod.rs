//! Purpose: Build the Nix-side text of an evaluation request.
//! Exports: `literal` (string literal encoding), `request` (expression assembly).
//! Role: Everything that writes Nix syntax lives here; nothing here evaluates it.
//! Invariants: Produced text is valid Nix for any payload, including hostile ones.

pub mod literal;
pub mod request;
