//! Purpose: Shared library crate behind the `nixq` CLI and the libnixq C ABI.
//! Exports: `core` (errors), `json` (escape transcoding), `nix` (request building), `eval`, `abi`.
//! Role: Internal library backing the binary; the C ABI in `abi` is the stable surface.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
//! Invariants: Only `abi` deals in raw pointers; everything below it is safe Rust.
pub mod abi;
pub mod core;
pub mod eval;
pub mod json;
pub mod nix;
