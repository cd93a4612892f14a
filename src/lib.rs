//! Purpose: Library crate for loading and storing values through pluggable codecs.
//! Exports: `api` (storage handles, codecs, locks, errors, convenience functions).
//! Role: Backs the `endure` CLI and embedding programs.
//! Invariants: Codecs see `serde_json::Value`; typed callers go through serde.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
mod core;
