//! Batch interfaces used by the binary: JSON-lines commands in, wallet CSV out.

pub mod csv;
pub mod jsonl;
