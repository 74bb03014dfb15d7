//! Plaintext exposition of a collection pass.
//!
//! Collected metrics are grouped by base name. Each group becomes one stanza
//! of `# HELP` and `# TYPE` lines followed by one line per series; stanzas
//! are separated by a blank line.

mod text;

pub use text::{encode, render, CONTENT_TYPE};
