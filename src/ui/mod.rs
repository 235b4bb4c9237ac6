//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All command output goes through this module so that quiet, debug and
//! JSON modes behave the same everywhere. Diagnostics from the library go
//! through the `log` facade instead.

pub mod output;
