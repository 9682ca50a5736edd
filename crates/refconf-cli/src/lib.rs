//! refconf CLI library
//!
//! Exposes the CLI entry point so it can be embedded or wrapped.

mod cli;

pub use cli::run;
