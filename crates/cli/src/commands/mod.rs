//! CLI subcommand implementations.

pub mod ask;
pub mod daemon;
