//! CLI subcommands.

pub mod logs;
pub mod migrate;
