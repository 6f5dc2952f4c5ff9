//! CLI subcommand implementations.

pub(crate) mod config;
pub(crate) mod identity;
pub(crate) mod keys;
pub(crate) mod lookup;
pub(crate) mod pointer;
