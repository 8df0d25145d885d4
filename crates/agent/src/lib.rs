//! Library surface of the `vigia-agent` binary, split out so the
//! configuration parsing and run loop stay testable.

pub mod config;
pub mod runner;
