//! cloudpail CLI library
//!
//! Exposes the command tree, exit codes and output helpers so the binary
//! and the integration tests share one definition.

pub mod commands;
pub mod exit_code;
pub mod output;
