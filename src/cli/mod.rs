//! CLI module - argument parsing and interactive prompts

mod args;
mod prompts;

pub use args::{validate_proportion, Cli, Commands};
pub use prompts::*;
