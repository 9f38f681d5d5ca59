pub mod args;
pub mod commands;

pub use args::{Cli, Commands, ProcessArgs};
pub use commands::{build_processor, run, setup_logging};
