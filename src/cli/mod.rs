pub mod commands;

pub use commands::{build_cli, handle_subcommands, needs_module, select_module};
