mod parser;
mod registry;

pub use parser::{parse_command, WizardCommand};
pub use registry::SESSION_HELP_COMMANDS;
