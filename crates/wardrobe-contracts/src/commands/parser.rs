use crate::wizard::WizardStep;

use super::registry::{Action, CommandSpec, NO_ARG_COMMANDS, RAW_ARG_COMMANDS, REFERENCE_COMMANDS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardCommand {
    Noop,
    Presets,
    SelectFace { reference: String },
    SelectCloth { reference: String },
    Design { prompt: String },
    Generate,
    Navigate { step: WizardStep },
    Status,
    History,
    Save { path: Option<String> },
    Help,
    Quit,
    Invalid { command: String, message: String },
    Unknown { command: String, arg: String },
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<Action> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_single_arg(arg: &str) -> String {
    if arg.trim().is_empty() {
        return String::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect::<Vec<String>>()
            .join(" "),
        Err(_) => arg.trim().to_string(),
    }
}

fn invalid(command: &str, message: &str) -> WizardCommand {
    WizardCommand::Invalid {
        command: command.to_string(),
        message: message.to_string(),
    }
}

fn parse_raw_arg(command: &str, action: Action, arg: &str) -> WizardCommand {
    match action {
        Action::Design => WizardCommand::Design {
            prompt: arg.to_string(),
        },
        Action::Navigate => match arg.parse::<u8>().ok().and_then(WizardStep::from_number) {
            Some(step) => WizardCommand::Navigate { step },
            None => invalid(command, "expected a step number between 1 and 3"),
        },
        Action::Save => {
            let path = parse_single_arg(arg);
            WizardCommand::Save {
                path: (!path.is_empty()).then_some(path),
            }
        }
        _ => WizardCommand::Unknown {
            command: command.to_string(),
            arg: arg.to_string(),
        },
    }
}

fn no_arg_command(action: Action) -> WizardCommand {
    match action {
        Action::Presets => WizardCommand::Presets,
        Action::Generate => WizardCommand::Generate,
        Action::Status => WizardCommand::Status,
        Action::History => WizardCommand::History,
        Action::Help => WizardCommand::Help,
        Action::Quit => WizardCommand::Quit,
        _ => WizardCommand::Noop,
    }
}

/// Parses one line of session input. Plain text (no leading `/`) is treated
/// as an outfit description.
pub fn parse_command(text: &str) -> WizardCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return WizardCommand::Noop;
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, REFERENCE_COMMANDS) {
                let reference = parse_single_arg(arg);
                if reference.is_empty() {
                    return invalid(&command, "expected a preset id, file path or URL");
                }
                return match action {
                    Action::SelectFace => WizardCommand::SelectFace { reference },
                    _ => WizardCommand::SelectCloth { reference },
                };
            }

            if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
                return parse_raw_arg(&command, action, arg);
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return no_arg_command(action);
            }

            return WizardCommand::Unknown {
                command,
                arg: arg.to_string(),
            };
        }
    }

    WizardCommand::Design {
        prompt: raw_trimmed.to_string(),
    }
}
