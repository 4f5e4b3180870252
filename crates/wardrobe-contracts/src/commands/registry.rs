#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Presets,
    SelectFace,
    SelectCloth,
    Design,
    Generate,
    Navigate,
    Status,
    History,
    Save,
    Help,
    Quit,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: Action,
}

pub(crate) const REFERENCE_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "face",
        action: Action::SelectFace,
    },
    CommandSpec {
        command: "model",
        action: Action::SelectFace,
    },
    CommandSpec {
        command: "cloth",
        action: Action::SelectCloth,
    },
    CommandSpec {
        command: "outfit",
        action: Action::SelectCloth,
    },
];

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "design",
        action: Action::Design,
    },
    CommandSpec {
        command: "step",
        action: Action::Navigate,
    },
    CommandSpec {
        command: "save",
        action: Action::Save,
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "presets",
        action: Action::Presets,
    },
    CommandSpec {
        command: "generate",
        action: Action::Generate,
    },
    CommandSpec {
        command: "retry",
        action: Action::Generate,
    },
    CommandSpec {
        command: "status",
        action: Action::Status,
    },
    CommandSpec {
        command: "history",
        action: Action::History,
    },
    CommandSpec {
        command: "help",
        action: Action::Help,
    },
    CommandSpec {
        command: "quit",
        action: Action::Quit,
    },
    CommandSpec {
        command: "exit",
        action: Action::Quit,
    },
];

pub const SESSION_HELP_COMMANDS: &[(&str, &str)] = &[
    ("/presets", "list built-in model and outfit photos"),
    ("/face <id|path|url>", "step 1: choose the model photo"),
    ("/cloth <id|path|url>", "step 2: choose the outfit (starts the try-on)"),
    ("/design <description>", "step 2: design an outfit from text"),
    ("/generate, /retry", "step 3: run the try-on again"),
    ("/step <1-3>", "go back to an earlier step"),
    ("/status", "show the current selections"),
    ("/history", "list try-on results, newest first"),
    ("/save [path]", "write the latest result image to disk"),
    ("/quit", "leave the session"),
];
