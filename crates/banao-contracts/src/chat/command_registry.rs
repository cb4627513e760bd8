#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "person",
        action: "set_person",
    },
    CommandSpec {
        command: "style",
        action: "set_style",
    },
];

pub(crate) const RATIO_COMMAND: CommandSpec = CommandSpec {
    command: "ratio",
    action: "set_ratio",
};

pub(crate) const DOWNLOAD_COMMAND: CommandSpec = CommandSpec {
    command: "download",
    action: "download",
};

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "ratios",
        action: "list_ratios",
    },
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "theme",
        action: "toggle_theme",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const SESSION_HELP_COMMANDS: &[&str] = &[
    "/person <path>",
    "/style <path>",
    "/ratio <Original|9:16|16:9|3:2|4:3>",
    "/ratios",
    "/generate",
    "/download [dir]",
    "/status",
    "/theme",
    "/help",
    "/quit",
];
