//! Slash command parsing for the REPL.

/// All slash commands with descriptions
pub const COMMANDS: &[(&str, &str)] = &[
    ("/chat", "Label following turns (no argument clears)"),
    ("/exit", "Exit"),
    ("/h", "Show help"),
    ("/help", "Show help"),
    ("/history", "Replay this session"),
    ("/new", "New conversation"),
    ("/quit", "Exit"),
    ("/session", "Session info"),
    ("/sessions", "List saved sessions"),
    ("/set", "Configuration (/set <key> <value>)"),
    ("/thinking", "Show or hide thinking"),
];

/// A parsed line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    Session,
    Sessions,
    History,
    Thinking,
    ChatId(Option<String>),
    /// `/set` with no key lists settings.
    Set { key: Option<String>, value: Option<String> },
    Help,
    Quit,
    Unknown(String),
    /// Anything that is not a slash command is sent to the model.
    Prompt(String),
}

impl Command {
    /// Parse one trimmed, non-empty line.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let Some(rest) = input.strip_prefix('/') else {
            return Self::Prompt(input.to_string());
        };

        let mut parts = rest.splitn(2, char::is_whitespace);
        let cmd = parts.next().unwrap_or_default().to_lowercase();
        let args = parts.next().map(str::trim).filter(|a| !a.is_empty());

        match cmd.as_str() {
            "new" => Self::New,
            "session" | "s" => Self::Session,
            "sessions" => Self::Sessions,
            "history" => Self::History,
            "thinking" | "think" => Self::Thinking,
            "chat" => Self::ChatId(args.map(str::to_string)),
            "set" => {
                let (key, value) = match args {
                    Some(args) => {
                        let mut kv = args.splitn(2, char::is_whitespace);
                        let key = kv.next().map(str::to_string);
                        let value = kv.next().map(|v| v.trim().to_string());
                        (key, value)
                    }
                    None => (None, None),
                };
                Self::Set { key, value }
            }
            "help" | "h" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(input.to_string()),
        }
    }
}

/// Help text lines: (usage, description).
pub fn help_lines() -> Vec<(&'static str, &'static str)> {
    vec![
        ("/new", "Start a new conversation"),
        ("/session", "Show the current session id and label"),
        ("/sessions", "List saved sessions"),
        ("/history", "Replay the current conversation"),
        ("/thinking", "Toggle showing the model's thinking"),
        ("/chat [label]", "Label following turns, or clear the label"),
        ("/set [key value]", "Show or change stored settings"),
        ("/help", "Show this help"),
        ("/quit", "Exit (Ctrl-D also works)"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_prompt() {
        assert_eq!(
            Command::parse("  why is the sky blue?  "),
            Command::Prompt("why is the sky blue?".into())
        );
    }

    #[test]
    fn simple_commands_and_aliases() {
        assert_eq!(Command::parse("/new"), Command::New);
        assert_eq!(Command::parse("/NEW"), Command::New);
        assert_eq!(Command::parse("/s"), Command::Session);
        assert_eq!(Command::parse("/sessions"), Command::Sessions);
        assert_eq!(Command::parse("/history"), Command::History);
        assert_eq!(Command::parse("/think"), Command::Thinking);
        assert_eq!(Command::parse("/?"), Command::Help);
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("/q"), Command::Quit);
    }

    #[test]
    fn chat_label_argument() {
        assert_eq!(
            Command::parse("/chat  project-x "),
            Command::ChatId(Some("project-x".into()))
        );
        assert_eq!(Command::parse("/chat"), Command::ChatId(None));
    }

    #[test]
    fn set_keeps_spaces_in_value() {
        assert_eq!(
            Command::parse("/set system_prompt Be brief and kind."),
            Command::Set {
                key: Some("system_prompt".into()),
                value: Some("Be brief and kind.".into()),
            }
        );
        assert_eq!(
            Command::parse("/set model"),
            Command::Set {
                key: Some("model".into()),
                value: None,
            }
        );
        assert_eq!(
            Command::parse("/set"),
            Command::Set {
                key: None,
                value: None,
            }
        );
    }

    #[test]
    fn unknown_command_keeps_input() {
        assert_eq!(
            Command::parse("/frobnicate now"),
            Command::Unknown("/frobnicate now".into())
        );
    }

    #[test]
    fn every_listed_command_parses() {
        for (cmd, _) in COMMANDS {
            assert!(
                !matches!(Command::parse(cmd), Command::Unknown(_)),
                "{} should be recognised",
                cmd
            );
        }
    }
}
