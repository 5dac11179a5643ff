//! Console control commands

/// Prefix marking a line as a control command instead of queries
pub const PREFIX: char = ':';

/// A control command typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Quit,
    ClearScreen,
    Help,
    Unknown(String),
}

impl ControlCommand {
    /// Parse a line; `None` when the line holds queries
    pub fn parse(line: &str) -> Option<Self> {
        let word = line.trim().strip_prefix(PREFIX)?;
        let command = match word.trim().to_lowercase().as_str() {
            "q" | "quit" => Self::Quit,
            "cls" | "clear" => Self::ClearScreen,
            "h" | "help" => Self::Help,
            _ => Self::Unknown(line.trim().to_string()),
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(ControlCommand::parse(":q"), Some(ControlCommand::Quit));
        assert_eq!(ControlCommand::parse("  :QUIT "), Some(ControlCommand::Quit));
        assert_eq!(ControlCommand::parse(":cls"), Some(ControlCommand::ClearScreen));
        assert_eq!(ControlCommand::parse(":clear"), Some(ControlCommand::ClearScreen));
        assert_eq!(ControlCommand::parse(":h"), Some(ControlCommand::Help));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            ControlCommand::parse(":drop"),
            Some(ControlCommand::Unknown(":drop".to_string()))
        );
    }

    #[test]
    fn test_queries_are_not_commands() {
        assert_eq!(ControlCommand::parse("g.V().count()"), None);
        assert_eq!(ControlCommand::parse(""), None);
    }
}
