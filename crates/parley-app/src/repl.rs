//! Parsing of terminal input lines into REPL commands.
//!
//! Anything that does not start with `/` is chat input and goes to the
//! dialogue router untouched.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Free text for the router (phone, OTP, name or a query).
    Input(String),
    /// Press the Nth button (1-based) of the latest bot message.
    Press(usize),
    /// Show autocomplete suggestions for a partial query.
    Suggest(String),
    Clear,
    Theme,
    Help,
    Quit,
    /// A `/command` that could not be parsed; carries the reason.
    Invalid(String),
}

pub const HELP: &str = "\
Commands:
  /press N       press button N of the latest reply
  /suggest TEXT  show suggestions for a partial query
  /clear         clear the conversation
  /theme         toggle light/dark theme
  /help          show this help
  /quit          exit
Type `logout` once signed in to end the session.";

pub fn parse(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Input(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name.to_ascii_lowercase().as_str() {
        "press" | "p" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => Command::Press(n),
            _ => Command::Invalid(format!("expected a button number, got '{}'", arg)),
        },
        "suggest" | "s" => Command::Suggest(arg.to_string()),
        "clear" => Command::Clear,
        "theme" => Command::Theme,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => Command::Invalid(format!("unknown command '/{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_input() {
        assert_eq!(parse("9876543210"), Command::Input("9876543210".to_string()));
        assert_eq!(
            parse("what are the hostel fees"),
            Command::Input("what are the hostel fees".to_string())
        );
        assert_eq!(parse("logout"), Command::Input("logout".to_string()));
    }

    #[test]
    fn test_press() {
        assert_eq!(parse("/press 2"), Command::Press(2));
        assert_eq!(parse("  /p 1  "), Command::Press(1));
        assert!(matches!(parse("/press 0"), Command::Invalid(_)));
        assert!(matches!(parse("/press two"), Command::Invalid(_)));
        assert!(matches!(parse("/press"), Command::Invalid(_)));
    }

    #[test]
    fn test_suggest_keeps_argument() {
        assert_eq!(parse("/suggest admi"), Command::Suggest("admi".to_string()));
        assert_eq!(
            parse("/s hostel  fee"),
            Command::Suggest("hostel  fee".to_string())
        );
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("/clear"), Command::Clear);
        assert_eq!(parse("/THEME"), Command::Theme);
        assert_eq!(parse("/help"), Command::Help);
        assert_eq!(parse("/quit"), Command::Quit);
        assert_eq!(parse("/exit"), Command::Quit);
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse("/dance"),
            Command::Invalid("unknown command '/dance'".to_string())
        );
    }
}
