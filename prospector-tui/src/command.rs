#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Location(Option<bool>), // /location on|off | /location
    Help,                   // /help
    Quit,                   // /quit or /exit
    Unknown(String),
}

pub fn parse_command(input: &str) -> Command {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Command::Unknown(trimmed.to_string());
    }
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();
    let rest = parts.next().map(str::trim).filter(|s| !s.is_empty());

    match verb {
        "/location" | "/loc" => match rest.map(str::to_ascii_lowercase).as_deref() {
            None => Command::Location(None),
            Some("on" | "yes" | "true") => Command::Location(Some(true)),
            Some("off" | "no" | "false") => Command::Location(Some(false)),
            Some(_) => Command::Unknown(trimmed.to_string()),
        },
        "/help" | "/?" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}
