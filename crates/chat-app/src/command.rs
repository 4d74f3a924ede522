/// One line typed into the terminal front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    NewChat,
    SelectFile(Option<String>),
    ChangePage(String),
    ClearContext,
    History,
    Quit,
}

impl Command {
    /// Slash commands are matched by name; everything else is a chat message.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let (name, argument) = match trimmed.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (trimmed, ""),
        };

        match name {
            "/new" => Self::NewChat,
            "/file" if argument.is_empty() => Self::SelectFile(None),
            "/file" => Self::SelectFile(Some(argument.to_string())),
            "/page" => Self::ChangePage(argument.to_string()),
            "/clear-context" => Self::ClearContext,
            "/history" => Self::History,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Send(line.to_string()),
        }
    }
}
