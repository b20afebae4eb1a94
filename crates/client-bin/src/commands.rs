//! Player commands typed on stdin.
use gameofthree_client::session::Mode;

pub const HELP: &str = "\
commands:
  start             request a new round
  mode auto|manual  switch how moves are produced
  number <n>        propose the opening number (manual mode)
  move <-1|0|1>     add to the current value (manual mode)
  help              show this text
  quit              disconnect and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    SetMode(Mode),
    /// Raw text; validated by the session
    Number(String),
    Move(i64),
    Help,
    Quit,
}

/// Parse one input line; `Ok(None)` for a blank line
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if words.next().is_some() {
        return Err(format!("too many arguments for `{verb}`"));
    }

    let command = match (verb.to_ascii_lowercase().as_str(), arg) {
        ("start", None) => Command::Start,
        ("help" | "?", None) => Command::Help,
        ("quit" | "exit" | "disconnect", None) => Command::Quit,
        ("mode", Some(mode)) => Command::SetMode(mode.parse()?),
        ("number", Some(n)) => Command::Number(n.to_string()),
        ("move", Some(a)) => Command::Move(
            a.parse()
                .map_err(|_| format!("`{a}` is not a whole number"))?,
        ),
        ("mode" | "number" | "move", None) => {
            return Err(format!("`{verb}` needs an argument, see `help`"));
        },
        (_, _) => return Err(format!("unknown command `{line}`, see `help`", line = line.trim())),
    };
    Ok(Some(command))
}
