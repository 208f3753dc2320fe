//! Operator commands typed into the input line.

use std::path::PathBuf;

use crate::model::LineId;

pub const HELP: &str = "refresh | upload <file> | line <1|2> | program <p> | part <n> | code <c> | desc <d> | comment <text> | submit | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quit,
    Refresh,
    Help,
    Upload(PathBuf),
    Line(Option<LineId>),
    /// Blank clears the program.
    Program(String),
    Part(String),
    Code(String),
    Description(String),
    Comment(String),
    Submit,
}

/// Parse one input line. Blank input yields `Ok(None)`.
pub fn parse(input: &str) -> Result<Option<Command>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match input.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (input, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => Command::Quit,
        "r" | "refresh" => Command::Refresh,
        "?" | "help" => Command::Help,
        "upload" => {
            if rest.is_empty() {
                return Err("upload needs a file path".to_string());
            }
            Command::Upload(PathBuf::from(rest))
        }
        "line" => match rest {
            "" | "none" => Command::Line(None),
            other => {
                let line = other
                    .parse::<u8>()
                    .ok()
                    .and_then(LineId::from_number)
                    .ok_or_else(|| format!("Unknown line '{}'", other))?;
                Command::Line(Some(line))
            }
        },
        "program" => Command::Program(rest.to_string()),
        "part" => Command::Part(rest.to_string()),
        "code" => Command::Code(rest.to_string()),
        "desc" | "description" => Command::Description(rest.to_string()),
        "comment" | "comments" => Command::Comment(rest.to_string()),
        "submit" => Command::Submit,
        other => return Err(format!("Unknown command '{}' ({})", other, HELP)),
    };
    Ok(Some(command))
}
