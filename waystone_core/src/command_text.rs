//! Line grammar for driving a list view from a terminal.
//!
//! A trailing `!` on a verb stands in for holding shift: `next!` jumps to the
//! last page and `up! 2` moves the entry in slot 2 to the front.

use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    Search(String),
    Page(usize),
    Next { jump: bool },
    Prev { jump: bool },
    Up { slot: usize, jump: bool },
    Down { slot: usize, jump: bool },
    Select { slot: usize },
    Remove { slot: usize },
    /// `None` edits the origin waystone shown in the header.
    Edit { slot: Option<usize> },
    Show,
    Quit,
}

#[derive(Debug, Error)]
pub enum ViewCommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
}

pub fn parse_view_command(input: &str) -> Result<ViewCommand, ViewCommandParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ViewCommandParseError::Empty);
    }

    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (trimmed, ""),
    };
    let verb = verb.to_ascii_lowercase();
    let (verb, jump) = match verb.strip_suffix('!') {
        Some(stripped) => (stripped.to_string(), true),
        None => (verb, false),
    };
    let mut parts = rest.split_whitespace();

    match verb.as_str() {
        // Search text keeps its inner spacing.
        "search" | "find" => Ok(ViewCommand::Search(rest.to_string())),
        "page" => {
            let page_str = parts
                .next()
                .ok_or(ViewCommandParseError::MissingArgument("page"))?;
            Ok(ViewCommand::Page(parse_usize(page_str, "page number")?))
        }
        "next" | "n" => Ok(ViewCommand::Next { jump }),
        "prev" | "p" => Ok(ViewCommand::Prev { jump }),
        "up" => Ok(ViewCommand::Up {
            slot: parse_slot(parts.next(), "up slot")?,
            jump,
        }),
        "down" => Ok(ViewCommand::Down {
            slot: parse_slot(parts.next(), "down slot")?,
            jump,
        }),
        "select" | "go" => Ok(ViewCommand::Select {
            slot: parse_slot(parts.next(), "select slot")?,
        }),
        "remove" | "rm" => Ok(ViewCommand::Remove {
            slot: parse_slot(parts.next(), "remove slot")?,
        }),
        "edit" => {
            let slot = match parts.next() {
                Some(value) => Some(parse_usize(value, "edit slot")?),
                None => None,
            };
            Ok(ViewCommand::Edit { slot })
        }
        "show" | "ls" => Ok(ViewCommand::Show),
        "quit" | "exit" => Ok(ViewCommand::Quit),
        other => Err(ViewCommandParseError::UnknownCommand(other.to_string())),
    }
}

fn parse_slot(value: Option<&str>, context: &'static str) -> Result<usize, ViewCommandParseError> {
    let value = value.ok_or(ViewCommandParseError::MissingArgument("slot"))?;
    parse_usize(value, context)
}

fn parse_usize(value: &str, context: &'static str) -> Result<usize, ViewCommandParseError> {
    value
        .parse::<usize>()
        .map_err(|source| ViewCommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}
