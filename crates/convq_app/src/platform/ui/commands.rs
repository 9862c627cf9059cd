//! Line commands typed at the console.

use std::path::PathBuf;

use convq_core::{JobId, Selection};
use thiserror::Error;

use super::editor::EditOverrides;

pub const HELP: &str = "\
Commands:
  add <src> [<dst>] [format=FMT]   queue a file
  start                            run the queue
  stop                             abort the running job and halt
  remove <ids>                     remove jobs (ids: 1 2 5-7 or 1,2)
  remove-completed                 remove finished jobs
  clear                            remove every job that is not running
  retry <ids>                      queue finished or failed jobs again
  retry-all                        queue every finished or failed job again
  edit <ids> [format=FMT] [dest-dir=DIR] [opt=ARG]...
                                   change job parameters
  list                             show all jobs
  help                             show this text
  quit                             stop and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add {
        source: PathBuf,
        destination: Option<PathBuf>,
        format: Option<String>,
    },
    Start,
    Stop,
    Remove(Selection),
    RemoveCompleted,
    Clear,
    Retry(Selection),
    RetryAll,
    Edit {
        targets: Selection,
        overrides: EditOverrides,
    },
    List,
    Help,
    Quit,
}

/// Upper bound on the ids one command may name, ranges included.
pub const MAX_SELECTED_IDS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}', try 'help'")]
    UnknownCommand(String),
    #[error("missing {0}")]
    MissingArgument(&'static str),
    #[error("'{0}' is not a job id or range")]
    BadId(String),
    #[error("too many ids at '{0}' (at most {max})", max = MAX_SELECTED_IDS)]
    TooManyIds(String),
    #[error("unknown setting '{0}'")]
    UnknownKey(String),
    #[error("unexpected argument '{0}'")]
    Unexpected(String),
}

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let words = split_words(line);
    let (head, rest) = words.split_first().ok_or(ParseError::Empty)?;
    match head.to_ascii_lowercase().as_str() {
        "add" => parse_add(rest),
        "start" => no_arguments(rest, Command::Start),
        "stop" => no_arguments(rest, Command::Stop),
        "remove" | "rm" => Ok(Command::Remove(parse_ids(rest)?)),
        "remove-completed" => no_arguments(rest, Command::RemoveCompleted),
        "clear" => no_arguments(rest, Command::Clear),
        "retry" => Ok(Command::Retry(parse_ids(rest)?)),
        "retry-all" => no_arguments(rest, Command::RetryAll),
        "edit" => parse_edit(rest),
        "list" | "ls" => no_arguments(rest, Command::List),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ParseError::UnknownCommand(other.to_string())),
    }
}

fn no_arguments(rest: &[String], command: Command) -> Result<Command, ParseError> {
    match rest.first() {
        Some(word) => Err(ParseError::Unexpected(word.clone())),
        None => Ok(command),
    }
}

fn parse_add(rest: &[String]) -> Result<Command, ParseError> {
    let mut paths = Vec::new();
    let mut format = None;
    for word in rest {
        match word.split_once('=') {
            Some(("format", value)) => format = Some(value.to_string()),
            Some((key, _)) if !key.contains(['/', '\\', '.']) => {
                return Err(ParseError::UnknownKey(key.to_string()))
            }
            _ => paths.push(PathBuf::from(word)),
        }
    }
    let mut paths = paths.into_iter();
    let source = paths.next().ok_or(ParseError::MissingArgument("source file"))?;
    let destination = paths.next();
    if let Some(extra) = paths.next() {
        return Err(ParseError::Unexpected(extra.display().to_string()));
    }
    Ok(Command::Add {
        source,
        destination,
        format,
    })
}

fn parse_edit(rest: &[String]) -> Result<Command, ParseError> {
    let split = rest
        .iter()
        .position(|word| word.contains('='))
        .unwrap_or(rest.len());
    let (ids, settings) = rest.split_at(split);
    let targets = parse_ids(ids)?;

    let mut overrides = EditOverrides::default();
    for word in settings {
        let (key, value) = word
            .split_once('=')
            .ok_or_else(|| ParseError::Unexpected(word.clone()))?;
        match key {
            "format" => overrides.format = Some(value.to_string()),
            "dest-dir" => overrides.dest_dir = Some(PathBuf::from(value)),
            "opt" => {
                let options = overrides.options.get_or_insert_with(Vec::new);
                if !value.is_empty() {
                    options.push(value.to_string());
                }
            }
            other => return Err(ParseError::UnknownKey(other.to_string())),
        }
    }
    Ok(Command::Edit { targets, overrides })
}

/// Accepts `3`, `1,2`, `5-7` and any mix separated by spaces or commas.
fn parse_ids(words: &[String]) -> Result<Selection, ParseError> {
    let mut ids: Vec<JobId> = Vec::new();
    for part in words
        .iter()
        .flat_map(|word| word.split(','))
        .filter(|part| !part.is_empty())
    {
        let bad = || ParseError::BadId(part.to_string());
        match part.split_once('-') {
            Some((low, high)) => {
                let low: JobId = low.parse().map_err(|_| bad())?;
                let high: JobId = high.parse().map_err(|_| bad())?;
                if low > high {
                    return Err(bad());
                }
                if high - low >= MAX_SELECTED_IDS - ids.len() as u64 {
                    return Err(ParseError::TooManyIds(part.to_string()));
                }
                ids.extend(low..=high);
            }
            None => {
                if ids.len() as u64 >= MAX_SELECTED_IDS {
                    return Err(ParseError::TooManyIds(part.to_string()));
                }
                ids.push(part.parse().map_err(|_| bad())?);
            }
        }
    }
    if ids.is_empty() {
        return Err(ParseError::MissingArgument("job ids"));
    }
    Ok(Selection::new(ids))
}

/// Whitespace separated words; double quotes group a word with spaces.
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut started = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                started = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    words.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }
    if started {
        words.push(current);
    }
    words
}
