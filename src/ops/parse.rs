//! Command line parsing
//!
//! Turns one line of text into an `Operation`.
//!
//! ## Tokens
//! Whitespace separates tokens. A double-quoted run is one token and may
//! contain `\"` and `\\`. A token of the form `#<n>` directly after a verb
//! selects connection `n`; without it the default connection is used.

use std::path::PathBuf;

use crate::connection::ConnectionId;
use crate::cursor::CursorId;
use crate::error::{KvError, Result};

use super::Operation;

/// Split a line into tokens
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut token = String::new();
        if c == '"' {
            chars.next();
            let mut terminated = false;
            while let Some(c) = chars.next() {
                match c {
                    '"' => {
                        terminated = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some(escaped @ ('"' | '\\')) => token.push(escaped),
                        Some(other) => {
                            token.push('\\');
                            token.push(other);
                        }
                        None => break,
                    },
                    other => token.push(other),
                }
            }
            if !terminated {
                return Err(KvError::Parse("Unterminated quoted string".to_string()));
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }

    Ok(tokens)
}

impl Operation {
    /// Parse one command line
    pub fn parse(line: &str) -> Result<Self> {
        let tokens = tokenize(line)?;
        let (verb, rest) = tokens
            .split_first()
            .ok_or_else(|| KvError::Parse("Empty command".to_string()))?;
        let verb = verb.to_ascii_lowercase();

        let operation = match verb.as_str() {
            "open" => match rest {
                [path] => Operation::Open {
                    path: PathBuf::from(path),
                    env_dir: None,
                },
                [path, env_dir] => Operation::Open {
                    path: PathBuf::from(path),
                    env_dir: Some(PathBuf::from(env_dir)),
                },
                _ => return Err(usage(&verb, "<path> [env-dir]")),
            },
            "list" => {
                if !rest.is_empty() {
                    return Err(usage(&verb, ""));
                }
                Operation::List
            }
            "cursor_close" | "cursor_next" | "cursor_prev" => {
                let cursor = match rest {
                    [cursor] => cursor_id(cursor)?,
                    _ => return Err(usage(&verb, "<cursor>")),
                };
                match verb.as_str() {
                    "cursor_close" => Operation::CursorClose { cursor },
                    "cursor_next" => Operation::CursorNext { cursor },
                    _ => Operation::CursorPrev { cursor },
                }
            }
            "cursor_get" => match rest {
                [cursor] => Operation::CursorGet {
                    cursor: cursor_id(cursor)?,
                    with_value: true,
                },
                [cursor, flag] if flag == "--key-only" => Operation::CursorGet {
                    cursor: cursor_id(cursor)?,
                    with_value: false,
                },
                _ => return Err(usage(&verb, "<cursor> [--key-only]")),
            },
            _ => {
                let (id, args) = split_connection_id(rest)?;
                parse_connection_operation(&verb, id, args)?
            }
        };

        Ok(operation)
    }
}

/// Verbs that act on a connection and accept an optional `#<n>`
fn parse_connection_operation(
    verb: &str,
    id: Option<ConnectionId>,
    args: &[String],
) -> Result<Operation> {
    let operation = match (verb, args) {
        ("close", []) => Operation::Close { id },
        ("get", [key]) => Operation::Get {
            id,
            key: key.clone(),
        },
        ("put", [key, value]) => Operation::Put {
            id,
            key: key.clone(),
            value: value.clone(),
        },
        ("delete" | "del", [key]) => Operation::Delete {
            id,
            key: key.clone(),
        },
        ("exists", [key]) => Operation::Exists {
            id,
            key: key.clone(),
        },
        ("stat", []) => Operation::Stat { id },
        ("keys", []) => Operation::Keys { id },
        ("values", []) => Operation::Values { id },
        ("compact", []) => Operation::Compact { id },
        ("sync", []) => Operation::Sync { id },
        ("cursor_open", []) => Operation::CursorOpen { id },

        ("close" | "stat" | "keys" | "values" | "compact" | "sync" | "cursor_open", _) => {
            return Err(usage(verb, "[#id]"))
        }
        ("get" | "delete" | "del" | "exists", _) => return Err(usage(verb, "[#id] <key>")),
        ("put", _) => return Err(usage(verb, "[#id] <key> <value>")),
        _ => return Err(KvError::Parse(format!("Unknown command: {}", verb))),
    };
    Ok(operation)
}

fn split_connection_id(args: &[String]) -> Result<(Option<ConnectionId>, &[String])> {
    match args.split_first() {
        Some((first, rest)) if first.starts_with('#') => {
            let id = first[1..]
                .parse::<ConnectionId>()
                .map_err(|_| KvError::Parse(format!("Invalid connection id: {}", first)))?;
            Ok((Some(id), rest))
        }
        _ => Ok((None, args)),
    }
}

fn cursor_id(token: &str) -> Result<CursorId> {
    token
        .strip_prefix('#')
        .unwrap_or(token)
        .parse::<CursorId>()
        .map_err(|_| KvError::Parse(format!("Invalid cursor id: {}", token)))
}

fn usage(verb: &str, args: &str) -> KvError {
    KvError::Parse(format!("Usage: {} {}", verb, args).trim_end().to_string())
}
