//! Command parsing from a decoded argument vector.
//!
//! Converts the raw `Vec<Bytes>` produced by the request codec into a
//! typed [`Command`]. Arity and numeric validation happen here, so the
//! executor only ever sees well-formed commands; type mismatches against
//! the live keyspace are the executor's problem.

use bytes::Bytes;
use thiserror::Error;

/// Error code for a wrong-arity or unparsable argument.
pub const ERR_ARG: i32 = -1;
/// Error code for a command name outside the supported set.
pub const ERR_UNKNOWN: i32 = -2;
/// Error code for a command applied to a key of the wrong type.
pub const ERR_TYPE: i32 = -3;

/// A command rejected during parsing, carrying the wire error code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CommandError {
    /// One of [`ERR_ARG`], [`ERR_UNKNOWN`].
    pub code: i32,
    pub message: String,
}

impl CommandError {
    fn arg(message: &str) -> Self {
        Self {
            code: ERR_ARG,
            message: message.into(),
        }
    }
}

/// A parsed client command, ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// GET <key>. Returns the string value or nil.
    Get { key: Bytes },
    /// SET <key> <value>. Creates or replaces the key.
    Set { key: Bytes, value: Bytes },
    /// DEL <key>. Returns 1 if the key existed.
    Del { key: Bytes },
    /// EXISTS <key>. Returns 0 or 1.
    Exists { key: Bytes },
    /// FLUSHALL. Empties the keyspace.
    FlushAll,
    /// ZADD <key> <score> <member>. Returns 1 if added, 0 if updated.
    ZAdd {
        key: Bytes,
        score: f64,
        member: Bytes,
    },
    /// ZREM <key> <member>. Returns 1 if removed.
    ZRem { key: Bytes, member: Bytes },
    /// PEXPIRE <key> <ttl-ms>. Returns 1 if applied, 0 if key missing.
    PExpire { key: Bytes, ttl_ms: i64 },
    /// PTTL <key>. Returns remaining ms, -1 without TTL, -2 if missing.
    PTtl { key: Bytes },
}

impl Command {
    /// Parses an argument vector into a command.
    ///
    /// The command name is matched case-insensitively. Arity violations
    /// and bad numeric arguments come back as `ERR_ARG`; a name outside
    /// the command set comes back as `ERR_UNKNOWN`.
    pub fn parse(args: &[Bytes]) -> Result<Command, CommandError> {
        let Some(name) = args.first() else {
            return Err(CommandError::arg("empty command"));
        };

        match name.to_ascii_lowercase().as_slice() {
            b"get" => {
                let [_, key] = args else {
                    return Err(CommandError::arg("GET requires one key"));
                };
                Ok(Command::Get { key: key.clone() })
            }
            b"set" => {
                let [_, key, value] = args else {
                    return Err(CommandError::arg("SET requires key and value"));
                };
                Ok(Command::Set {
                    key: key.clone(),
                    value: value.clone(),
                })
            }
            b"del" => {
                let [_, key] = args else {
                    return Err(CommandError::arg("DEL requires key"));
                };
                Ok(Command::Del { key: key.clone() })
            }
            b"exists" => {
                let [_, key] = args else {
                    return Err(CommandError::arg("EXISTS requires key"));
                };
                Ok(Command::Exists { key: key.clone() })
            }
            b"flushall" => {
                if args.len() != 1 {
                    return Err(CommandError::arg("FLUSHALL takes no arguments"));
                }
                Ok(Command::FlushAll)
            }
            b"zadd" => {
                let [_, key, score, member] = args else {
                    return Err(CommandError::arg("ZADD requires key, score, and member"));
                };
                let score = parse_score(score)
                    .ok_or_else(|| CommandError::arg("Invalid score value"))?;
                Ok(Command::ZAdd {
                    key: key.clone(),
                    score,
                    member: member.clone(),
                })
            }
            b"zrem" => {
                let [_, key, member] = args else {
                    return Err(CommandError::arg("ZREM requires key and member"));
                };
                Ok(Command::ZRem {
                    key: key.clone(),
                    member: member.clone(),
                })
            }
            b"pexpire" => {
                let [_, key, ttl] = args else {
                    return Err(CommandError::arg("PEXPIRE requires key and TTL"));
                };
                let ttl_ms = parse_int(ttl)
                    .filter(|&ms| ms >= 0)
                    .ok_or_else(|| CommandError::arg("Invalid TTL value"))?;
                Ok(Command::PExpire {
                    key: key.clone(),
                    ttl_ms,
                })
            }
            b"pttl" => {
                let [_, key] = args else {
                    return Err(CommandError::arg("PTTL requires key"));
                };
                Ok(Command::PTtl { key: key.clone() })
            }
            _ => Err(CommandError {
                code: ERR_UNKNOWN,
                message: "unknown command".into(),
            }),
        }
    }
}

/// Parses a score argument as a finite double.
///
/// The full argument must be consumed: "1.2x" is rejected, as are NaN
/// and the infinities.
fn parse_score(arg: &Bytes) -> Option<f64> {
    let s = std::str::from_utf8(arg).ok()?;
    let value: f64 = s.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parses an integer argument, requiring full consumption.
fn parse_int(arg: &Bytes) -> Option<i64> {
    std::str::from_utf8(arg).ok()?.parse().ok()
}
