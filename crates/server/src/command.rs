//! Parses a `[<ts>] <verb> -<opt> <value> ...` line into a typed
//! [`ParsedCommand`] (§6.2). Tokenizing is `utility::tokenize::parse_line`'s
//! job; this module only turns its `(timestamp, command, params)` triple
//! into a [`Verb`], the same two-stage split `commandParser.hpp`'s
//! `parse`-then-`validateParameters` makes.

use std::collections::BTreeMap;

use thiserror::Error;
use utility::tokenize::parse_line;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line does not match [<ts>] <verb> ...")]
    MalformedLine,
    #[error("unknown command {0:?}")]
    UnknownVerb(String),
    #[error("missing required option -{0}")]
    MissingOption(char),
    #[error("invalid value for -{0}: {1:?}")]
    InvalidValue(char, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub timestamp: i64,
    pub verb: Verb,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verb {
    AddUser {
        cur: String,
        username: String,
        password: String,
        name: String,
        mail: String,
        privilege: u8,
    },
    Login {
        username: String,
        password: String,
    },
    Logout {
        username: String,
    },
    QueryProfile {
        cur: String,
        username: String,
    },
    ModifyProfile {
        cur: String,
        username: String,
        password: Option<String>,
        name: Option<String>,
        mail: Option<String>,
        privilege: Option<u8>,
    },
    AddTrain {
        train_id: String,
        station_num: u16,
        seat_num: u32,
        stations: Vec<String>,
        prices: Vec<i64>,
        start_time: String,
        travel_times: Vec<i64>,
        stopover_times: Vec<i64>,
        sale_start: String,
        sale_end: String,
        train_type: u8,
    },
    DeleteTrain {
        train_id: String,
    },
    ReleaseTrain {
        train_id: String,
    },
    QueryTrain {
        train_id: String,
        date: String,
    },
    QueryTicket {
        from: String,
        to: String,
        date: String,
        sort_by: String,
    },
    QueryTransfer {
        from: String,
        to: String,
        date: String,
        sort_by: String,
    },
    BuyTicket {
        username: String,
        train_id: String,
        date: String,
        num: u32,
        from: String,
        to: String,
        queue_if_full: bool,
    },
    QueryOrder {
        username: String,
    },
    RefundTicket {
        username: String,
        order_index: usize,
    },
    Clean,
    Exit,
}

fn required<'a>(opts: &'a BTreeMap<char, String>, key: char) -> Result<&'a str, ParseError> {
    opts.get(&key)
        .map(String::as_str)
        .ok_or(ParseError::MissingOption(key))
}

fn parse_u8(opts: &BTreeMap<char, String>, key: char) -> Result<u8, ParseError> {
    required(opts, key)?
        .parse()
        .map_err(|_| ParseError::InvalidValue(key, opts[&key].clone()))
}

/// §3 "User | ... privilege ∈ [0,10]": `commandParser.hpp`'s
/// `validateAddUser`/`validateModifyProfile` reject any `-g` outside this
/// range before the command ever reaches `UserService`, so this parser does
/// the same instead of letting an out-of-range privilege get persisted.
fn parse_privilege(opts: &BTreeMap<char, String>, key: char) -> Result<u8, ParseError> {
    let value = parse_u8(opts, key)?;
    if value > 10 {
        return Err(ParseError::InvalidValue(key, opts[&key].clone()));
    }
    Ok(value)
}

fn parse_optional_privilege(
    opts: &BTreeMap<char, String>,
    key: char,
) -> Result<Option<u8>, ParseError> {
    let Some(raw) = opts.get(&key) else {
        return Ok(None);
    };
    let value: u8 = raw
        .parse()
        .map_err(|_| ParseError::InvalidValue(key, raw.clone()))?;
    if value > 10 {
        return Err(ParseError::InvalidValue(key, raw.clone()));
    }
    Ok(Some(value))
}

fn parse_u16(opts: &BTreeMap<char, String>, key: char) -> Result<u16, ParseError> {
    required(opts, key)?
        .parse()
        .map_err(|_| ParseError::InvalidValue(key, opts[&key].clone()))
}

fn parse_u32(opts: &BTreeMap<char, String>, key: char) -> Result<u32, ParseError> {
    required(opts, key)?
        .parse()
        .map_err(|_| ParseError::InvalidValue(key, opts[&key].clone()))
}

fn parse_pipe_list(s: &str) -> Vec<String> {
    s.split('|').map(str::to_string).collect()
}

fn parse_pipe_i64(opts: &BTreeMap<char, String>, key: char) -> Result<Vec<i64>, ParseError> {
    required(opts, key)?
        .split('|')
        .map(|v| v.parse().map_err(|_| ParseError::InvalidValue(key, v.to_string())))
        .collect()
}

pub fn parse(line: &str) -> Result<ParsedCommand, ParseError> {
    let parsed = parse_line(line.trim_start()).ok_or(ParseError::MalformedLine)?;
    let timestamp = parsed.timestamp;
    let opts = parsed.params;

    let verb = match parsed.command.as_str() {
        "add_user" => Verb::AddUser {
            cur: required(&opts, 'c')?.to_string(),
            username: required(&opts, 'u')?.to_string(),
            password: required(&opts, 'p')?.to_string(),
            name: required(&opts, 'n')?.to_string(),
            mail: required(&opts, 'm')?.to_string(),
            privilege: parse_privilege(&opts, 'g')?,
        },
        "login" => Verb::Login {
            username: required(&opts, 'u')?.to_string(),
            password: required(&opts, 'p')?.to_string(),
        },
        "logout" => Verb::Logout {
            username: required(&opts, 'u')?.to_string(),
        },
        "query_profile" => Verb::QueryProfile {
            cur: required(&opts, 'c')?.to_string(),
            username: required(&opts, 'u')?.to_string(),
        },
        "modify_profile" => Verb::ModifyProfile {
            cur: required(&opts, 'c')?.to_string(),
            username: required(&opts, 'u')?.to_string(),
            password: opts.get(&'p').cloned(),
            name: opts.get(&'n').cloned(),
            mail: opts.get(&'m').cloned(),
            privilege: parse_optional_privilege(&opts, 'g')?,
        },
        "add_train" => Verb::AddTrain {
            train_id: required(&opts, 'i')?.to_string(),
            station_num: parse_u16(&opts, 'n')?,
            seat_num: parse_u32(&opts, 'm')?,
            stations: parse_pipe_list(required(&opts, 's')?),
            prices: parse_pipe_i64(&opts, 'p')?,
            start_time: required(&opts, 'x')?.to_string(),
            travel_times: parse_pipe_i64(&opts, 't')?,
            stopover_times: {
                let raw = required(&opts, 'o')?;
                if raw == "_" {
                    Vec::new()
                } else {
                    parse_pipe_i64(&opts, 'o')?
                }
            },
            sale_start: {
                let raw = required(&opts, 'd')?;
                raw.split_once('|')
                    .ok_or_else(|| ParseError::InvalidValue('d', raw.to_string()))?
                    .0
                    .to_string()
            },
            sale_end: {
                let raw = required(&opts, 'd')?;
                raw.split_once('|')
                    .ok_or_else(|| ParseError::InvalidValue('d', raw.to_string()))?
                    .1
                    .to_string()
            },
            train_type: {
                let raw = required(&opts, 'y')?;
                if raw.len() != 1 {
                    return Err(ParseError::InvalidValue('y', raw.to_string()));
                }
                raw.as_bytes()[0]
            },
        },
        "delete_train" => Verb::DeleteTrain {
            train_id: required(&opts, 'i')?.to_string(),
        },
        "release_train" => Verb::ReleaseTrain {
            train_id: required(&opts, 'i')?.to_string(),
        },
        "query_train" => Verb::QueryTrain {
            train_id: required(&opts, 'i')?.to_string(),
            date: required(&opts, 'd')?.to_string(),
        },
        "query_ticket" => Verb::QueryTicket {
            from: required(&opts, 's')?.to_string(),
            to: required(&opts, 't')?.to_string(),
            date: required(&opts, 'd')?.to_string(),
            sort_by: opts.get(&'p').cloned().unwrap_or_else(|| "time".to_string()),
        },
        "query_transfer" => Verb::QueryTransfer {
            from: required(&opts, 's')?.to_string(),
            to: required(&opts, 't')?.to_string(),
            date: required(&opts, 'd')?.to_string(),
            sort_by: opts.get(&'p').cloned().unwrap_or_else(|| "time".to_string()),
        },
        "buy_ticket" => Verb::BuyTicket {
            username: required(&opts, 'u')?.to_string(),
            train_id: required(&opts, 'i')?.to_string(),
            date: required(&opts, 'd')?.to_string(),
            num: parse_u32(&opts, 'n')?,
            from: required(&opts, 'f')?.to_string(),
            to: required(&opts, 't')?.to_string(),
            queue_if_full: match opts.get(&'q').map(String::as_str).unwrap_or("false") {
                "true" => true,
                "false" => false,
                other => return Err(ParseError::InvalidValue('q', other.to_string())),
            },
        },
        "query_order" => Verb::QueryOrder {
            username: required(&opts, 'u')?.to_string(),
        },
        "refund_ticket" => Verb::RefundTicket {
            username: required(&opts, 'u')?.to_string(),
            order_index: opts
                .get(&'n')
                .map(|v| v.parse())
                .transpose()
                .map_err(|_| ParseError::InvalidValue('n', opts[&'n'].clone()))?
                .unwrap_or(1),
        },
        "clean" => Verb::Clean,
        "exit" => Verb::Exit,
        other => return Err(ParseError::UnknownVerb(other.to_string())),
    };

    Ok(ParsedCommand { timestamp, verb })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_user() {
        let p = parse("[1] add_user -c anybody -u root -p r00t -n Ro -m r@x -g 3").unwrap();
        assert_eq!(p.timestamp, 1);
        assert_eq!(
            p.verb,
            Verb::AddUser {
                cur: "anybody".into(),
                username: "root".into(),
                password: "r00t".into(),
                name: "Ro".into(),
                mail: "r@x".into(),
                privilege: 3,
            }
        );
    }

    #[test]
    fn parses_buy_ticket_with_queue_flag() {
        let p = parse("[7] buy_ticket -u alice -i K -d 06-01 -n 5 -f s1 -t s3 -q false").unwrap();
        assert_eq!(
            p.verb,
            Verb::BuyTicket {
                username: "alice".into(),
                train_id: "K".into(),
                date: "06-01".into(),
                num: 5,
                from: "s1".into(),
                to: "s3".into(),
                queue_if_full: false,
            }
        );
    }

    #[test]
    fn rejects_missing_timestamp() {
        assert_eq!(parse("add_user -c a"), Err(ParseError::MalformedLine));
    }

    #[test]
    fn rejects_unknown_verb() {
        assert!(matches!(parse("[1] fly_away"), Err(ParseError::UnknownVerb(_))));
    }

    #[test]
    fn refund_ticket_defaults_order_index_to_one() {
        let p = parse("[3] refund_ticket -u alice").unwrap();
        assert_eq!(
            p.verb,
            Verb::RefundTicket {
                username: "alice".into(),
                order_index: 1,
            }
        );
    }
}
