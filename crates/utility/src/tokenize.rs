use std::collections::BTreeMap;

/// A parsed `[timestamp] command -k v -k v ...` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub timestamp: i64,
    pub command: String,
    pub params: BTreeMap<char, String>,
}

/// Splits a line of the form `[12] add_user -c root -u alice ...` into a
/// timestamp, a command name, and a `-flag value` parameter map.
///
/// Returns `None` for any line that doesn't even look like this shape
/// (callers are responsible for verb-specific required-parameter checks).
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    let line = line.trim_end();
    if !line.starts_with('[') {
        return None;
    }
    let close = line.find(']')?;
    let timestamp: i64 = line[1..close].parse().ok()?;

    let rest = line.get(close + 1..)?.trim_start();
    if rest.is_empty() {
        return None;
    }

    let mut tokens = rest.split_whitespace();
    let command = tokens.next()?.to_owned();

    let mut params = BTreeMap::new();
    let remaining: Vec<&str> = tokens.collect();
    let mut i = 0;
    while i < remaining.len() {
        let flag = remaining[i];
        if !flag.starts_with('-') || flag.len() < 2 {
            return None;
        }
        let key = flag[1..].chars().next()?;
        let value = if i + 1 < remaining.len() && !remaining[i + 1].starts_with('-') {
            i += 1;
            remaining[i].to_owned()
        } else {
            String::new()
        };
        params.insert(key, value);
        i += 1;
    }

    Some(ParsedLine {
        timestamp,
        command,
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_login() {
        let parsed = parse_line("[1] login -u alice -p secret").unwrap();
        assert_eq!(parsed.timestamp, 1);
        assert_eq!(parsed.command, "login");
        assert_eq!(parsed.params.get(&'u').unwrap(), "alice");
        assert_eq!(parsed.params.get(&'p').unwrap(), "secret");
    }

    #[test]
    fn parses_command_with_no_params() {
        let parsed = parse_line("[42] clean").unwrap();
        assert_eq!(parsed.timestamp, 42);
        assert_eq!(parsed.command, "clean");
        assert!(parsed.params.is_empty());
    }

    #[test]
    fn rejects_missing_timestamp() {
        assert!(parse_line("login -u alice -p secret").is_none());
    }

    #[test]
    fn rejects_malformed_flag() {
        assert!(parse_line("[1] login u alice").is_none());
    }
}
