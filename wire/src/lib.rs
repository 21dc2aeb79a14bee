//! IRC wire protocol message parsing and generation. Incomplete by design; only the
//! subset that the cogbot core dispatcher needs is implemented.

/// A parsed IRC line.
///
/// Mirrors the regex `^(?::(\S+) )?(\S+)(?: (?!:)(.+?))?(?: :(.*))?$`: an optional
/// `:prefix`, a command/numeric token, an optional middle section, and an optional
/// trailing parameter introduced by `:`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedMessage {
    /// The raw prefix, without the leading `:`. Empty when the line had none.
    pub prefix: String,
    /// The command or three-digit numeric reply, verbatim.
    pub command: String,
    /// The first whitespace-separated token of the middle section, or (when there
    /// was no middle section) the trailing parameter if it starts with `#`.
    pub target: String,
    /// The nick portion of `prefix`, i.e. everything before the first `!`.
    pub author_nick: String,
    /// The trailing parameter (after the final ` :`), or the middle section's
    /// remainder when there was no `:`-introduced trailing part.
    pub trailing: String,
}

/// Parse one CRLF-stripped IRC line.
///
/// Lines that don't match the expected shape still produce a record: `command`,
/// `target`, and `author_nick` are empty, and `trailing` holds the raw line. Raw
/// handlers still see such lines; nothing else does.
pub fn parse_line(line: &str) -> ParsedMessage {
    let mut rest = line;

    let prefix = if let Some(stripped) = rest.strip_prefix(':') {
        match stripped.find(' ') {
            Some(idx) => {
                let (pfx, after) = stripped.split_at(idx);
                rest = &after[1..];
                pfx
            }
            None => {
                // No command follows a lone prefix: unparsable.
                return ParsedMessage {
                    trailing: line.to_owned(),
                    ..Default::default()
                };
            }
        }
    } else {
        ""
    };

    let (command, middle_and_trailing) = match rest.find(' ') {
        Some(idx) => {
            let (cmd, after) = rest.split_at(idx);
            (cmd, Some(&after[1..]))
        }
        None => (rest, None),
    };

    if command.is_empty() {
        return ParsedMessage {
            trailing: line.to_owned(),
            ..Default::default()
        };
    }

    let (middle, trailing) = match middle_and_trailing {
        None => (None, None),
        Some(s) => {
            if let Some(stripped) = s.strip_prefix(':') {
                (None, Some(stripped))
            } else {
                match s.find(" :") {
                    Some(idx) => (Some(&s[..idx]), Some(&s[idx + 2..])),
                    None => (Some(s), None),
                }
            }
        }
    };

    let author_nick = match prefix.find('!') {
        Some(idx) => &prefix[..idx],
        None => prefix,
    };

    let target = match middle {
        Some(m) => m.split_whitespace().next().unwrap_or(""),
        None => match trailing {
            Some(t) if t.starts_with('#') => t,
            _ => "",
        },
    };

    ParsedMessage {
        prefix: prefix.to_owned(),
        command: command.to_owned(),
        target: target.to_owned(),
        author_nick: author_nick.to_owned(),
        trailing: trailing.unwrap_or("").to_owned(),
    }
}

/// Nicks may carry a channel membership prefix (op, voice, ...). Returns the nick
/// with any such prefix stripped.
pub fn drop_nick_prefix(nick: &str) -> &str {
    const PREFIXES: [char; 5] = ['~', '&', '@', '%', '+'];
    match nick.chars().next() {
        Some(c) if PREFIXES.contains(&c) => &nick[c.len_utf8()..],
        _ => nick,
    }
}

//
// Message generators. Each returns a complete line *without* the trailing CRLF;
// `Connection::send_raw` appends it.
//

pub fn pass(password: &str) -> String {
    format!("PASS {}", password)
}

pub fn user(username: &str, realname: &str) -> String {
    format!("USER {} 0 * :{}", username, realname)
}

pub fn nick(nick: &str) -> String {
    format!("NICK {}", nick)
}

pub fn ping(token: &str) -> String {
    format!("PING {}", token)
}

pub fn pong(token: &str) -> String {
    format!("PONG :{}", token)
}

pub fn join(chan: &str, key: Option<&str>) -> String {
    match key {
        Some(key) => format!("JOIN {} {}", chan, key),
        None => format!("JOIN {}", chan),
    }
}

pub fn privmsg(target: &str, msg: &str) -> String {
    format!("PRIVMSG {} :{}", target, msg)
}

pub fn quit(reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!("QUIT :{}", reason),
        None => "QUIT".to_owned(),
    }
}

pub fn kick(chan: &str, nick: &str, reason: &str) -> String {
    format!("KICK {} {} :{}", chan, nick, reason)
}

pub fn mode(chan: &str, change: &str, arg: &str) -> String {
    format!("MODE {} {} {}", chan, change, arg)
}

pub fn topic(chan: &str, new_topic: Option<&str>) -> String {
    match new_topic {
        Some(t) => format!("TOPIC {} :{}", chan, t),
        None => format!("TOPIC {}", chan),
    }
}

pub fn oper(username: &str, password: &str) -> String {
    format!("OPER {} {}", username, password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privmsg_channel() {
        let p = parse_line(":alice!u@h PRIVMSG #room :!hello world");
        assert_eq!(p.prefix, "alice!u@h");
        assert_eq!(p.author_nick, "alice");
        assert_eq!(p.command, "PRIVMSG");
        assert_eq!(p.target, "#room");
        assert_eq!(p.trailing, "!hello world");
    }

    #[test]
    fn privmsg_private() {
        let p = parse_line(":bob!u@h PRIVMSG bot :>what is up");
        assert_eq!(p.author_nick, "bob");
        assert_eq!(p.target, "bot");
        assert_eq!(p.trailing, ">what is up");
    }

    #[test]
    fn numeric_reply() {
        let p = parse_line(":server 376 bot :End of /MOTD");
        assert_eq!(p.prefix, "server");
        assert_eq!(p.author_nick, "server");
        assert_eq!(p.command, "376");
        assert_eq!(p.target, "bot");
        assert_eq!(p.trailing, "End of /MOTD");
    }

    #[test]
    fn ping_no_prefix() {
        let p = parse_line("PING :abc123");
        assert_eq!(p.prefix, "");
        assert_eq!(p.command, "PING");
        assert_eq!(p.trailing, "abc123");
    }

    #[test]
    fn no_middle_trailing_is_fallback_target() {
        let p = parse_line(":a!b@c PRIVMSG :#fallback hello");
        // Middle is absent, trailing starts with '#': used as target per the spec.
        assert_eq!(p.target, "#fallback hello");
    }

    #[test]
    fn no_middle_no_hash_trailing_empty_target() {
        let p = parse_line(":a!b@c NOTICE :hi there");
        assert_eq!(p.target, "");
        assert_eq!(p.trailing, "hi there");
    }

    #[test]
    fn unparsable_line_is_preserved_as_trailing() {
        let p = parse_line(":lonely-prefix-with-no-command");
        assert_eq!(p.command, "");
        assert_eq!(p.prefix, "");
        assert_eq!(p.author_nick, "");
        assert_eq!(p.trailing, ":lonely-prefix-with-no-command");
    }

    #[test]
    fn author_nick_without_bang_is_whole_prefix() {
        let p = parse_line(":irc.example.net NOTICE * :*** Looking up your hostname...");
        assert_eq!(p.author_nick, "irc.example.net");
    }

    #[test]
    fn parse_is_deterministic() {
        let line = ":tiny!~tiny@192.168.0.1 JOIN #haskell";
        assert_eq!(parse_line(line), parse_line(line));
    }

    #[test]
    fn round_trip_canonical_line() {
        let line = ":nick!user@host PRIVMSG #chan :hello there";
        let p = parse_line(line);
        let reconstructed = format!(
            ":{} {} {} :{}",
            p.prefix, p.command, p.target, p.trailing
        );
        assert_eq!(parse_line(&reconstructed), p);
    }

    #[test]
    fn drop_nick_prefix_strips_membership_marker() {
        assert_eq!(drop_nick_prefix("@op_nick"), "op_nick");
        assert_eq!(drop_nick_prefix("+voiced"), "voiced");
        assert_eq!(drop_nick_prefix("plain"), "plain");
    }

    #[test]
    fn generators_produce_expected_lines() {
        assert_eq!(pong("abc123"), "PONG :abc123");
        assert_eq!(join("#x", None), "JOIN #x");
        assert_eq!(join("#y", Some("key")), "JOIN #y key");
        assert_eq!(privmsg("#room", "hi"), "PRIVMSG #room :hi");
        assert_eq!(quit(None), "QUIT");
        assert_eq!(quit(Some("bye")), "QUIT :bye");
    }
}
