//! Per-event handles passed to handlers: [`Context`] for the event itself,
//! plus [`Member`]/[`Channel`] for acting on a nick or channel without
//! re-deriving bot state.

use crate::bot::BotHandle;

/// Everything a handler needs about the event that triggered it.
#[derive(Clone)]
pub struct Context {
    pub bot: BotHandle,
    /// `"RAW"`, `"PRIVMSG"`, `"JOIN"`, `"PART"`, `"QUIT"`, or `"NICK"`.
    pub command_type: String,
    /// Channel or nick the line targeted; empty for events with no target.
    pub target: String,
    /// Nick the line came from (old nick, for `NICK` events).
    pub author: String,
    /// For `NICK` events, the new nick. Otherwise the PRIVMSG trailing text.
    pub message: String,
    pub full_line: String,
    /// Name of the command or prefix-command that matched, if any.
    pub command_name: String,
    pub arg: String,
    pub args: Vec<String>,
}

impl Context {
    pub fn raw(bot: BotHandle, full_line: &str) -> Self {
        Context {
            bot,
            command_type: "RAW".to_owned(),
            target: String::new(),
            author: String::new(),
            message: String::new(),
            full_line: full_line.to_owned(),
            command_name: String::new(),
            arg: String::new(),
            args: Vec::new(),
        }
    }

    /// Sends `text` back to the channel this event arrived on, or privately
    /// to `author` if the event targeted the bot's own nick. One `PRIVMSG`
    /// per line of `text`.
    pub fn reply(&self, text: &str) {
        self.send(text)
    }

    pub fn send(&self, text: &str) {
        let destination = if self.target == self.bot.nick() {
            self.author.as_str()
        } else {
            self.target.as_str()
        };
        self.bot.privmsg(destination, text);
    }

    pub fn author_obj(&self) -> Member {
        Member::new(self.bot.clone(), self.author.clone())
    }

    pub fn channel_obj(&self) -> Channel {
        Channel::new(self.bot.clone(), self.target.clone())
    }

    pub fn get_member(&self, nick: &str) -> Member {
        Member::new(self.bot.clone(), nick.to_owned())
    }
}

/// A handle to a nick, obtainable from a [`Context`].
pub struct Member {
    bot: BotHandle,
    pub nick: String,
}

impl Member {
    pub fn new(bot: BotHandle, nick: String) -> Self {
        Member { bot, nick }
    }

    /// Sends `text` as a private message, one `PRIVMSG` per line.
    pub fn send(&self, text: &str) {
        self.bot.privmsg(&self.nick, text);
    }

    pub fn kick(&self, channel: &str, reason: &str) {
        self.bot.send_raw(cogbot_wire::kick(channel, &self.nick, reason));
    }

    /// Bans by hostmask (`nick!*@*`) then kicks.
    pub fn ban(&self, channel: &str, reason: &str) {
        let mask = format!("{}!*@*", self.nick);
        self.bot.send_raw(cogbot_wire::mode(channel, "+b", &mask));
        self.kick(channel, reason);
    }

    pub fn mute(&self, channel: &str) {
        self.bot.send_raw(cogbot_wire::mode(channel, "-v", &self.nick));
        self.bot.mute(channel, &self.nick);
    }

    pub fn unmute(&self, channel: &str) {
        self.bot.send_raw(cogbot_wire::mode(channel, "+v", &self.nick));
        self.bot.unmute(channel, &self.nick);
    }

    pub fn is_muted(&self, channel: &str) -> bool {
        self.bot.is_muted(channel, &self.nick)
    }
}

/// A handle to a channel name, obtainable from a [`Context`].
pub struct Channel {
    bot: BotHandle,
    pub name: String,
}

impl Channel {
    pub fn new(bot: BotHandle, name: String) -> Self {
        Channel { bot, name }
    }

    /// Requests channel operator status for the bot's own nick.
    pub fn oper(&self) {
        let nick = self.bot.nick();
        self.bot.send_raw(cogbot_wire::mode(&self.name, "+o", &nick));
    }

    pub fn set_topic(&self, text: &str) {
        self.bot.send_raw(cogbot_wire::topic(&self.name, Some(text)));
    }

    /// Sends a bare `TOPIC` request. There is no way to correlate the reply
    /// (numeric 332) with this call without a side read that would violate
    /// the single-reader ordering guarantee on the main connection; watch
    /// `raw` events for numeric 332 on this channel instead.
    pub fn get_topic(&self) {
        self.bot.send_raw(cogbot_wire::topic(&self.name, None));
    }

    pub fn unban(&self, mask: &str) {
        self.bot.send_raw(cogbot_wire::mode(&self.name, "-b", mask));
    }
}
