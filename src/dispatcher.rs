//! Classifies a parsed line into an event and invokes the registered
//! handlers for it, in registration order.

use log::warn;

use cogbot_wire::ParsedMessage;

use crate::bot::BotHandle;
use crate::context::Context;
use crate::dcc::{self, DccFile};

/// Runs every handler in `handlers` against its own `ctx` clone, in order,
/// logging (but never propagating) a handler error.
async fn fire_event(
    handlers: Vec<crate::registry::EventHandler>,
    ctx: &Context,
    kind_name: &str,
) {
    for handler in handlers {
        if let Err(e) = handler(ctx.clone()).await {
            warn!(target: "cogbot::dispatch", "{} handler error: {}", kind_name, e);
        }
    }
}

/// Dispatches one already-parsed, non-PING line. Called after the raw line
/// has been handed to `raw` handlers and PING has been short-circuited.
pub async fn dispatch_line(bot: &BotHandle, raw_line: &str, parsed: &ParsedMessage) {
    let raw_ctx = Context::raw(bot.clone(), raw_line);
    let raw_handlers = bot.with_registry(|r| r.raw.clone());
    fire_event(raw_handlers, &raw_ctx, "raw").await;

    match parsed.command.as_str() {
        "PRIVMSG" => dispatch_privmsg(bot, parsed, raw_line).await,
        "JOIN" => {
            if parsed.author_nick != bot.nick() {
                let ctx = event_context(bot, parsed, raw_line, "JOIN");
                let handlers = bot.with_registry(|r| r.join.clone());
                fire_event(handlers, &ctx, "join").await;
            }
        }
        "PART" | "QUIT" => {
            if parsed.author_nick != bot.nick() {
                let ctx = event_context(bot, parsed, raw_line, &parsed.command);
                let handlers = bot.with_registry(|r| r.leave.clone());
                fire_event(handlers, &ctx, "leave").await;
            }
        }
        "NICK" => {
            if parsed.author_nick != bot.nick() {
                let ctx = Context {
                    bot: bot.clone(),
                    command_type: "NICK".to_owned(),
                    target: parsed.target.clone(),
                    author: parsed.author_nick.clone(),
                    message: parsed.trailing.clone(),
                    full_line: raw_line.to_owned(),
                    command_name: String::new(),
                    arg: String::new(),
                    args: Vec::new(),
                };
                let handlers = bot.with_registry(|r| r.nick.clone());
                fire_event(handlers, &ctx, "nick").await;
            }
        }
        _ => {}
    }
}

fn event_context(bot: &BotHandle, parsed: &ParsedMessage, raw_line: &str, command_type: &str) -> Context {
    Context {
        bot: bot.clone(),
        command_type: command_type.to_owned(),
        target: parsed.target.clone(),
        author: parsed.author_nick.clone(),
        message: parsed.trailing.clone(),
        full_line: raw_line.to_owned(),
        command_name: String::new(),
        arg: String::new(),
        args: Vec::new(),
    }
}

async fn dispatch_privmsg(bot: &BotHandle, parsed: &ParsedMessage, raw_line: &str) {
    let msg = parsed.trailing.as_str();
    let target = parsed.target.as_str();
    let author = parsed.author_nick.as_str();
    let prefix = bot.prefix();

    let base_ctx = |command_name: &str, arg: &str, args: Vec<String>| Context {
        bot: bot.clone(),
        command_type: "PRIVMSG".to_owned(),
        target: target.to_owned(),
        author: author.to_owned(),
        message: msg.to_owned(),
        full_line: raw_line.to_owned(),
        command_name: command_name.to_owned(),
        arg: arg.to_owned(),
        args,
    };

    let mut command_found = false;
    let mut prefix_fired = false;

    if let Some(rest) = msg.strip_prefix(prefix.as_str()) {
        let rest = rest.trim_start();
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or("");
        if !name.is_empty() {
            let handler = bot.with_registry(|r| r.commands.get(name).cloned());
            if let Some(handler) = handler {
                let arg = parts.next().unwrap_or("").trim();
                let args: Vec<String> = arg.split_whitespace().map(String::from).collect();
                let ctx = base_ctx(name, arg, args);
                if let Err(e) = handler(ctx).await {
                    warn!(target: "cogbot::dispatch", "command '{}' handler error: {}", name, e);
                }
                command_found = true;
            }
        }
    }

    let matches: Vec<(String, crate::registry::CommandHandler)> = bot.with_registry(|r| {
        r.prefix_commands
            .matching(msg)
            .map(|(p, h)| (p.to_owned(), h.clone()))
            .collect()
    });
    for (matched_prefix, handler) in matches {
        prefix_fired = true;
        let arg = &msg[matched_prefix.len()..];
        let args: Vec<String> = arg.split(' ').map(String::from).collect();
        let ctx = base_ctx(&matched_prefix, arg, args);
        if let Err(e) = handler(ctx).await {
            warn!(target: "cogbot::dispatch", "prefix command '{}' handler error: {}", matched_prefix, e);
        }
    }

    let fallback_to_message = !command_found && !prefix_fired && target.starts_with('#');
    if fallback_to_message {
        let ctx = base_ctx("", "", Vec::new());
        let handlers = bot.with_registry(|r| r.message.clone());
        fire_event(handlers, &ctx, "message").await;
        return;
    }

    // A known quirk, preserved on purpose: the DCC SEND scan only runs when
    // the branch above did *not*, so a channel message with no matching
    // command or prefix-command never has its CTCP payload inspected.
    if let Some(request) = dcc::find_dcc_send(msg) {
        let dcc_handlers = bot.with_registry(|r| r.dcc.clone());
        if !dcc_handlers.is_empty() {
            let file = DccFile::new(author.to_owned(), request, bot.save_dir());
            for handler in dcc_handlers {
                let file = file.clone();
                tokio::task::spawn_local(async move {
                    if let Err(e) = handler(file).await {
                        warn!(target: "cogbot::dcc", "dcc handler error: {}", e);
                    }
                });
            }
        }
    }
}
