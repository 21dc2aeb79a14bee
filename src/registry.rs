//! The catalog of commands, prefix-commands, event handlers, and tasks that
//! the dispatcher consults for every inbound line.
//!
//! A `Bot` owns one `Registry` directly (there is no process-wide singleton
//! snapshotted at construction time; see `DESIGN.md` for why that departs
//! from the source this framework is modeled on). Cogs mutate it through the
//! recording view in [`crate::cog`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use crate::context::Context;
use crate::dcc::DccFile;

/// A future whose output type is known but whose concrete type is erased;
/// never `Send` since handlers close over `Rc`/`RefCell` bot state.
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// What a handler invocation yields: `Err` is logged at the dispatcher
/// boundary and never propagates further (see SPEC_FULL.md's error model).
pub type HandlerResult = Result<(), Box<dyn std::error::Error>>;

pub type CommandHandler = Rc<dyn Fn(Context) -> LocalBoxFuture<'static, HandlerResult>>;
pub type EventHandler = Rc<dyn Fn(Context) -> LocalBoxFuture<'static, HandlerResult>>;
pub type ReadyHandler =
    Rc<dyn Fn(crate::bot::BotHandle) -> LocalBoxFuture<'static, HandlerResult>>;
pub type DccHandler = Rc<dyn Fn(DccFile) -> LocalBoxFuture<'static, HandlerResult>>;
pub type TaskHandler = Rc<
    dyn Fn(crate::bot::BotHandle, Rc<Vec<String>>) -> LocalBoxFuture<'static, HandlerResult>,
>;

/// The event kinds a generic (`Context`-shaped) handler can subscribe to.
/// `Ready` and `Dcc` carry different payloads and are tracked separately
/// (see [`Registry::ready`], [`Registry::dcc`]), but still count as event
/// kinds for cog bookkeeping purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Message,
    Join,
    Leave,
    Raw,
    Nick,
    Ready,
    Dcc,
}

#[derive(Clone)]
pub struct TaskDescriptor {
    pub handler: TaskHandler,
    pub interval_secs: f64,
    pub max_repeat: Option<u64>,
    pub current_repeat: u64,
}

/// Ordered, insertion-preserving map of prefix strings to handlers. Multiple
/// prefix-commands may be registered and dispatch checks every one of them
/// whose prefix is a string-prefix of the message, in registration order.
#[derive(Default)]
pub struct PrefixCommands {
    order: Vec<String>,
    map: HashMap<String, CommandHandler>,
}

impl PrefixCommands {
    /// Inserts or overwrites `prefix`. Returns `true` if this overwrote an
    /// existing registration (callers should warn on that).
    pub fn insert(&mut self, prefix: String, handler: CommandHandler) -> bool {
        let existed = self.map.insert(prefix.clone(), handler).is_some();
        if !existed {
            self.order.push(prefix);
        }
        existed
    }

    pub fn remove(&mut self, prefix: &str) {
        self.map.remove(prefix);
        self.order.retain(|p| p != prefix);
    }

    /// Every prefix command whose literal prefix is a string-prefix of
    /// `msg`, in registration order.
    pub fn matching<'a>(&'a self, msg: &'a str) -> impl Iterator<Item = (&'a str, &'a CommandHandler)> {
        self.order.iter().filter_map(move |prefix| {
            if msg.starts_with(prefix.as_str()) {
                self.map.get(prefix).map(|h| (prefix.as_str(), h))
            } else {
                None
            }
        })
    }
}

/// The four registries the dispatcher consults: commands, prefix-commands,
/// event handlers (by kind), and periodic tasks.
#[derive(Default)]
pub struct Registry {
    pub(crate) commands: HashMap<String, CommandHandler>,
    pub(crate) prefix_commands: PrefixCommands,
    pub(crate) message: Vec<EventHandler>,
    pub(crate) join: Vec<EventHandler>,
    pub(crate) leave: Vec<EventHandler>,
    pub(crate) raw: Vec<EventHandler>,
    pub(crate) nick: Vec<EventHandler>,
    pub(crate) ready: Vec<ReadyHandler>,
    pub(crate) dcc: Vec<DccHandler>,
    pub(crate) tasks: HashMap<String, TaskDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_list_mut(&mut self, kind: EventKind) -> &mut Vec<EventHandler> {
        match kind {
            EventKind::Message => &mut self.message,
            EventKind::Join => &mut self.join,
            EventKind::Leave => &mut self.leave,
            EventKind::Raw => &mut self.raw,
            EventKind::Nick => &mut self.nick,
            EventKind::Ready | EventKind::Dcc => {
                unreachable!("ready/dcc handlers are tracked separately")
            }
        }
    }

    pub fn event_list(&self, kind: EventKind) -> &Vec<EventHandler> {
        match kind {
            EventKind::Message => &self.message,
            EventKind::Join => &self.join,
            EventKind::Leave => &self.leave,
            EventKind::Raw => &self.raw,
            EventKind::Nick => &self.nick,
            EventKind::Ready | EventKind::Dcc => {
                unreachable!("ready/dcc handlers are tracked separately")
            }
        }
    }

    /// Removes every handler in `kind`'s list that is reference-identical to
    /// one of `handlers` (used by cog unload to reverse exactly what it
    /// added, even if the same closure was registered more than once).
    pub fn remove_event_handlers(&mut self, kind: EventKind, handlers: &[EventHandler]) {
        let list = self.event_list_mut(kind);
        for h in handlers {
            if let Some(pos) = list.iter().position(|existing| Rc::ptr_eq(existing, h)) {
                list.remove(pos);
            }
        }
    }

    pub fn remove_ready_handlers(&mut self, handlers: &[ReadyHandler]) {
        for h in handlers {
            if let Some(pos) = self.ready.iter().position(|existing| Rc::ptr_eq(existing, h)) {
                self.ready.remove(pos);
            }
        }
    }

    pub fn remove_dcc_handlers(&mut self, handlers: &[DccHandler]) {
        for h in handlers {
            if let Some(pos) = self.dcc.iter().position(|existing| Rc::ptr_eq(existing, h)) {
                self.dcc.remove(pos);
            }
        }
    }
}
