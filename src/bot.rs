//! The top-level coordinator: owns the connection, the per-bot registry and
//! cog manager, and drives the read/dispatch loop.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::mpsc;

use crate::cog::CogManager;
use crate::connection::Connection;
use crate::dispatcher;
use crate::registry::Registry;

/// Construction parameters for a [`Bot`]. Can be built by hand or derived
/// from a [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub prefix: String,
    pub host: String,
    pub port: u16,
    pub nick: String,
    pub username: String,
    pub realname: String,
    /// Sent as `PASS <password>` during registration, and again as
    /// `PRIVMSG NickServ :IDENTIFY <password>` once registration completes,
    /// matching the original's single `password` field.
    pub password: Option<String>,
    /// Channel name to optional join key, joined in this order once
    /// registration completes.
    pub channel_map: Vec<(String, Option<String>)>,
    pub downloads_dir: PathBuf,
    /// Message sent with the closing `QUIT`, if any.
    pub quit_message: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            prefix: "!".to_owned(),
            host: String::new(),
            port: 6667,
            nick: String::new(),
            username: String::new(),
            realname: String::new(),
            password: None,
            channel_map: Vec::new(),
            downloads_dir: PathBuf::from("downloads"),
            quit_message: None,
        }
    }
}

pub(crate) struct BotState {
    pub nick: String,
    pub username: String,
    pub realname: String,
    pub prefix: String,
    pub password: Option<String>,
    pub running: bool,
    pub registered: bool,
    pub channel_map: Vec<(String, Option<String>)>,
    pub registry: Registry,
    pub cogs: CogManager,
    pub mute_status: HashMap<String, HashSet<String>>,
    pub save_dir: PathBuf,
}

/// A cheap, cloneable handle to the bot's shared state, passed to every
/// handler and task. Outbound writes go through an unbounded channel to the
/// single task that owns the socket, so handlers never contend for the
/// connection directly.
#[derive(Clone)]
pub struct BotHandle {
    pub(crate) state: Rc<RefCell<BotState>>,
    pub(crate) write_tx: mpsc::UnboundedSender<String>,
}

impl BotHandle {
    /// Enqueues a line to be written to the server, CRLF appended by the
    /// connection. Writes from any number of concurrent handlers/tasks are
    /// serialized in send order by the channel.
    pub fn send_raw(&self, line: impl Into<String>) {
        let _ = self.write_tx.send(line.into());
    }

    pub fn nick(&self) -> String {
        self.state.borrow().nick.clone()
    }

    pub fn prefix(&self) -> String {
        self.state.borrow().prefix.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    pub fn is_registered(&self) -> bool {
        self.state.borrow().registered
    }

    pub fn stop(&self) {
        self.state.borrow_mut().running = false;
    }

    pub fn save_dir(&self) -> PathBuf {
        self.state.borrow().save_dir.clone()
    }

    /// Sends `text` as one `PRIVMSG` per line to `target`.
    pub fn privmsg(&self, target: &str, text: &str) {
        for line in text.lines() {
            self.send_raw(cogbot_wire::privmsg(target, line));
        }
    }

    pub fn mute(&self, channel: &str, nick: &str) {
        self.state
            .borrow_mut()
            .mute_status
            .entry(channel.to_owned())
            .or_default()
            .insert(nick.to_owned());
    }

    pub fn unmute(&self, channel: &str, nick: &str) {
        if let Some(set) = self.state.borrow_mut().mute_status.get_mut(channel) {
            set.remove(nick);
        }
    }

    pub fn is_muted(&self, channel: &str, nick: &str) -> bool {
        self.state
            .borrow()
            .mute_status
            .get(channel)
            .map(|set| set.contains(nick))
            .unwrap_or(false)
    }

    /// Runs `f` with a mutable reference to the registry. Kept short-lived
    /// and synchronous by every caller: never hold the borrow across an
    /// `.await`.
    pub(crate) fn with_registry_mut<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        f(&mut self.state.borrow_mut().registry)
    }

    pub(crate) fn with_registry<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        f(&self.state.borrow().registry)
    }

    pub(crate) fn with_cogs_mut<R>(&self, f: impl FnOnce(&mut CogManager, &mut Registry) -> R) -> R {
        let mut state = self.state.borrow_mut();
        let BotState { cogs, registry, .. } = &mut *state;
        f(cogs, registry)
    }

    pub fn load_cog(&self, cog: Box<dyn crate::cog::Cog>) -> crate::cog::CogOutcome {
        self.with_cogs_mut(|cogs, registry| cogs.load(registry, cog))
    }

    pub fn unload_cog(&self, id: &str) -> crate::cog::CogOutcome {
        self.with_cogs_mut(|cogs, registry| cogs.unload(registry, id))
    }

    pub fn reload_cog(&self, cog: Box<dyn crate::cog::Cog>) -> crate::cog::CogOutcome {
        self.with_cogs_mut(|cogs, registry| cogs.reload(registry, cog))
    }

    pub fn is_cog_loaded(&self, id: &str) -> bool {
        self.state.borrow().cogs.is_loaded(id)
    }

    /// Launches the driver for a task already registered by a loaded cog.
    pub fn start_task(&self, task_id: &str, args: Vec<String>) {
        crate::task::start_task(self, task_id, args)
    }
}

/// The long-running IRC client. Construct with [`Bot::new`], obtain a
/// [`BotHandle`] for wiring up cogs, then hand ownership to [`Bot::start`].
pub struct Bot {
    handle: BotHandle,
    write_rx: mpsc::UnboundedReceiver<String>,
    config: BotConfig,
}

impl Bot {
    pub fn new(config: BotConfig) -> Self {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let state = BotState {
            nick: config.nick.clone(),
            username: config.username.clone(),
            realname: config.realname.clone(),
            prefix: config.prefix.clone(),
            password: config.password.clone(),
            running: true,
            registered: false,
            channel_map: config.channel_map.clone(),
            registry: Registry::new(),
            cogs: CogManager::new(),
            mute_status: HashMap::new(),
            save_dir: config.downloads_dir.clone(),
        };
        let handle = BotHandle {
            state: Rc::new(RefCell::new(state)),
            write_tx,
        };
        Bot {
            handle,
            write_rx,
            config,
        }
    }

    pub fn handle(&self) -> BotHandle {
        self.handle.clone()
    }

    /// Connects, registers, and runs the read/dispatch loop until shutdown.
    /// Must be driven inside a `tokio::task::LocalSet` since handlers are
    /// `!Send`.
    pub async fn start(mut self) {
        let mut conn = Connection::new(self.config.quit_message.clone());

        if let Err(e) = conn.connect(&self.config.host, self.config.port).await {
            error!(target: "cogbot::core", "connect failed: {}", e);
            return;
        }

        let password = self.handle.state.borrow().password.clone();
        if let Some(password) = &password {
            let _ = conn.send_raw(&cogbot_wire::pass(password)).await;
        }
        let (username, realname, nick) = {
            let s = self.handle.state.borrow();
            (s.username.clone(), s.realname.clone(), s.nick.clone())
        };
        let _ = conn.send_raw(&cogbot_wire::user(&username, &realname)).await;
        let _ = conn.send_raw(&cogbot_wire::nick(&nick)).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        info!(target: "cogbot::core", "registration sent");

        let save_dir = self.handle.save_dir();
        if let Err(e) = tokio::fs::create_dir_all(&save_dir).await {
            warn!(target: "cogbot::core", "could not create save dir {:?}: {}", save_dir, e);
        }

        loop {
            if !self.handle.is_running() || !conn.is_connected() {
                break;
            }

            tokio::select! {
                line = conn.read_line() => {
                    match line {
                        Ok(Some(line)) => self.handle_line(&mut conn, &line).await,
                        Ok(None) => break,
                        Err(e) => {
                            warn!(target: "cogbot::net", "connection error: {}", e);
                            break;
                        }
                    }
                }
                Some(out) = self.write_rx.recv() => {
                    if let Err(e) = conn.send_raw(&out).await {
                        warn!(target: "cogbot::net", "send failed: {}", e);
                        break;
                    }
                }
            }
        }

        self.handle.stop();
        conn.close().await;
    }

    async fn handle_line(&mut self, conn: &mut Connection, line: &str) {
        use log::trace;
        trace!(target: "cogbot::raw", "<- {}", line);

        let parsed = cogbot_wire::parse_line(line);

        if parsed.command == "PING" {
            let _ = conn.send_raw(&cogbot_wire::pong(&parsed.trailing)).await;
            return;
        }

        if !self.handle.is_registered() && line.contains(" 376 ") {
            self.on_registered(conn).await;
        }

        dispatcher::dispatch_line(&self.handle, line, &parsed).await;
    }

    async fn on_registered(&mut self, conn: &mut Connection) {
        self.handle.state.borrow_mut().registered = true;

        let password = self.handle.state.borrow().password.clone();
        if let Some(password) = password {
            let _ = conn
                .send_raw(&cogbot_wire::privmsg("NickServ", &format!("IDENTIFY {}", password)))
                .await;
        }

        let channel_map = self.handle.state.borrow().channel_map.clone();
        for (chan, key) in &channel_map {
            let _ = conn.send_raw(&cogbot_wire::join(chan, key.as_deref())).await;
        }

        let ready_handlers = self.handle.with_registry(|r| r.ready.clone());
        for handler in ready_handlers {
            let fut = handler(self.handle.clone());
            if let Err(e) = fut.await {
                warn!(target: "cogbot::core", "ready handler error: {}", e);
            }
        }
    }
}
