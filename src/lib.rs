//! `cogbot`: an extensible IRC client framework.
//!
//! The framework speaks the IRC wire protocol to a single server, classifies
//! inbound lines into events, and routes each event to handlers registered
//! through [`cog`]s. It also receives inbound DCC SEND file transfers.
//!
//! Everything here runs on a single-threaded cooperative scheduler: the read
//! loop, every handler, every task driver, and every DCC transfer are
//! `!Send` futures driven by a `tokio::task::LocalSet`. Callers are expected
//! to run [`Bot::start`] inside one, e.g.:
//!
//! ```no_run
//! # use cogbot::{Bot, BotConfig};
//! let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! let local = tokio::task::LocalSet::new();
//! local.block_on(&rt, async {
//!     let bot = Bot::new(BotConfig {
//!         host: "irc.example.org".into(),
//!         nick: "cogbot".into(),
//!         ..Default::default()
//!     });
//!     // bot.start().await;
//!     let _ = bot;
//! });
//! ```

pub mod cog;
pub mod config;
pub mod connection;
pub mod context;
pub mod credentials;
pub mod dcc;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod registry;
pub mod task;

mod bot;

pub use bot::{Bot, BotConfig, BotHandle};
pub use context::{Channel, Context, Member};
pub use registry::{
    CommandHandler, DccHandler, EventHandler, EventKind, ReadyHandler, Registry, TaskHandler,
};
pub use cogbot_wire as wire;
