//! Logging init and the category targets every subsystem logs under,
//! mirroring the source's `LOG_PREFIX` table. Built on the `log` facade, so
//! embedding a `cogbot` bot with no logger installed is a silent no-op —
//! the equivalent of the source's `NullLogger`.

/// Raw line send/receive, at trace level.
pub const NET: &str = "cogbot::net";
/// Malformed input and transport failures.
pub const ERROR: &str = "cogbot::error";
/// Every inbound line before it's parsed.
pub const RAW: &str = "cogbot::raw";
/// Dispatcher routing decisions and handler errors.
pub const DISPATCH: &str = "cogbot::dispatch";
/// Task driver lifecycle.
pub const TASK: &str = "cogbot::task";
/// Connection and bot startup/shutdown.
pub const CORE: &str = "cogbot::core";
/// Cog load/unload/reload.
pub const COG: &str = "cogbot::cog";
/// DCC transfer progress and errors.
pub const DCC: &str = "cogbot::dcc";
/// Permission checks (reserved for collaborators built on top of the core).
pub const PERM: &str = "cogbot::perm";

/// Installs `env_logger` as the global logger, honoring `RUST_LOG`. Safe to
/// call once at process startup; a second call is a silent no-op per
/// `env_logger`'s own semantics.
pub fn init() {
    let _ = env_logger::try_init();
}
