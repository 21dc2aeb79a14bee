//! Cog lifecycle: dynamic load/unload/reload of handler modules with exact
//! accounting of what each cog contributed, so unload fully reverses load.
//!
//! Rather than the source's decorator-based global registries (collected at
//! import time, then diffed pre/post to figure out what a module added),
//! cogs here register against an explicit recording view (`CogRegistration`)
//! passed to their `register` method. There is nothing to diff: the view
//! records exactly what was inserted as it happens.

use std::collections::HashMap;

use log::warn;

use crate::error::CogError;
use crate::registry::{
    CommandHandler, DccHandler, EventHandler, EventKind, ReadyHandler, Registry, TaskDescriptor,
    TaskHandler,
};

/// A unit of handler code, identified by a stable id, that registers
/// commands/prefix-commands/events/tasks when activated.
pub trait Cog {
    fn id(&self) -> &str;
    fn register(&self, reg: &mut CogRegistration) -> Result<(), CogError>;
}

/// Outcome of a load/unload/reload call. Mirrors the source's `(code, ok)`
/// pairs as a proper enum instead of a magic tuple.
#[derive(Debug)]
pub enum CogOutcome {
    Ok,
    AlreadyLoaded,
    NotLoaded,
    Failure(CogError),
}

/// Exactly what one cog activation added, so it can be removed bit for bit.
#[derive(Default)]
pub struct CogRecord {
    commands: Vec<String>,
    prefix_commands: Vec<String>,
    tasks: Vec<String>,
    event_handlers: HashMap<EventKind, Vec<EventHandler>>,
    ready: Vec<ReadyHandler>,
    dcc: Vec<DccHandler>,
}

/// The recording registry view a cog's `register` method is given. Every
/// insertion is mirrored into a [`CogRecord`] so the cog manager can reverse
/// it exactly on unload.
pub struct CogRegistration<'a> {
    registry: &'a mut Registry,
    record: CogRecord,
}

impl<'a> CogRegistration<'a> {
    fn new(registry: &'a mut Registry) -> Self {
        CogRegistration {
            registry,
            record: CogRecord::default(),
        }
    }

    pub fn command(&mut self, name: &str, handler: CommandHandler) {
        self.registry.commands.insert(name.to_owned(), handler);
        self.record.commands.push(name.to_owned());
    }

    /// Registers a prefix-command. Re-registering an existing prefix string
    /// logs a warning and overwrites, per the registry's uniqueness
    /// invariant.
    pub fn prefix_command(&mut self, prefix: &str, handler: CommandHandler) {
        let overwrote = self.registry.prefix_commands.insert(prefix.to_owned(), handler);
        if overwrote {
            warn!(target: "cogbot::cog", "prefix command '{}' re-registered, overwriting", prefix);
        }
        self.record.prefix_commands.push(prefix.to_owned());
    }

    pub fn on_message(&mut self, handler: EventHandler) {
        self.on_event(EventKind::Message, handler)
    }

    pub fn on_join(&mut self, handler: EventHandler) {
        self.on_event(EventKind::Join, handler)
    }

    pub fn on_leave(&mut self, handler: EventHandler) {
        self.on_event(EventKind::Leave, handler)
    }

    pub fn on_raw(&mut self, handler: EventHandler) {
        self.on_event(EventKind::Raw, handler)
    }

    pub fn on_nick(&mut self, handler: EventHandler) {
        self.on_event(EventKind::Nick, handler)
    }

    fn on_event(&mut self, kind: EventKind, handler: EventHandler) {
        self.registry.event_list_mut(kind).push(handler.clone());
        self.record.event_handlers.entry(kind).or_default().push(handler);
    }

    pub fn on_ready(&mut self, handler: ReadyHandler) {
        self.registry.ready.push(handler.clone());
        self.record.ready.push(handler);
    }

    pub fn on_dcc(&mut self, handler: DccHandler) {
        self.registry.dcc.push(handler.clone());
        self.record.dcc.push(handler);
    }

    pub fn task(
        &mut self,
        id: &str,
        interval_secs: f64,
        max_repeat: Option<u64>,
        handler: TaskHandler,
    ) {
        self.registry.tasks.insert(
            id.to_owned(),
            TaskDescriptor {
                handler,
                interval_secs,
                max_repeat,
                current_repeat: 0,
            },
        );
        self.record.tasks.push(id.to_owned());
    }
}

fn rollback(registry: &mut Registry, record: &CogRecord) {
    for name in &record.commands {
        registry.commands.remove(name);
    }
    for prefix in &record.prefix_commands {
        registry.prefix_commands.remove(prefix);
    }
    for id in &record.tasks {
        registry.tasks.remove(id);
    }
    for (kind, handlers) in &record.event_handlers {
        registry.remove_event_handlers(*kind, handlers);
    }
    registry.remove_ready_handlers(&record.ready);
    registry.remove_dcc_handlers(&record.dcc);
}

/// Tracks which cogs are loaded and what each contributed.
#[derive(Default)]
pub struct CogManager {
    loaded: HashMap<String, (Box<dyn Cog>, CogRecord)>,
}

impl CogManager {
    pub fn new() -> Self {
        CogManager::default()
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.loaded.contains_key(id)
    }

    pub fn loaded_ids(&self) -> impl Iterator<Item = &str> {
        self.loaded.keys().map(|s| s.as_str())
    }

    /// Activates `cog` against a recording view of `registry`. On failure,
    /// everything it managed to register before failing is rolled back.
    pub fn load(&mut self, registry: &mut Registry, cog: Box<dyn Cog>) -> CogOutcome {
        let id = cog.id().to_owned();
        if self.loaded.contains_key(&id) {
            return CogOutcome::AlreadyLoaded;
        }
        self.activate(registry, id, cog)
    }

    /// Removes everything cog `id` contributed. The full removal set is
    /// computed (it already exists, recorded at load time) before any
    /// mutation happens, so unload is all-or-nothing.
    pub fn unload(&mut self, registry: &mut Registry, id: &str) -> CogOutcome {
        match self.loaded.remove(id) {
            None => CogOutcome::NotLoaded,
            Some((_cog, record)) => {
                rollback(registry, &record);
                CogOutcome::Ok
            }
        }
    }

    /// Unloads the currently loaded cog with this id, if any, then activates
    /// `cog` (expected to be a fresh instance produced the same way the
    /// original was) in its place. If no cog with this id was loaded, this
    /// degrades to a plain load but still reports `NotLoaded` so the caller
    /// can distinguish a clean reload from a first-time load.
    pub fn reload(&mut self, registry: &mut Registry, cog: Box<dyn Cog>) -> CogOutcome {
        let id = cog.id().to_owned();
        match self.loaded.remove(&id) {
            None => {
                self.activate(registry, id, cog);
                CogOutcome::NotLoaded
            }
            Some((_old_cog, old_record)) => {
                rollback(registry, &old_record);
                self.activate(registry, id, cog)
            }
        }
    }

    fn activate(&mut self, registry: &mut Registry, id: String, cog: Box<dyn Cog>) -> CogOutcome {
        let mut view = CogRegistration::new(registry);
        match cog.register(&mut view) {
            Ok(()) => {
                let record = view.record;
                self.loaded.insert(id, (cog, record));
                CogOutcome::Ok
            }
            Err(e) => {
                rollback(view.registry, &view.record);
                CogOutcome::Failure(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use std::rc::Rc;

    struct HelloCog;

    impl Cog for HelloCog {
        fn id(&self) -> &str {
            "hello"
        }

        fn register(&self, reg: &mut CogRegistration) -> Result<(), CogError> {
            reg.command(
                "foo",
                Rc::new(|_ctx: Context| Box::pin(async { Ok(()) })),
            );
            reg.on_message(Rc::new(|_ctx: Context| Box::pin(async { Ok(()) })));
            Ok(())
        }
    }

    struct FailingCog;

    impl Cog for FailingCog {
        fn id(&self) -> &str {
            "failing"
        }

        fn register(&self, reg: &mut CogRegistration) -> Result<(), CogError> {
            reg.command(
                "partial",
                Rc::new(|_ctx: Context| Box::pin(async { Ok(()) })),
            );
            Err(CogError::Activation("boom".to_owned()))
        }
    }

    #[test]
    fn load_then_unload_restores_registry() {
        let mut registry = Registry::new();
        let mut manager = CogManager::new();

        assert!(matches!(
            manager.load(&mut registry, Box::new(HelloCog)),
            CogOutcome::Ok
        ));
        assert!(registry.commands.contains_key("foo"));
        assert_eq!(registry.message.len(), 1);

        assert!(matches!(
            manager.unload(&mut registry, "hello"),
            CogOutcome::Ok
        ));
        assert!(!registry.commands.contains_key("foo"));
        assert_eq!(registry.message.len(), 0);
    }

    #[test]
    fn load_twice_reports_already_loaded() {
        let mut registry = Registry::new();
        let mut manager = CogManager::new();
        manager.load(&mut registry, Box::new(HelloCog));
        assert!(matches!(
            manager.load(&mut registry, Box::new(HelloCog)),
            CogOutcome::AlreadyLoaded
        ));
    }

    #[test]
    fn unload_unknown_cog_reports_not_loaded() {
        let mut registry = Registry::new();
        let mut manager = CogManager::new();
        assert!(matches!(
            manager.unload(&mut registry, "nope"),
            CogOutcome::NotLoaded
        ));
    }

    #[test]
    fn failed_activation_rolls_back_partial_registrations() {
        let mut registry = Registry::new();
        let mut manager = CogManager::new();
        assert!(matches!(
            manager.load(&mut registry, Box::new(FailingCog)),
            CogOutcome::Failure(_)
        ));
        assert!(!registry.commands.contains_key("partial"));
        assert!(!manager.is_loaded("failing"));
    }

    #[test]
    fn reload_produces_identical_deltas_to_first_load() {
        let mut registry = Registry::new();
        let mut manager = CogManager::new();
        manager.load(&mut registry, Box::new(HelloCog));
        let commands_after_load: Vec<_> = registry.commands.keys().cloned().collect();

        manager.reload(&mut registry, Box::new(HelloCog));
        let commands_after_reload: Vec<_> = registry.commands.keys().cloned().collect();

        assert_eq!(commands_after_load, commands_after_reload);
        assert_eq!(registry.message.len(), 1);
    }
}
