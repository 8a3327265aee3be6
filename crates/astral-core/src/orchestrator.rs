//! Per-frame fan-out of [`MotionState`] to registered engines, plus the
//! discrete scene-event and section-lifecycle channels.
//!
//! The orchestrator is an explicitly constructed value; clones share the same
//! registry so a page layout and its engines can each hold one. Everything is
//! single-threaded (`Rc`/`RefCell`), matching the one-tick-per-frame render
//! loop.
//!
//! Callbacks are snapshotted before each fan-out and the registry borrow is
//! released while they run, so a callback may register or unregister engines
//! (including itself) without invalidating the iteration. An entry removed
//! mid-broadcast is skipped for the rest of that broadcast.

use fnv::{FnvHashMap, FnvHashSet};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::config::BlessingConfig;
use crate::motion::{BlessingWave, MotionState};

/// Per-frame engine callback. Returning `Err` is logged and does not stop the
/// frame.
pub type EngineCallback = dyn FnMut(&MotionState) -> anyhow::Result<()>;
/// Discrete scene-event handler.
pub type SceneCallback = dyn FnMut(&SceneEvent) -> anyhow::Result<()>;
/// Section transition listener.
pub type SectionCallback = dyn FnMut(&SectionEvent);

/// Payload carried by a scene event.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum EventData {
    #[default]
    None,
    Scalar(f32),
    Point([f32; 2]),
    Text(String),
}

/// A discrete trigger such as a hover pulse.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneEvent {
    pub trigger: String,
    pub data: EventData,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SectionEvent {
    Enter(String),
    Exit(String),
}

impl SectionEvent {
    pub fn section(&self) -> &str {
        match self {
            SectionEvent::Enter(id) | SectionEvent::Exit(id) => id,
        }
    }
}

/// Outcome counts for one [`MotionOrchestrator::broadcast`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Callbacks that ran and returned `Ok`.
    pub delivered: usize,
    /// Callbacks that returned `Err` or panicked.
    pub failed: usize,
    /// Registered callbacks not invoked (inactive section, removed or
    /// re-entered during this broadcast).
    pub skipped: usize,
}

struct Slot<F: ?Sized> {
    generation: u64,
    section: Option<Rc<str>>,
    callback: Rc<RefCell<F>>,
}

struct Entry<F: ?Sized> {
    key: Rc<str>,
    generation: u64,
    callback: Rc<RefCell<F>>,
}

struct Channel<F: ?Sized> {
    slots: FnvHashMap<Rc<str>, Slot<F>>,
}

impl<F: ?Sized> Default for Channel<F> {
    fn default() -> Self {
        Self {
            slots: FnvHashMap::default(),
        }
    }
}

impl<F: ?Sized> Channel<F> {
    /// Insert or replace. Returns true when an older entry was replaced.
    fn insert(&mut self, key: Rc<str>, slot: Slot<F>) -> bool {
        self.slots.insert(key, slot).is_some()
    }

    fn remove(&mut self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    fn remove_generation(&mut self, key: &str, generation: u64) -> bool {
        if self.is_live(key, generation) {
            self.slots.remove(key);
            true
        } else {
            false
        }
    }

    fn is_live(&self, key: &str, generation: u64) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| slot.generation == generation)
    }

    fn snapshot(
        &self,
        mut include: impl FnMut(&Slot<F>) -> bool,
    ) -> (SmallVec<[Entry<F>; 16]>, usize) {
        let mut skipped = 0;
        let mut entries = SmallVec::new();
        for (key, slot) in &self.slots {
            if include(slot) {
                entries.push(Entry {
                    key: key.clone(),
                    generation: slot.generation,
                    callback: slot.callback.clone(),
                });
            } else {
                skipped += 1;
            }
        }
        (entries, skipped)
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChannelKind {
    Engine,
    Scene,
    Section,
}

struct Registry {
    disposed: bool,
    next_generation: u64,
    engines: Channel<EngineCallback>,
    scene_handlers: Channel<SceneCallback>,
    section_listeners: Channel<SectionCallback>,
    active_sections: FnvHashSet<String>,
    current: MotionState,
    last_time: Option<f32>,
    blessing: Option<BlessingWave>,
    blessing_config: BlessingConfig,
}

impl Registry {
    fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn is_live(&self, kind: ChannelKind, key: &str, generation: u64) -> bool {
        match kind {
            ChannelKind::Engine => self.engines.is_live(key, generation),
            ChannelKind::Scene => self.scene_handlers.is_live(key, generation),
            ChannelKind::Section => self.section_listeners.is_live(key, generation),
        }
    }

    fn remove_generation(&mut self, kind: ChannelKind, key: &str, generation: u64) -> bool {
        match kind {
            ChannelKind::Engine => self.engines.remove_generation(key, generation),
            ChannelKind::Scene => self.scene_handlers.remove_generation(key, generation),
            ChannelKind::Section => self.section_listeners.remove_generation(key, generation),
        }
    }
}

/// Shared handle state. Generation 0 is never issued, so an inert handle
/// never matches a live entry.
struct Registration {
    registry: Weak<RefCell<Registry>>,
    kind: ChannelKind,
    key: Rc<str>,
    generation: u64,
}

impl Registration {
    fn inert(kind: ChannelKind, key: Rc<str>) -> Self {
        Self {
            registry: Weak::new(),
            kind,
            key,
            generation: 0,
        }
    }

    fn is_registered(&self) -> bool {
        let Some(reg) = self.registry.upgrade() else {
            return false;
        };
        let live = reg
            .try_borrow()
            .is_ok_and(|r| r.is_live(self.kind, &self.key, self.generation));
        live
    }

    fn unregister(&self) -> bool {
        let Some(reg) = self.registry.upgrade() else {
            return false;
        };
        let Ok(mut r) = reg.try_borrow_mut() else {
            log::warn!("unregister '{}' while the registry is borrowed", self.key);
            return false;
        };
        let removed = r.remove_generation(self.kind, &self.key, self.generation);
        if removed {
            log::debug!("unregistered {:?} '{}'", self.kind, self.key);
        }
        removed
    }
}

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name(Registration);

        impl $name {
            pub fn key(&self) -> &str {
                &self.0.key
            }

            /// True while this exact registration is still in place; false
            /// after removal or after the key was re-registered.
            pub fn is_registered(&self) -> bool {
                self.0.is_registered()
            }

            /// Remove this registration. A stale handle (its key was since
            /// re-registered) leaves the newer entry alone. Returns whether
            /// anything was removed.
            pub fn unregister(self) -> bool {
                self.0.unregister()
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("key", &self.0.key)
                    .field("generation", &self.0.generation)
                    .finish()
            }
        }
    };
}

handle_type!(
    /// Returned by [`MotionOrchestrator::register_engine`]. Dropping it does
    /// not unregister.
    EngineHandle
);
handle_type!(
    /// Returned by [`MotionOrchestrator::register_scene_handler`].
    SceneHandle
);
handle_type!(
    /// Returned by [`MotionOrchestrator::subscribe_sections`].
    SectionHandle
);

/// Frame coordinator. Cheap to clone; clones share one registry.
#[derive(Clone)]
pub struct MotionOrchestrator {
    inner: Rc<RefCell<Registry>>,
}

impl Default for MotionOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MotionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_borrow() {
            Ok(r) => f
                .debug_struct("MotionOrchestrator")
                .field("engines", &r.engines.len())
                .field("scene_handlers", &r.scene_handlers.len())
                .field("active_sections", &r.active_sections)
                .field("disposed", &r.disposed)
                .finish(),
            Err(_) => f.write_str("MotionOrchestrator { <borrowed> }"),
        }
    }
}

impl MotionOrchestrator {
    pub fn new() -> Self {
        Self::with_blessing_config(BlessingConfig::default())
    }

    pub fn with_blessing_config(blessing_config: BlessingConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                disposed: false,
                next_generation: 0,
                engines: Channel::default(),
                scene_handlers: Channel::default(),
                section_listeners: Channel::default(),
                active_sections: FnvHashSet::default(),
                current: MotionState::default(),
                last_time: None,
                blessing: None,
                blessing_config,
            })),
        }
    }

    // ---------------- Engine channel ----------------

    /// Register `callback` under `key`. An existing entry with the same key is
    /// replaced (last writer wins) and its handle goes stale.
    pub fn register_engine<F>(&self, key: &str, callback: F) -> EngineHandle
    where
        F: FnMut(&MotionState) -> anyhow::Result<()> + 'static,
    {
        EngineHandle(self.insert_engine(key, None, Rc::new(RefCell::new(callback))))
    }

    /// Like [`register_engine`](Self::register_engine), but the callback only
    /// runs while `section` is active.
    pub fn register_engine_in_section<F>(&self, key: &str, section: &str, callback: F) -> EngineHandle
    where
        F: FnMut(&MotionState) -> anyhow::Result<()> + 'static,
    {
        EngineHandle(self.insert_engine(
            key,
            Some(Rc::from(section)),
            Rc::new(RefCell::new(callback)),
        ))
    }

    fn insert_engine(
        &self,
        key: &str,
        section: Option<Rc<str>>,
        callback: Rc<RefCell<EngineCallback>>,
    ) -> Registration {
        let key: Rc<str> = Rc::from(key);
        let Ok(mut r) = self.inner.try_borrow_mut() else {
            log::warn!("register_engine '{key}' while the registry is borrowed; ignored");
            return Registration::inert(ChannelKind::Engine, key);
        };
        if r.disposed {
            log::warn!("register_engine '{key}' on a disposed orchestrator; ignored");
            return Registration::inert(ChannelKind::Engine, key);
        }
        let generation = r.next_generation();
        let replaced = r.engines.insert(
            key.clone(),
            Slot {
                generation,
                section,
                callback,
            },
        );
        if replaced {
            log::debug!("engine '{key}' re-registered; previous callback replaced");
        }
        Registration {
            registry: Rc::downgrade(&self.inner),
            kind: ChannelKind::Engine,
            key,
            generation,
        }
    }

    /// Remove the engine registered under `key`. Absent keys are a no-op.
    pub fn unregister_engine(&self, key: &str) -> bool {
        match self.inner.try_borrow_mut() {
            Ok(mut r) => r.engines.remove(key),
            Err(_) => {
                log::warn!("unregister_engine '{key}' while the registry is borrowed");
                false
            }
        }
    }

    pub fn is_engine_registered(&self, key: &str) -> bool {
        self.inner.borrow().engines.slots.contains_key(key)
    }

    pub fn engine_count(&self) -> usize {
        self.inner.borrow().engines.len()
    }

    /// Invoke every active engine callback with this frame's state.
    ///
    /// The delivered state equals `state` except that `time` is held at the
    /// previous broadcast's value if it went backwards, and a running blessing
    /// wave overrides `blessing_wave_progress`. Callback order is unspecified.
    ///
    /// A callback's `Err` is logged and counted in `failed`. Panics are only
    /// caught where the target unwinds; on wasm32 a panic aborts the module,
    /// so engines there must fail through `Err`.
    pub fn broadcast(&self, state: MotionState) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let (frame_state, entries) = {
            let Ok(mut r) = self.inner.try_borrow_mut() else {
                log::warn!("re-entrant broadcast ignored");
                return report;
            };
            if r.disposed {
                return report;
            }
            let frame_state = r.prepare_frame(state);
            let Registry {
                engines,
                active_sections,
                ..
            } = &*r;
            let (entries, skipped) = engines.snapshot(|slot| match &slot.section {
                Some(section) => active_sections.contains(&**section),
                None => true,
            });
            report.skipped = skipped;
            (frame_state, entries)
        };

        for entry in entries {
            if !self.is_live(ChannelKind::Engine, &entry.key, entry.generation) {
                report.skipped += 1;
                continue;
            }
            let Ok(mut callback) = entry.callback.try_borrow_mut() else {
                log::warn!("engine '{}' is already running; skipped", entry.key);
                report.skipped += 1;
                continue;
            };
            match panic::catch_unwind(AssertUnwindSafe(|| (&mut *callback)(&frame_state))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    log::warn!("engine '{}' failed this frame: {e:#}", entry.key);
                    report.failed += 1;
                }
                Err(_) => {
                    log::warn!("engine '{}' panicked this frame", entry.key);
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// State delivered by the most recent broadcast.
    pub fn current(&self) -> MotionState {
        self.inner.borrow().current
    }

    fn is_live(&self, kind: ChannelKind, key: &str, generation: u64) -> bool {
        self.inner
            .try_borrow()
            .is_ok_and(|r| r.is_live(kind, key, generation))
    }

    // ---------------- Blessing wave ----------------

    /// Start a blessing wave at the current broadcast time. A wave already in
    /// flight is restarted with the new strength.
    pub fn trigger_blessing_wave(&self, strength: f32) {
        let Ok(mut r) = self.inner.try_borrow_mut() else {
            return;
        };
        if r.disposed {
            return;
        }
        let start = r.current.time;
        let duration = r.blessing_config.duration_sec;
        if r.blessing.is_some() {
            log::debug!("blessing wave restarted at t={start:.2}");
        }
        r.blessing = Some(BlessingWave::new(start, strength, duration));
    }

    pub fn is_blessing_wave_active(&self) -> bool {
        self.inner.borrow().blessing.is_some()
    }

    pub fn blessing_wave_progress(&self) -> f32 {
        self.inner.borrow().current.blessing_wave_progress
    }

    // ---------------- Scene events ----------------

    /// Register a handler for discrete scene events under `key`. Every handler
    /// sees every event and filters on [`SceneEvent::trigger`].
    pub fn register_scene_handler<F>(&self, key: &str, handler: F) -> SceneHandle
    where
        F: FnMut(&SceneEvent) -> anyhow::Result<()> + 'static,
    {
        let key: Rc<str> = Rc::from(key);
        let Ok(mut r) = self.inner.try_borrow_mut() else {
            return SceneHandle(Registration::inert(ChannelKind::Scene, key));
        };
        if r.disposed {
            log::warn!("register_scene_handler '{key}' on a disposed orchestrator; ignored");
            return SceneHandle(Registration::inert(ChannelKind::Scene, key));
        }
        let generation = r.next_generation();
        let callback: Rc<RefCell<SceneCallback>> = Rc::new(RefCell::new(handler));
        r.scene_handlers.insert(
            key.clone(),
            Slot {
                generation,
                section: None,
                callback,
            },
        );
        SceneHandle(Registration {
            registry: Rc::downgrade(&self.inner),
            kind: ChannelKind::Scene,
            key,
            generation,
        })
    }

    pub fn unregister_scene_handler(&self, key: &str) -> bool {
        self.inner
            .try_borrow_mut()
            .is_ok_and(|mut r| r.scene_handlers.remove(key))
    }

    /// Deliver `{ trigger, data }` to every scene handler. Returns how many
    /// handlers completed without error.
    pub fn emit_scene_event(&self, trigger: &str, data: EventData) -> usize {
        let entries = {
            let Ok(r) = self.inner.try_borrow() else {
                return 0;
            };
            if r.disposed {
                return 0;
            }
            r.scene_handlers.snapshot(|_| true).0
        };
        let event = SceneEvent {
            trigger: trigger.to_string(),
            data,
        };
        let mut delivered = 0;
        for entry in entries {
            if !self.is_live(ChannelKind::Scene, &entry.key, entry.generation) {
                continue;
            }
            let Ok(mut handler) = entry.callback.try_borrow_mut() else {
                continue;
            };
            match panic::catch_unwind(AssertUnwindSafe(|| (&mut *handler)(&event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => log::warn!("scene handler '{}' failed on '{trigger}': {e:#}", entry.key),
                Err(_) => log::warn!("scene handler '{}' panicked on '{trigger}'", entry.key),
            }
        }
        delivered
    }

    // ---------------- Section lifecycle ----------------

    pub fn subscribe_sections<F>(&self, key: &str, listener: F) -> SectionHandle
    where
        F: FnMut(&SectionEvent) + 'static,
    {
        let key: Rc<str> = Rc::from(key);
        let Ok(mut r) = self.inner.try_borrow_mut() else {
            return SectionHandle(Registration::inert(ChannelKind::Section, key));
        };
        if r.disposed {
            return SectionHandle(Registration::inert(ChannelKind::Section, key));
        }
        let generation = r.next_generation();
        let callback: Rc<RefCell<SectionCallback>> = Rc::new(RefCell::new(listener));
        r.section_listeners.insert(
            key.clone(),
            Slot {
                generation,
                section: None,
                callback,
            },
        );
        SectionHandle(Registration {
            registry: Rc::downgrade(&self.inner),
            kind: ChannelKind::Section,
            key,
            generation,
        })
    }

    /// Mark `id` as on screen. Returns true on an actual transition; entering
    /// an already active section is a no-op.
    pub fn on_section_enter(&self, id: &str) -> bool {
        let entered = match self.inner.try_borrow_mut() {
            Ok(mut r) if !r.disposed => r.active_sections.insert(id.to_string()),
            _ => false,
        };
        if entered {
            log::debug!("section '{id}' entered");
            self.notify_sections(SectionEvent::Enter(id.to_string()));
        }
        entered
    }

    /// Mark `id` as off screen. Returns true on an actual transition.
    pub fn on_section_exit(&self, id: &str) -> bool {
        let exited = match self.inner.try_borrow_mut() {
            Ok(mut r) if !r.disposed => r.active_sections.remove(id),
            _ => false,
        };
        if exited {
            log::debug!("section '{id}' exited");
            self.notify_sections(SectionEvent::Exit(id.to_string()));
        }
        exited
    }

    pub fn is_section_active(&self, id: &str) -> bool {
        self.inner.borrow().active_sections.contains(id)
    }

    fn notify_sections(&self, event: SectionEvent) {
        let entries = match self.inner.try_borrow() {
            Ok(r) => r.section_listeners.snapshot(|_| true).0,
            Err(_) => return,
        };
        for entry in entries {
            if !self.is_live(ChannelKind::Section, &entry.key, entry.generation) {
                continue;
            }
            let Ok(mut listener) = entry.callback.try_borrow_mut() else {
                continue;
            };
            if panic::catch_unwind(AssertUnwindSafe(|| (&mut *listener)(&event))).is_err() {
                log::warn!("section listener '{}' panicked", entry.key);
            }
        }
    }

    // ---------------- Teardown ----------------

    /// Drop every registration on every channel. Later registrations return
    /// inert handles and broadcasts do nothing.
    pub fn dispose(&self) {
        let Ok(mut r) = self.inner.try_borrow_mut() else {
            log::warn!("dispose while the registry is borrowed; ignored");
            return;
        };
        if r.disposed {
            return;
        }
        r.disposed = true;
        // callbacks are dropped after the borrow ends; their captures may
        // call back into the orchestrator
        let channels = (
            std::mem::take(&mut r.engines),
            std::mem::take(&mut r.scene_handlers),
            std::mem::take(&mut r.section_listeners),
        );
        r.active_sections.clear();
        r.blessing = None;
        drop(r);
        drop(channels);
        log::info!("motion orchestrator disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().disposed
    }
}

impl Registry {
    /// Enforce monotonic time and apply the blessing wave envelope.
    fn prepare_frame(&mut self, mut state: MotionState) -> MotionState {
        let last = self.last_time.unwrap_or(0.0);
        if !state.time.is_finite() || (self.last_time.is_some() && state.time < last) {
            log::debug!("broadcast time {:.3} held at {last:.3}", state.time);
            state.time = last;
        }
        self.last_time = Some(state.time);
        if let Some(wave) = self.blessing {
            if wave.is_finished(state.time) {
                self.blessing = None;
                state.blessing_wave_progress = 0.0;
            } else {
                state.blessing_wave_progress = wave.sample(state.time);
            }
        }
        self.current = state;
        state
    }
}

/// Build a fresh, independent orchestrator.
pub fn create_orchestrator() -> MotionOrchestrator {
    MotionOrchestrator::new()
}
