//! SegueEngine: backend wiring, entry points, and the process mutex.
//!
//! Three kinds of entry point touch dispatcher state: the backend's RT
//! cycle (`init`/`cycle` callbacks), deferred work on the engine's worker
//! thread (`run_async`), and synchronous calls from the control thread
//! (`process_event`, `switch_scene`, `output_event`). A single mutex
//! serializes them; every critical section is bounded work and the
//! scene-switch hook is always consulted with the mutex released.

use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};

use segue_core::{
    AsyncWorker, Backend, CycleFn, CycleStats, Dispatcher, EventBuffer, InitFn, SceneSwitchHook,
};
use segue_midi::MidiEvent;

use crate::Result;

/// Everything behind the process mutex: the dispatcher, the cycle buffer
/// it fills, and a reusable scratch vector for handing output to the
/// backend.
struct EngineState {
    dispatcher: Dispatcher,
    buffer: EventBuffer,
    scratch: Vec<MidiEvent>,
}

struct EngineInner {
    state: Mutex<EngineState>,
    backend: Arc<dyn Backend>,
    hook: Option<Arc<dyn SceneSwitchHook>>,
    stats: CycleStats,
}

/// The engine: owns the dispatcher, drives it from the backend, and
/// exposes the synchronous operations.
///
/// On drop the backend is stopped first (joining the RT context), then the
/// worker thread is joined, quiescing deferred work before state goes away.
pub struct SegueEngine {
    inner: Arc<EngineInner>,
    worker: AsyncWorker,
    epoch: Instant,
}

impl SegueEngine {
    /// Create a new engine builder.
    pub fn builder() -> crate::SegueEngineBuilder {
        crate::SegueEngineBuilder::default()
    }

    pub(crate) fn from_parts(
        dispatcher: Dispatcher,
        backend: Arc<dyn Backend>,
        hook: Option<Arc<dyn SceneSwitchHook>>,
        stats: CycleStats,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                state: Mutex::new(EngineState {
                    dispatcher,
                    buffer: EventBuffer::new(),
                    scratch: Vec::new(),
                }),
                backend,
                hook,
                stats,
            }),
            worker: AsyncWorker::spawn(),
            epoch: Instant::now(),
        }
    }

    /// Hand the backend its `init` and `cycle` callbacks and start the RT
    /// context. `init` performs the first scene switch; `initial_scene`
    /// of `-1` means the smallest registered scene id.
    ///
    /// Panics if no scenes are registered or if `initial_scene` names an
    /// unknown scene: both are programmer errors.
    pub fn start(&self, initial_scene: i32, initial_subscene: i32) -> Result<()> {
        let scene_count = self.inner.state.lock().dispatcher.scene_count();
        assert!(scene_count > 0, "no scenes registered before start");
        tracing::debug!("starting engine with {scene_count} scene(s)");

        let init_inner = Arc::downgrade(&self.inner);
        let cycle_inner = Arc::downgrade(&self.inner);

        let init: InitFn = Box::new(move || {
            if let Some(inner) = init_inner.upgrade() {
                run_init(&inner, initial_scene, initial_subscene);
            }
        });
        let cycle: CycleFn = Box::new(move || {
            if let Some(inner) = cycle_inner.upgrade() {
                run_cycle(&inner);
            }
        });

        self.inner.backend.start(init, cycle)?;
        Ok(())
    }

    /// Record a pending switch request; it takes effect no later than the
    /// next RT cycle (or immediately via [`SegueEngine::run_async`]).
    /// `-1` on either axis keeps that axis unchanged at switch time.
    pub fn switch_scene(&self, scene: i32, subscene: i32) {
        self.inner
            .state
            .lock()
            .dispatcher
            .switch_scene(scene, subscene);
    }

    /// Apply a pending scene switch now, on the calling thread, and emit
    /// the rite output. No-op when nothing is pending.
    pub fn run_async(&self) {
        run_async(&self.inner);
    }

    /// Run `f` with an [`EngineHandle`] on the engine's worker thread,
    /// then apply any scene switch it requested. Returns `false` if the
    /// worker has shut down.
    pub fn request_async(&self, f: impl FnOnce(EngineHandle) + Send + 'static) -> bool {
        let weak = Arc::downgrade(&self.inner);
        self.worker.request(move || {
            f(EngineHandle {
                inner: weak.clone(),
            });
            if let Some(inner) = weak.upgrade() {
                run_async(&inner);
            }
        })
    }

    /// Synchronous offline evaluation: run one cycle for `ev` against a
    /// throwaway buffer and return the resulting events. If no patch is
    /// active yet, the first subscene of scene 0 is adopted so stand-alone
    /// evaluation works without `start`.
    pub fn process_event(&self, ev: &MidiEvent) -> Vec<MidiEvent> {
        let inner = &self.inner;
        let mut buffer = EventBuffer::new();

        let mut st = inner.state.lock();
        st.dispatcher.ensure_current_patch();
        st = consult_hook(inner, st);
        st.dispatcher.process_scene_switch(&mut buffer);
        st.dispatcher.process(&mut buffer, ev);
        drop(st);

        buffer.iter().cloned().collect()
    }

    /// Bypass the pipeline and send `ev` directly to the backend.
    pub fn output_event(&self, ev: &MidiEvent) {
        let _st = self.inner.state.lock();
        self.inner.backend.output_event(ev);
    }

    pub fn current_scene(&self) -> i32 {
        self.inner.state.lock().dispatcher.current_scene()
    }

    pub fn current_subscene(&self) -> i32 {
        self.inner.state.lock().dispatcher.current_subscene()
    }

    /// Monotonic time in seconds since the engine was created.
    pub fn time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Cycle instrumentation; records only when enabled via the builder.
    pub fn stats(&self) -> &CycleStats {
        &self.inner.stats
    }

    /// A cloneable, non-owning handle for deferred work.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl Drop for SegueEngine {
    fn drop(&mut self) {
        // Stop the backend first: it blocks until the RT context has
        // exited. The worker joins afterwards (field drop order), so async
        // callbacks are quiesced before dispatcher state is destroyed.
        self.inner.backend.stop();
    }
}

/// Non-owning engine handle for scripted callbacks and deferred work.
///
/// Operations are no-ops returning `false` once the engine is gone.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Weak<EngineInner>,
}

impl EngineHandle {
    pub fn switch_scene(&self, scene: i32, subscene: i32) -> bool {
        match self.inner.upgrade() {
            Some(inner) => {
                inner.state.lock().dispatcher.switch_scene(scene, subscene);
                true
            }
            None => false,
        }
    }

    pub fn run_async(&self) -> bool {
        match self.inner.upgrade() {
            Some(inner) => {
                run_async(&inner);
                true
            }
            None => false,
        }
    }
}

/// First scene switch, run once on the RT context before any cycle.
fn run_init(inner: &Arc<EngineInner>, initial_scene: i32, initial_subscene: i32) {
    let mut st = inner.state.lock();

    // If no initial scene is specified, use the first one.
    let initial_scene = if initial_scene == -1 {
        match st.dispatcher.smallest_scene_id() {
            Some(id) => id,
            None => return,
        }
    } else {
        initial_scene
    };
    assert!(
        st.dispatcher.has_scene(initial_scene),
        "initial scene {initial_scene} is not registered"
    );

    st.buffer.clear();
    st.dispatcher.set_pending(initial_scene, initial_subscene);
    st = consult_hook(inner, st);
    {
        let EngineState {
            dispatcher, buffer, ..
        } = &mut *st;
        dispatcher.process_scene_switch(buffer);
    }
    emit(inner, &mut st);
}

/// One RT cycle: drain the backend's inbound queue, applying any pending
/// scene switch and then running the pipeline, per event.
///
/// The switch is applied first so its exit/init output precedes the
/// event's output and the event is routed by the scene it lands in.
fn run_cycle(inner: &Arc<EngineInner>) {
    while let Some(ev) = inner.backend.input_event() {
        let started = inner.stats.is_enabled().then(Instant::now);

        let mut st = inner.state.lock();
        st.buffer.clear();
        st = consult_hook(inner, st);
        {
            let EngineState {
                dispatcher, buffer, ..
            } = &mut *st;
            dispatcher.process_scene_switch(buffer);
            dispatcher.process(buffer, &ev);
        }
        emit(inner, &mut st);
        drop(st);

        if let Some(started) = started {
            inner.stats.record(started.elapsed());
        }
    }
}

/// Deferred entry point: apply a pending switch if the engine is idle.
fn run_async(inner: &Arc<EngineInner>) {
    let mut st = inner.state.lock();
    if st.dispatcher.pending_switch().is_none() {
        return;
    }
    st.buffer.clear();
    st = consult_hook(inner, st);
    {
        let EngineState {
            dispatcher, buffer, ..
        } = &mut *st;
        dispatcher.process_scene_switch(buffer);
    }
    emit(inner, &mut st);
}

/// Consult the scene-switch hook for a pending request, with the process
/// mutex released so the hook may re-enter `switch_scene`. The hook's
/// verdict replaces the pending request; it is only consulted when more
/// than one scene exists.
fn consult_hook<'a>(
    inner: &'a EngineInner,
    mut st: MutexGuard<'a, EngineState>,
) -> MutexGuard<'a, EngineState> {
    let Some((scene, subscene)) = st.dispatcher.pending_switch() else {
        return st;
    };
    if st.dispatcher.scene_count() <= 1 {
        return st;
    }
    let Some(hook) = inner.hook.clone() else {
        return st;
    };

    drop(st);
    let (scene, subscene) = hook.scene_switch(scene, subscene);
    st = inner.state.lock();
    st.dispatcher.set_pending(scene, subscene);
    st
}

/// Hand the buffer's live events to the backend, reusing the scratch
/// vector. Called with the process mutex held, like the rest of the cycle.
fn emit(inner: &EngineInner, st: &mut EngineState) {
    let EngineState {
        buffer, scratch, ..
    } = st;
    scratch.clear();
    scratch.extend(buffer.iter().cloned());
    inner.backend.output_events(scratch);
}
