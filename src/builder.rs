//! SegueEngineBuilder for configuring the engine.

use std::sync::Arc;

use segue_core::{
    spawn_diagnostic_sink, Backend, CycleStats, Dispatcher, Patch, Scene, SceneSwitchHook,
    SceneTable,
};

use crate::{Result, SegueEngine};

/// Builder for [`SegueEngine`].
///
/// # Example
///
/// ```ignore
/// use segue::prelude::*;
///
/// let engine = SegueEngine::builder()
///     .backend(backend)
///     .scene(1, Scene::new(patch_a))
///     .scene(2, Scene::new(patch_b).with_init(init).with_exit(exit))
///     .verbose(true)
///     .build()?;
/// ```
pub struct SegueEngineBuilder {
    scenes: SceneTable,
    ctrl_patch: Option<Patch>,
    pre_patch: Option<Patch>,
    post_patch: Option<Patch>,
    processing_set: bool,
    hook: Option<Arc<dyn SceneSwitchHook>>,
    verbose: bool,
    instrumentation: bool,
    backend: Option<Arc<dyn Backend>>,
}

impl Default for SegueEngineBuilder {
    fn default() -> Self {
        Self {
            scenes: SceneTable::new(),
            ctrl_patch: None,
            pre_patch: None,
            post_patch: None,
            processing_set: false,
            hook: None,
            verbose: false,
            instrumentation: false,
            backend: None,
        }
    }
}

impl SegueEngineBuilder {
    /// The backend to dispatch for. Required.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Register a subscene under `id`. Calling this again with the same id
    /// appends further subscenes in order.
    pub fn scene(mut self, id: i32, scene: Scene) -> Self {
        self.scenes.add(id, scene);
        self
    }

    /// Install the ctrl/pre/post wrapper patches. The ctrl patch observes
    /// a copy of every event; pre and post wrap the matched patch. May be
    /// called at most once.
    pub fn processing(
        mut self,
        ctrl: Option<Patch>,
        pre: Option<Patch>,
        post: Option<Patch>,
    ) -> Self {
        assert!(
            !self.processing_set,
            "ctrl/pre/post patches may only be set once"
        );
        self.ctrl_patch = ctrl;
        self.pre_patch = pre;
        self.post_patch = post;
        self.processing_set = true;
        self
    }

    /// Scene-switch hook, consulted (outside the process mutex) before a
    /// pending switch is applied whenever more than one scene exists.
    pub fn hook(mut self, hook: impl SceneSwitchHook + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Emit diagnostics for events sanitize drops. Messages are formatted
    /// on a logger thread, never on the RT path.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Collect per-cycle timing statistics.
    pub fn instrumentation(mut self) -> Self {
        self.instrumentation = true;
        self
    }

    pub fn build(self) -> Result<SegueEngine> {
        let backend = self.backend.ok_or_else(|| {
            segue_core::Error::InvalidConfig("a backend is required".to_string())
        })?;

        let diagnostics = self.verbose.then(spawn_diagnostic_sink);
        let mut dispatcher =
            Dispatcher::new(self.scenes, backend.num_out_ports(), diagnostics);

        if self.processing_set {
            dispatcher.set_processing(
                self.ctrl_patch.map(Arc::new),
                self.pre_patch.map(Arc::new),
                self.post_patch.map(Arc::new),
            );
        }

        Ok(SegueEngine::from_parts(
            dispatcher,
            backend,
            self.hook,
            CycleStats::new(self.instrumentation),
        ))
    }
}
