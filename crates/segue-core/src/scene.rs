//! Scenes and the scene table.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::patch::{Patch, PatchRef};

/// One subscene: a main patch plus optional init and exit rites.
///
/// Immutable after construction; all patches are shared references.
#[derive(Clone)]
pub struct Scene {
    patch: PatchRef,
    init_patch: Option<PatchRef>,
    exit_patch: Option<PatchRef>,
}

impl Scene {
    pub fn new(patch: Patch) -> Self {
        Self {
            patch: Arc::new(patch),
            init_patch: None,
            exit_patch: None,
        }
    }

    /// Patch run (on a dummy event) after switching into this subscene.
    pub fn with_init(mut self, patch: Patch) -> Self {
        self.init_patch = Some(Arc::new(patch));
        self
    }

    /// Patch run (on a dummy event) before switching away from this subscene.
    pub fn with_exit(mut self, patch: Patch) -> Self {
        self.exit_patch = Some(Arc::new(patch));
        self
    }

    #[inline]
    pub fn patch(&self) -> &PatchRef {
        &self.patch
    }

    #[inline]
    pub fn init_patch(&self) -> Option<&PatchRef> {
        self.init_patch.as_ref()
    }

    #[inline]
    pub fn exit_patch(&self) -> Option<&PatchRef> {
        self.exit_patch.as_ref()
    }
}

/// Scene id → ordered subscenes. Ids need not be dense.
#[derive(Default)]
pub struct SceneTable {
    scenes: BTreeMap<i32, Vec<Scene>>,
}

impl SceneTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscene to `id`, creating the scene on first use.
    pub fn add(&mut self, id: i32, scene: Scene) {
        self.scenes.entry(id).or_default().push(scene);
    }

    #[inline]
    pub fn has_scene(&self, id: i32) -> bool {
        self.scenes.contains_key(&id)
    }

    /// Number of distinct scene ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Smallest registered scene id.
    pub fn smallest_id(&self) -> Option<i32> {
        self.scenes.keys().next().copied()
    }

    /// The subscene at (`id`, `index`), if both exist. Negative indices
    /// never match.
    pub fn subscene(&self, id: i32, index: i32) -> Option<&Scene> {
        let index = usize::try_from(index).ok()?;
        self.scenes.get(&id)?.get(index)
    }
}
