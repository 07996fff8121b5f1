//! Per-event pipeline and the scene-switch state machine.
//!
//! The dispatcher is the single-threaded core the engine serializes behind
//! its process mutex. Per event it selects a patch (pinning note-offs and
//! sustain releases to the patch of their start event), runs the
//! ctrl/pre/patch/post/sanitize pipeline into the cycle buffer, and applies
//! pending scene switches with exit/init rites.

use segue_midi::{EventKind, MidiEvent, CTRL_SUSTAIN};

use crate::buffer::EventBuffer;
use crate::patch::PatchRef;
use crate::sanitize::{DiagnosticTx, Sanitize};
use crate::scene::SceneTable;
use crate::tracking::{
    BoundedMap, NoteKey, SustainKey, MAX_SIMULTANEOUS_NOTES, MAX_SUSTAIN_PEDALS,
};
use crate::Patch;

/// Scene/patch dispatch state.
pub struct Dispatcher {
    scenes: SceneTable,

    current_patch: Option<PatchRef>,
    current_scene: i32,
    current_subscene: i32,
    new_scene: i32,
    new_subscene: i32,

    noteon_patches: BoundedMap<NoteKey, PatchRef>,
    sustain_patches: BoundedMap<SustainKey, PatchRef>,

    sanitize_patch: PatchRef,
    ctrl_patch: Option<PatchRef>,
    pre_patch: Option<PatchRef>,
    post_patch: Option<PatchRef>,
}

impl Dispatcher {
    pub fn new(scenes: SceneTable, num_out_ports: usize, diagnostics: Option<DiagnosticTx>) -> Self {
        Self {
            scenes,
            current_patch: None,
            current_scene: -1,
            current_subscene: -1,
            new_scene: -1,
            new_subscene: -1,
            noteon_patches: BoundedMap::with_capacity(MAX_SIMULTANEOUS_NOTES),
            sustain_patches: BoundedMap::with_capacity(MAX_SUSTAIN_PEDALS),
            sanitize_patch: PatchRef::new(Patch::unit(Sanitize::new(num_out_ports, diagnostics))),
            ctrl_patch: None,
            pre_patch: None,
            post_patch: None,
        }
    }

    /// Install the ctrl/pre/post wrapper patches. May be called at most
    /// once, before dispatch begins; re-setting is programmer error.
    pub fn set_processing(
        &mut self,
        ctrl_patch: Option<PatchRef>,
        pre_patch: Option<PatchRef>,
        post_patch: Option<PatchRef>,
    ) {
        assert!(
            self.ctrl_patch.is_none() && self.pre_patch.is_none() && self.post_patch.is_none(),
            "ctrl/pre/post patches may only be set once"
        );
        self.ctrl_patch = ctrl_patch;
        self.pre_patch = pre_patch;
        self.post_patch = post_patch;
    }

    #[inline]
    pub fn current_scene(&self) -> i32 {
        self.current_scene
    }

    #[inline]
    pub fn current_subscene(&self) -> i32 {
        self.current_subscene
    }

    #[inline]
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    #[inline]
    pub fn has_scene(&self, id: i32) -> bool {
        self.scenes.has_scene(id)
    }

    pub fn smallest_scene_id(&self) -> Option<i32> {
        self.scenes.smallest_id()
    }

    /// Record a pending switch request. `-1` on either axis means "keep
    /// that axis unchanged at switch time".
    pub fn switch_scene(&mut self, scene: i32, subscene: i32) {
        if scene != -1 {
            self.new_scene = scene;
        }
        if subscene != -1 {
            self.new_subscene = subscene;
        }
    }

    /// The pending (scene, subscene) request, if any.
    pub fn pending_switch(&self) -> Option<(i32, i32)> {
        if self.new_scene != -1 || self.new_subscene != -1 {
            Some((self.new_scene, self.new_subscene))
        } else {
            None
        }
    }

    /// Overwrite the pending request wholesale (both axes). Used to apply
    /// the scene-switch hook's verdict; `(-1, -1)` clears the request.
    pub fn set_pending(&mut self, scene: i32, subscene: i32) {
        self.new_scene = scene;
        self.new_subscene = subscene;
    }

    /// Make sure some patch is active for stand-alone evaluation: adopt
    /// the first subscene of scene 0, or of the smallest scene id if no
    /// scene 0 exists.
    pub fn ensure_current_patch(&mut self) {
        if self.current_patch.is_some() {
            return;
        }
        let id = if self.scenes.has_scene(0) {
            Some(0)
        } else {
            self.scenes.smallest_id()
        };
        if let Some(id) = id {
            if let Some(scene) = self.scenes.subscene(id, 0) {
                self.current_patch = Some(scene.patch().clone());
            }
        }
    }

    /// Run one inbound event through the pipeline, appending its output to
    /// `buffer` (after any scene-rite output already present).
    pub fn process(&mut self, buffer: &mut EventBuffer, ev: &MidiEvent) {
        let Some(patch) = self.matching_patch(ev) else {
            // No scene transition has completed yet; nothing to route with.
            return;
        };

        // The ctrl patch observes a copy of every event; its output is
        // emitted but not what downstream patches process.
        if let Some(ctrl_patch) = self.ctrl_patch.clone() {
            let pos = buffer.append(ev.clone());
            let full = buffer.range(pos);
            ctrl_patch.process(buffer, full);
        }

        // The main copy anchors the live range the pipeline owns.
        let pos = buffer.append(ev.clone());
        let range = buffer.range(pos);

        if let Some(pre_patch) = self.pre_patch.clone() {
            pre_patch.process(buffer, range);
        }

        patch.process(buffer, range);

        if let Some(post_patch) = self.post_patch.clone() {
            post_patch.process(buffer, range);
        }

        self.sanitize_patch.process(buffer, range);
    }

    /// Select the patch for `ev`, maintaining the pinning tables.
    fn matching_patch(&mut self, ev: &MidiEvent) -> Option<PatchRef> {
        let current = self.current_patch.clone()?;

        match ev.kind {
            // Note on: pin the current patch for the matching note off.
            EventKind::NoteOn { .. } => {
                if let Some(key) = NoteKey::of(ev) {
                    self.noteon_patches.insert(key, current.clone());
                }
                Some(current)
            }
            // Note off: retrieve and remove the pinned patch; unmatched
            // note offs fall through to the current patch and never create
            // an entry.
            EventKind::NoteOff { .. } => {
                let pinned = NoteKey::of(ev).and_then(|key| self.noteon_patches.remove(&key));
                Some(pinned.unwrap_or(current))
            }
            // Sustain pressed.
            // TODO: handle half-pedal (values 1..=126) correctly
            EventKind::Ctrl {
                param: CTRL_SUSTAIN,
                value: 127,
            } => {
                self.sustain_patches.insert(SustainKey::of(ev), current.clone());
                Some(current)
            }
            // Sustain released.
            EventKind::Ctrl {
                param: CTRL_SUSTAIN,
                value: 0,
            } => {
                let pinned = self.sustain_patches.remove(&SustainKey::of(ev));
                Some(pinned.unwrap_or(current))
            }
            _ => Some(current),
        }
    }

    /// Consume a pending switch request: run the old subscene's exit patch,
    /// then the new subscene's init patch, then activate the target.
    ///
    /// Invalid targets clear the request and change nothing else. The
    /// scene-switch hook is the engine's concern and has already been
    /// consulted by the time this runs.
    pub fn process_scene_switch(&mut self, buffer: &mut EventBuffer) {
        if self.new_scene == -1 && self.new_subscene == -1 {
            return;
        }

        let scene_num = if self.new_scene != -1 {
            self.new_scene
        } else {
            self.current_scene
        };
        let subscene_num = if self.new_subscene != -1 {
            self.new_subscene
        } else {
            0
        };

        if let Some(target) = self.scenes.subscene(scene_num, subscene_num) {
            let target_patch = target.patch().clone();
            let init_patch = target.init_patch().cloned();

            // Exit rite of the still-current subscene runs first.
            if self.current_scene != -1 {
                let exit_patch = self
                    .scenes
                    .subscene(self.current_scene, self.current_subscene)
                    .and_then(|scene| scene.exit_patch().cloned());
                if let Some(exit_patch) = exit_patch {
                    self.run_rite(buffer, &exit_patch);
                }
            }

            if let Some(init_patch) = init_patch {
                self.run_rite(buffer, &init_patch);
            }

            self.current_patch = Some(target_patch);
            self.current_scene = scene_num;
            self.current_subscene = subscene_num;
        }

        self.new_scene = -1;
        self.new_subscene = -1;
    }

    /// Drive an init or exit patch with a dummy event. Post and sanitize
    /// wrap the rite; pre and ctrl do not apply to dummy events.
    fn run_rite(&self, buffer: &mut EventBuffer, patch: &PatchRef) {
        let pos = buffer.append(MidiEvent::dummy());
        let range = buffer.range(pos);

        patch.process(buffer, range);

        if let Some(post_patch) = &self.post_patch {
            post_patch.process(buffer, range);
        }
        self.sanitize_patch.process(buffer, range);
    }
}
