//! # Segue - Scene-based MIDI Routing Engine
//!
//! Real-time dispatch core for MIDI routing and transformation. Musicians
//! configure *scenes*; each scene defines how incoming events are rewritten,
//! split, merged, filtered, or generated before being emitted.
//!
//! ## Architecture
//!
//! Segue is an umbrella crate that coordinates:
//! - **segue-core** - Dispatch core (buffer, patches, scenes, pinning
//!   tables, scene-switch state machine, sanitize)
//! - **segue-midi** - MIDI event model and raw byte codecs
//! - **segue-io** - Hardware MIDI backend over `midir` (feature `midi-io`)
//!
//! Per inbound event the dispatcher selects a patch (pinning note-offs and
//! sustain releases to the patch of their matching start event) and runs
//! the ctrl → pre → patch → post → sanitize pipeline into the cycle buffer.
//! Scene switches run the old subscene's exit patch, then the new one's
//! init patch, before activating the target.
//!
//! ## Quick Start
//!
//! ```ignore
//! use segue::prelude::*;
//! use std::sync::Arc;
//!
//! let backend = Arc::new(
//!     segue::io::MidirBackend::builder()
//!         .input_port("Keyboard")
//!         .output_port("Synth A")
//!         .output_port("Synth B")
//!         .build()?,
//! );
//!
//! let engine = SegueEngine::builder()
//!     .backend(backend)
//!     .scene(1, Scene::new(Patch::unit(units::SetPort::new(0))))
//!     .scene(2, Scene::new(Patch::unit(units::SetPort::new(1))))
//!     .build()?;
//!
//! engine.start(-1, -1)?;           // activate the smallest scene id
//! engine.switch_scene(2, -1);      // takes effect on the next cycle
//! ```
//!
//! ## Concurrency
//!
//! One process mutex serializes dispatcher state between the backend's RT
//! cycle, deferred work on the engine's worker thread, and synchronous
//! calls such as [`SegueEngine::process_event`]. Every critical section is
//! bounded; scene-switch hooks run outside the lock.

/// Re-export of segue-core for direct access.
pub use segue_core as core;

pub use segue_core::{
    // Backend contract
    Backend,
    BoundedMap,
    CycleMetrics,
    // Instrumentation
    CycleStats,
    // Buffer
    EventBuffer,
    LoopbackBackend,
    // Patches and units
    Patch,
    PatchRef,
    Pos,
    Range,
    // Scenes
    Scene,
    SceneSwitchHook,
    SceneTable,
    Unit,
};

/// The unit library.
pub use segue_core::units;

/// Re-export of segue-midi for direct access.
pub use segue_midi as midi;

pub use segue_midi::{EventKind, MidiEvent, SysCommonKind, SysRealtimeKind, CTRL_SUSTAIN};

/// Hardware MIDI I/O (feature `midi-io`).
#[cfg(feature = "midi-io")]
pub use segue_io as io;

#[cfg(feature = "midi-io")]
pub use segue_io::{MidirBackend, MidirBackendBuilder};

mod builder;
mod engine;
mod error;

pub use builder::SegueEngineBuilder;
pub use engine::{EngineHandle, SegueEngine};
pub use error::{Error, Result};

/// Convenience prelude for common imports.
pub mod prelude {
    pub use crate::{Patch, Scene, SegueEngine, SegueEngineBuilder};

    pub use crate::units;
    pub use crate::{Backend, LoopbackBackend};
    pub use crate::{EventKind, MidiEvent};
}
