//! Dispatch core for the segue routing engine.
//!
//! This crate owns everything between the backend and the unit library:
//! the event buffer with stable positions, the unit/patch protocol, the
//! scene table, the note-on/sustain pinning tables, the per-event pipeline
//! (ctrl → pre → matched patch → post → sanitize) and the scene-switch
//! state machine with exit/init rites.
//!
//! # Concurrency
//!
//! The dispatcher itself is single-threaded by contract: the engine wraps
//! it in one process mutex and every entry point (RT cycle, async deferred
//! work, synchronous queries) holds that mutex for a full bounded cycle.
//! Nothing in here blocks or suspends inside the critical section.

pub mod error;
pub use error::{Error, Result};

mod buffer;
pub use buffer::{EventBuffer, Pos, Range};

mod unit;
pub use unit::Unit;

pub mod units;

mod patch;
pub use patch::{Patch, PatchRef};

mod scene;
pub use scene::{Scene, SceneTable};

mod tracking;
pub use tracking::{
    BoundedMap, NoteKey, SustainKey, MAX_SIMULTANEOUS_NOTES, MAX_SUSTAIN_PEDALS,
};

mod sanitize;
pub use sanitize::{spawn_diagnostic_sink, Diagnostic, DiagnosticTx, Sanitize};

mod dispatcher;
pub use dispatcher::Dispatcher;

mod backend;
pub use backend::{Backend, CycleFn, InitFn, LoopbackBackend};

mod hook;
pub use hook::SceneSwitchHook;

mod worker;
pub use worker::AsyncWorker;

mod stats;
pub use stats::{CycleMetrics, CycleStats};
