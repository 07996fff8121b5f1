//! Hardware MIDI backend for the segue routing engine.
//!
//! Implements the engine's backend contract over `midir`: inbound bytes are
//! decoded in the driver callback and pushed through per-port SPSC ring
//! buffers to a dedicated `segue-rt` thread, which runs the engine's cycle;
//! outbound events are encoded and sent on the opened output connections.

pub mod error;
pub use error::{Error, Result};

mod backend;
pub use backend::{MidirBackend, MidirBackendBuilder};
