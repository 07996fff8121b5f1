//! Centralized error type for the segue umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate
//! boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] segue_core::Error),

    #[cfg(feature = "midi-io")]
    #[error("MIDI I/O: {0}")]
    Io(#[from] segue_io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
