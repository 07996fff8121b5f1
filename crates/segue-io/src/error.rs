//! Error types for the hardware MIDI backend.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI device error: {0}")]
    Device(String),

    #[error("MIDI port error: {0}")]
    Port(String),

    #[error("no MIDI port found matching '{0}'")]
    PortNotFound(String),

    #[error("backend already started")]
    AlreadyStarted,
}

impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::Device(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::Port(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::Port(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
