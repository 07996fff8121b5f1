//! The `MidiEvent` tagged variant and its constructors and predicates.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// System common messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SysCommonKind {
    QuarterFrame,
    SongPosition,
    SongSelect,
    TuneRequest,
}

/// System realtime messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SysRealtimeKind {
    Clock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    Reset,
}

/// Message payload of a [`MidiEvent`].
///
/// `Dummy` carries no attributes; the engine uses it internally to drive
/// init and exit patches during scene switches. It never leaves the engine:
/// sanitize drops it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    NoteOn { note: i32, velocity: i32 },
    NoteOff { note: i32, velocity: i32 },
    Ctrl { param: i32, value: i32 },
    PitchBend { value: i32 },
    Aftertouch { value: i32 },
    PolyAftertouch { note: i32, value: i32 },
    Program { value: i32 },
    /// Opaque byte buffer including the leading 0xF0 and trailing 0xF7.
    SysEx(Arc<[u8]>),
    SysCommon {
        kind: SysCommonKind,
        data1: i32,
        data2: i32,
    },
    SysRealtime(SysRealtimeKind),
    Dummy,
}

/// A single MIDI event as routed by the engine.
///
/// `port` indexes the backend's output ports. Both `port` and `channel` are
/// signed so that out-of-range values produced by processing units survive
/// until sanitize decides their fate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub port: i32,
    pub channel: i32,
    pub kind: EventKind,
}

impl MidiEvent {
    #[inline]
    pub fn note_on(port: i32, channel: i32, note: i32, velocity: i32) -> Self {
        Self {
            port,
            channel,
            kind: EventKind::NoteOn { note, velocity },
        }
    }

    #[inline]
    pub fn note_off(port: i32, channel: i32, note: i32, velocity: i32) -> Self {
        Self {
            port,
            channel,
            kind: EventKind::NoteOff { note, velocity },
        }
    }

    #[inline]
    pub fn ctrl(port: i32, channel: i32, param: i32, value: i32) -> Self {
        Self {
            port,
            channel,
            kind: EventKind::Ctrl { param, value },
        }
    }

    #[inline]
    pub fn pitch_bend(port: i32, channel: i32, value: i32) -> Self {
        Self {
            port,
            channel,
            kind: EventKind::PitchBend { value },
        }
    }

    #[inline]
    pub fn aftertouch(port: i32, channel: i32, value: i32) -> Self {
        Self {
            port,
            channel,
            kind: EventKind::Aftertouch { value },
        }
    }

    #[inline]
    pub fn poly_aftertouch(port: i32, channel: i32, note: i32, value: i32) -> Self {
        Self {
            port,
            channel,
            kind: EventKind::PolyAftertouch { note, value },
        }
    }

    #[inline]
    pub fn program(port: i32, channel: i32, value: i32) -> Self {
        Self {
            port,
            channel,
            kind: EventKind::Program { value },
        }
    }

    pub fn sysex(port: i32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            port,
            channel: 0,
            kind: EventKind::SysEx(data.into()),
        }
    }

    /// Internal event used to trigger init and exit patches.
    #[inline]
    pub fn dummy() -> Self {
        Self {
            port: 0,
            channel: 0,
            kind: EventKind::Dummy,
        }
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(self.kind, EventKind::NoteOn { .. })
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        matches!(self.kind, EventKind::NoteOff { .. })
    }

    #[inline]
    pub fn is_dummy(&self) -> bool {
        matches!(self.kind, EventKind::Dummy)
    }

    /// Note number for note and poly-aftertouch events.
    #[inline]
    pub fn note(&self) -> Option<i32> {
        match self.kind {
            EventKind::NoteOn { note, .. }
            | EventKind::NoteOff { note, .. }
            | EventKind::PolyAftertouch { note, .. } => Some(note),
            _ => None,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Option<i32> {
        match self.kind {
            EventKind::NoteOn { velocity, .. } | EventKind::NoteOff { velocity, .. } => {
                Some(velocity)
            }
            _ => None,
        }
    }

    /// Controller value for `Ctrl` events.
    #[inline]
    pub fn ctrl_value(&self) -> Option<i32> {
        match self.kind {
            EventKind::Ctrl { value, .. } => Some(value),
            _ => None,
        }
    }
}
