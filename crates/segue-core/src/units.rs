//! A small library of processing units.
//!
//! These cover the common routing cases (filter, transpose, re-route) and
//! give init/exit patches something to emit. More elaborate units live with
//! the applications that need them; everything here goes through the same
//! [`Unit`] contract the dispatcher sees.

use crate::buffer::{EventBuffer, Range};
use crate::unit::Unit;
use segue_midi::{EventKind, MidiEvent};

/// Passes every event through unchanged.
pub struct Pass;

impl Unit for Pass {
    fn process(&self, _buffer: &mut EventBuffer, _range: Range) {}
}

/// Consumes every event.
pub struct Discard;

impl Unit for Discard {
    fn process(&self, buffer: &mut EventBuffer, range: Range) {
        for pos in buffer.positions_in(range) {
            buffer.consume(pos);
        }
    }
}

/// Filters by event kind; disabled categories are consumed.
///
/// Dummy events always pass so that init/exit rites survive filtering.
pub struct KindFilter {
    pub notes: bool,
    pub ctrl: bool,
    pub pitch_bend: bool,
    pub aftertouch: bool,
    pub program: bool,
    pub system: bool,
}

impl Default for KindFilter {
    fn default() -> Self {
        Self {
            notes: true,
            ctrl: true,
            pitch_bend: true,
            aftertouch: true,
            program: true,
            system: true,
        }
    }
}

impl KindFilter {
    fn passes(&self, ev: &MidiEvent) -> bool {
        match ev.kind {
            EventKind::NoteOn { .. }
            | EventKind::NoteOff { .. }
            | EventKind::PolyAftertouch { .. } => self.notes,
            EventKind::Ctrl { .. } => self.ctrl,
            EventKind::PitchBend { .. } => self.pitch_bend,
            EventKind::Aftertouch { .. } => self.aftertouch,
            EventKind::Program { .. } => self.program,
            EventKind::SysEx(_) | EventKind::SysCommon { .. } | EventKind::SysRealtime(_) => {
                self.system
            }
            EventKind::Dummy => true,
        }
    }
}

impl Unit for KindFilter {
    fn process(&self, buffer: &mut EventBuffer, range: Range) {
        for pos in buffer.positions_in(range) {
            let keep = buffer.get(pos).map(|ev| self.passes(ev)).unwrap_or(false);
            if !keep {
                buffer.consume(pos);
            }
        }
    }
}

/// Filters by channel; events on other channels are consumed.
pub struct ChannelFilter {
    channels: [bool; 16],
}

impl ChannelFilter {
    pub fn only(channels: &[i32]) -> Self {
        let mut mask = [false; 16];
        for &ch in channels {
            if (0..16).contains(&ch) {
                mask[ch as usize] = true;
            }
        }
        Self { channels: mask }
    }

    fn passes(&self, ev: &MidiEvent) -> bool {
        if ev.is_dummy() {
            return true;
        }
        (0..16).contains(&ev.channel) && self.channels[ev.channel as usize]
    }
}

impl Unit for ChannelFilter {
    fn process(&self, buffer: &mut EventBuffer, range: Range) {
        for pos in buffer.positions_in(range) {
            let keep = buffer.get(pos).map(|ev| self.passes(ev)).unwrap_or(false);
            if !keep {
                buffer.consume(pos);
            }
        }
    }
}

/// Shifts note numbers; other events pass unchanged.
pub struct Transpose {
    offset: i32,
}

impl Transpose {
    pub fn new(offset: i32) -> Self {
        Self { offset }
    }
}

impl Unit for Transpose {
    fn process(&self, buffer: &mut EventBuffer, range: Range) {
        for pos in buffer.positions_in(range) {
            if let Some(ev) = buffer.get_mut(pos) {
                match &mut ev.kind {
                    EventKind::NoteOn { note, .. }
                    | EventKind::NoteOff { note, .. }
                    | EventKind::PolyAftertouch { note, .. } => *note += self.offset,
                    _ => {}
                }
            }
        }
    }
}

/// Rewrites the output port of every event.
pub struct SetPort {
    port: i32,
}

impl SetPort {
    pub fn new(port: i32) -> Self {
        Self { port }
    }
}

impl Unit for SetPort {
    fn process(&self, buffer: &mut EventBuffer, range: Range) {
        for pos in buffer.positions_in(range) {
            if let Some(ev) = buffer.get_mut(pos) {
                ev.port = self.port;
            }
        }
    }
}

/// Rewrites the channel of every event.
pub struct SetChannel {
    channel: i32,
}

impl SetChannel {
    pub fn new(channel: i32) -> Self {
        Self { channel }
    }
}

impl Unit for SetChannel {
    fn process(&self, buffer: &mut EventBuffer, range: Range) {
        for pos in buffer.positions_in(range) {
            if let Some(ev) = buffer.get_mut(pos) {
                ev.channel = self.channel;
            }
        }
    }
}

/// Rewrites each event into a fixed control change, keeping its port.
///
/// This is the building block of init and exit patches: the dummy event
/// that drives a scene rite becomes a concrete controller message.
pub struct GenerateCtrl {
    channel: i32,
    param: i32,
    value: i32,
}

impl GenerateCtrl {
    pub fn new(channel: i32, param: i32, value: i32) -> Self {
        Self {
            channel,
            param,
            value,
        }
    }
}

impl Unit for GenerateCtrl {
    fn process(&self, buffer: &mut EventBuffer, range: Range) {
        for pos in buffer.positions_in(range) {
            if let Some(ev) = buffer.get_mut(pos) {
                ev.channel = self.channel;
                ev.kind = EventKind::Ctrl {
                    param: self.param,
                    value: self.value,
                };
            }
        }
    }
}
