//! The final validation and clamp stage of every pipeline run.
//!
//! Sanitize decides keep/drop per event and clamps numeric fields back into
//! MIDI ranges. Diagnostics never touch the RT path: the unit pushes a
//! small enum into a bounded channel and a dedicated logger thread does the
//! formatting. A full channel drops the diagnostic, never the cycle.

use std::thread;

use crossbeam_channel::{bounded, Sender};

use crate::buffer::{EventBuffer, Range};
use crate::unit::Unit;
use segue_midi::{EventKind, MidiEvent};

const DIAGNOSTIC_QUEUE_CAPACITY: usize = 256;

/// Why sanitize dropped an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    InvalidPort,
    InvalidChannel,
    InvalidNoteNumber,
    InvalidCtrlParam,
    InvalidProgram,
    InvalidSysEx,
}

impl Diagnostic {
    fn message(self) -> &'static str {
        match self {
            Diagnostic::InvalidPort => "invalid output port, event discarded",
            Diagnostic::InvalidChannel => "invalid channel, event discarded",
            Diagnostic::InvalidNoteNumber => "invalid note number, event discarded",
            Diagnostic::InvalidCtrlParam => "invalid controller number, event discarded",
            Diagnostic::InvalidProgram => "invalid program number, event discarded",
            Diagnostic::InvalidSysEx => "invalid sysex, event discarded",
        }
    }
}

/// RT-safe producer handle for sanitize diagnostics.
#[derive(Clone)]
pub struct DiagnosticTx {
    tx: Sender<Diagnostic>,
}

impl DiagnosticTx {
    #[inline]
    fn report(&self, diagnostic: Diagnostic) {
        // Drop on overflow; the RT thread never blocks here.
        let _ = self.tx.try_send(diagnostic);
    }
}

/// Spawn the diagnostics logger thread and return the producer handle.
///
/// The thread exits when the last producer is dropped.
pub fn spawn_diagnostic_sink() -> DiagnosticTx {
    let (tx, rx) = bounded::<Diagnostic>(DIAGNOSTIC_QUEUE_CAPACITY);
    thread::Builder::new()
        .name("segue-diagnostics".to_string())
        .spawn(move || {
            while let Ok(diagnostic) = rx.recv() {
                tracing::warn!("{}", diagnostic.message());
            }
        })
        .expect("failed to spawn diagnostics thread");
    DiagnosticTx { tx }
}

/// The validation unit applied as the last stage of every pipeline run.
pub struct Sanitize {
    num_out_ports: usize,
    diagnostics: Option<DiagnosticTx>,
}

impl Sanitize {
    /// `diagnostics` is `None` unless verbose mode is on; without it no
    /// messages are produced at all.
    pub fn new(num_out_ports: usize, diagnostics: Option<DiagnosticTx>) -> Self {
        Self {
            num_out_ports,
            diagnostics,
        }
    }

    fn report(&self, diagnostic: Diagnostic) {
        if let Some(tx) = &self.diagnostics {
            tx.report(diagnostic);
        }
    }

    /// Clamp `ev` into range, or decide to drop it.
    fn sanitize_event(&self, ev: &mut MidiEvent) -> bool {
        if ev.port < 0 || ev.port as usize >= self.num_out_ports {
            // Omit the rather pointless warning if there are no output
            // ports at all.
            if self.num_out_ports > 0 {
                self.report(Diagnostic::InvalidPort);
            }
            return false;
        }

        if !(0..16).contains(&ev.channel) {
            self.report(Diagnostic::InvalidChannel);
            return false;
        }

        match &mut ev.kind {
            EventKind::NoteOn { note, velocity } | EventKind::NoteOff { note, velocity } => {
                if !(0..=127).contains(note) {
                    self.report(Diagnostic::InvalidNoteNumber);
                    return false;
                }
                *velocity = (*velocity).clamp(0, 127);
                true
            }
            EventKind::Ctrl { param, value } => {
                if !(0..=127).contains(param) {
                    self.report(Diagnostic::InvalidCtrlParam);
                    return false;
                }
                *value = (*value).clamp(0, 127);
                true
            }
            EventKind::PitchBend { value } => {
                *value = (*value).clamp(-8192, 8191);
                true
            }
            EventKind::Aftertouch { value } => {
                *value = (*value).clamp(0, 127);
                true
            }
            EventKind::Program { value } => {
                if !(0..=127).contains(value) {
                    self.report(Diagnostic::InvalidProgram);
                    return false;
                }
                true
            }
            EventKind::SysEx(data) => {
                if data.len() < 2 || data[0] != 0xF0 || data[data.len() - 1] != 0xF7 {
                    self.report(Diagnostic::InvalidSysEx);
                    return false;
                }
                true
            }
            EventKind::PolyAftertouch { .. }
            | EventKind::SysCommon { .. }
            | EventKind::SysRealtime(_) => true,
            EventKind::Dummy => false,
        }
    }
}

impl Unit for Sanitize {
    fn process(&self, buffer: &mut EventBuffer, range: Range) {
        for pos in buffer.positions_in(range) {
            let keep = match buffer.get_mut(pos) {
                Some(ev) => self.sanitize_event(ev),
                None => continue,
            };
            if !keep {
                buffer.consume(pos);
            }
        }
    }
}
