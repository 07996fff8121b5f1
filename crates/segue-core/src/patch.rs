//! Patch composition: units assembled into a processing graph.
//!
//! The dispatcher never inspects patch internals; it only applies a patch
//! to a buffer range.

use std::sync::Arc;

use crate::buffer::{EventBuffer, Range};
use crate::unit::Unit;
use segue_midi::MidiEvent;

/// Shared, immutable patch reference.
///
/// Patches are referenced by scenes and by tracking-table entries and
/// outlive any particular scene transition.
pub type PatchRef = Arc<Patch>;

/// A composition of processing units evaluated over a buffer range.
pub enum Patch {
    /// A single unit.
    Single(Arc<dyn Unit>),
    /// Members applied in order over the same (growing) range.
    Chain(Vec<Patch>),
    /// Each branch processes its own copy of the incoming events; the
    /// results are merged in branch order.
    Fork(Vec<Patch>),
}

impl Patch {
    pub fn unit(unit: impl Unit + 'static) -> Self {
        Patch::Single(Arc::new(unit))
    }

    pub fn chain(members: Vec<Patch>) -> Self {
        Patch::Chain(members)
    }

    pub fn fork(branches: Vec<Patch>) -> Self {
        Patch::Fork(branches)
    }

    /// Apply the patch to `range`. When this returns, the range covers the
    /// patch's output events.
    pub fn process(&self, buffer: &mut EventBuffer, range: Range) {
        match self {
            Patch::Single(unit) => unit.process(buffer, range),
            Patch::Chain(members) => {
                for member in members {
                    member.process(buffer, range);
                }
            }
            Patch::Fork(branches) => {
                let incoming: Vec<MidiEvent> = buffer.events_in(range).cloned().collect();
                for pos in buffer.positions_in(range) {
                    buffer.consume(pos);
                }
                for branch in branches {
                    let mut first = None;
                    for ev in &incoming {
                        let pos = buffer.append(ev.clone());
                        first.get_or_insert(pos);
                    }
                    if let Some(first) = first {
                        let sub = buffer.range(first);
                        branch.process(buffer, sub);
                    }
                }
            }
        }
    }
}
