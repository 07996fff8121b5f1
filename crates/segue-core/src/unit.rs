//! The processing-unit contract.

use crate::buffer::{EventBuffer, Range};

/// A single processing primitive applied to a range of buffered events.
///
/// A unit may mutate events in the range, insert new events inside it
/// (inserts land in the range because ranges extend to the live tail), or
/// consume events. When it returns, the range refers to the updated set of
/// the unit's events.
///
/// Units are shared immutably between scenes and tracking-table entries,
/// so implementations carry configuration, not per-event state.
pub trait Unit: Send + Sync {
    fn process(&self, buffer: &mut EventBuffer, range: Range);
}
