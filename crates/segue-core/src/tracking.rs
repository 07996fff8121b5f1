//! Note-on and sustain pinning tables.
//!
//! A stop event (note-off, sustain release) must travel through the same
//! patch as its matching start event, even if the active patch changed in
//! between. These tables pin that association.

use segue_midi::MidiEvent;

/// Capacity of the note-on pinning table.
pub const MAX_SIMULTANEOUS_NOTES: usize = 128;

/// Capacity of the sustain pinning table.
pub const MAX_SUSTAIN_PEDALS: usize = 16;

/// Key of a note-on/note-off pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteKey {
    pub channel: i32,
    pub note: i32,
    pub port: i32,
}

impl NoteKey {
    /// Key of a note event; `None` for anything else.
    pub fn of(ev: &MidiEvent) -> Option<Self> {
        ev.note().map(|note| Self {
            channel: ev.channel,
            note,
            port: ev.port,
        })
    }
}

/// Key of a sustain press/release pair.
///
/// Keyed per channel and input port only; half-pedal values (1..=126) are
/// not tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SustainKey {
    pub channel: i32,
    pub port: i32,
}

impl SustainKey {
    pub fn of(ev: &MidiEvent) -> Self {
        Self {
            channel: ev.channel,
            port: ev.port,
        }
    }
}

/// Fixed-capacity map with linear lookup, pre-sized so the dispatch path
/// does not allocate.
///
/// Insertion into a full map evicts the oldest entry. The invariant is the
/// capacity bound, not the eviction order.
pub struct BoundedMap<K, V> {
    entries: Vec<(K, V)>,
    capacity: usize,
}

impl<K: PartialEq + Copy, V> BoundedMap<K, V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert `value` under `key`. An existing entry for the same key is
    /// replaced; a full map evicts its oldest entry first.
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.remove(0);
        }
        self.entries.push((key, value));
    }

    /// Remove and return the entry for `key`.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }
}
