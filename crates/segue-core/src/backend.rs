//! The backend contract and an in-process loopback implementation.

use std::collections::VecDeque;

use parking_lot::Mutex;
use segue_midi::MidiEvent;

use crate::error::Result;

/// Runs once on the backend's RT context before the first cycle.
pub type InitFn = Box<dyn FnOnce() + Send>;

/// Runs whenever the backend has inbound events.
pub type CycleFn = Box<dyn FnMut() + Send>;

/// The MIDI transport the engine dispatches for.
///
/// Contract: `start` hands the RT context two callbacks: `init` runs once
/// (the engine performs its first scene switch there), `cycle` runs
/// whenever input is available and drains it via `input_event`. `stop`
/// blocks until the RT context has exited. The output operations are
/// RT-safe appends to the outbound queue.
pub trait Backend: Send + Sync {
    fn start(&self, init: InitFn, cycle: CycleFn) -> Result<()>;

    /// Join the RT context; blocks until it has returned.
    fn stop(&self);

    /// Pop the next inbound event; `None` when the queue is empty.
    fn input_event(&self) -> Option<MidiEvent>;

    fn output_event(&self, ev: &MidiEvent);

    fn output_events(&self, events: &[MidiEvent]) {
        for ev in events {
            self.output_event(ev);
        }
    }

    fn num_out_ports(&self) -> usize;
}

/// Deterministic in-process backend for tests and offline evaluation.
///
/// Inputs are queued by hand, cycles are driven by hand, outputs are
/// captured. `start` runs `init` immediately on the calling thread.
pub struct LoopbackBackend {
    num_out_ports: usize,
    inputs: Mutex<VecDeque<MidiEvent>>,
    outputs: Mutex<Vec<MidiEvent>>,
    cycle: Mutex<Option<CycleFn>>,
}

impl LoopbackBackend {
    pub fn new(num_out_ports: usize) -> Self {
        Self {
            num_out_ports,
            inputs: Mutex::new(VecDeque::new()),
            outputs: Mutex::new(Vec::new()),
            cycle: Mutex::new(None),
        }
    }

    /// Queue an inbound event for the next driven cycle.
    pub fn push_input(&self, ev: MidiEvent) {
        self.inputs.lock().push_back(ev);
    }

    /// Invoke the engine's cycle callback, as the RT context would when
    /// input arrives. No-op before `start` or after `stop`.
    pub fn drive_cycle(&self) {
        if let Some(cycle) = self.cycle.lock().as_mut() {
            cycle();
        }
    }

    /// Take everything emitted so far.
    pub fn take_outputs(&self) -> Vec<MidiEvent> {
        std::mem::take(&mut self.outputs.lock())
    }
}

impl Backend for LoopbackBackend {
    fn start(&self, init: InitFn, cycle: CycleFn) -> Result<()> {
        *self.cycle.lock() = Some(cycle);
        init();
        Ok(())
    }

    fn stop(&self) {
        self.cycle.lock().take();
    }

    fn input_event(&self) -> Option<MidiEvent> {
        self.inputs.lock().pop_front()
    }

    fn output_event(&self, ev: &MidiEvent) {
        self.outputs.lock().push(ev.clone());
    }

    fn output_events(&self, events: &[MidiEvent]) {
        self.outputs.lock().extend_from_slice(events);
    }

    fn num_out_ports(&self) -> usize {
        self.num_out_ports
    }
}
