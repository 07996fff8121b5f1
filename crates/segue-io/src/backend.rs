//! `midir`-based backend: device enumeration, connection, and the RT
//! dispatch thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapCons, HeapRb,
};
use tracing::debug;

use crate::error::{Error, Result};
use segue_core::{Backend, CycleFn, InitFn};
use segue_midi::MidiEvent;

const DEFAULT_QUEUE_CAPACITY: usize = 1024;
const RT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Builder for [`MidirBackend`]: named input and output ports, matched by
/// case-insensitive substring.
pub struct MidirBackendBuilder {
    client_name: String,
    in_ports: Vec<String>,
    out_ports: Vec<String>,
    queue_capacity: usize,
}

impl Default for MidirBackendBuilder {
    fn default() -> Self {
        Self {
            client_name: "segue".to_string(),
            in_ports: Vec::new(),
            out_ports: Vec::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl MidirBackendBuilder {
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Open an input port whose name contains `name`. The port's index in
    /// call order becomes the event's input port number.
    pub fn input_port(mut self, name: impl Into<String>) -> Self {
        self.in_ports.push(name.into());
        self
    }

    /// Open an output port whose name contains `name`. The port's index in
    /// call order becomes the event's output port number.
    pub fn output_port(mut self, name: impl Into<String>) -> Self {
        self.out_ports.push(name.into());
        self
    }

    /// Capacity of each per-input ring buffer.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<MidirBackend> {
        // One pending token is enough to wake the RT thread; extra wakeups
        // coalesce.
        let (wake_tx, wake_rx) = bounded::<()>(1);

        let mut consumers = Vec::with_capacity(self.in_ports.len());
        let mut input_connections = Vec::with_capacity(self.in_ports.len());

        for (index, name) in self.in_ports.iter().enumerate() {
            let input = MidiInput::new(&self.client_name)?;
            let port = find_port(input.ports(), |p| input.port_name(p).ok(), name)?;

            let rb = HeapRb::<MidiEvent>::new(self.queue_capacity);
            let (mut producer, consumer) = rb.split();
            let wake = wake_tx.clone();
            let port_num = index as i32;

            let connection = input.connect(
                &port,
                "segue-in",
                move |_timestamp, bytes, _| {
                    if let Some(ev) = segue_midi::decode(port_num, bytes) {
                        if producer.try_push(ev).is_err() {
                            debug!("input queue full, event dropped (port {port_num})");
                        }
                        let _ = wake.try_send(());
                    }
                },
                (),
            )?;

            debug!("connected MIDI input {index}: {name}");
            consumers.push(consumer);
            input_connections.push(connection);
        }

        let mut outputs = Vec::with_capacity(self.out_ports.len());
        let mut out_names = Vec::with_capacity(self.out_ports.len());

        for (index, name) in self.out_ports.iter().enumerate() {
            let output = MidiOutput::new(&self.client_name)?;
            let port = find_port(output.ports(), |p| output.port_name(p).ok(), name)?;
            let port_name = output
                .port_name(&port)
                .unwrap_or_else(|_| format!("port {index}"));

            outputs.push(output.connect(&port, "segue-out")?);
            debug!("connected MIDI output {index}: {port_name}");
            out_names.push(port_name);
        }

        let num_out_ports = outputs.len();

        Ok(MidirBackend {
            consumers: Mutex::new(consumers),
            _inputs: Mutex::new(input_connections),
            outputs: Mutex::new(outputs),
            num_out_ports,
            out_port_names: ArcSwap::from_pointee(out_names),
            wake_tx,
            wake_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
            rt_thread: Mutex::new(None),
        })
    }
}

/// Backend over `midir` hardware/virtual ports.
pub struct MidirBackend {
    consumers: Mutex<Vec<HeapCons<MidiEvent>>>,
    _inputs: Mutex<Vec<MidiInputConnection<()>>>,
    outputs: Mutex<Vec<MidiOutputConnection>>,
    num_out_ports: usize,
    out_port_names: ArcSwap<Vec<String>>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    shutdown: Arc<AtomicBool>,
    rt_thread: Mutex<Option<JoinHandle<()>>>,
}

impl MidirBackend {
    pub fn builder() -> MidirBackendBuilder {
        MidirBackendBuilder::default()
    }

    /// Names of all input ports currently visible to the system.
    pub fn list_input_ports(client_name: &str) -> Result<Vec<String>> {
        let input = MidiInput::new(client_name)?;
        Ok(input
            .ports()
            .iter()
            .filter_map(|p| input.port_name(p).ok())
            .collect())
    }

    /// Names of all output ports currently visible to the system.
    pub fn list_output_ports(client_name: &str) -> Result<Vec<String>> {
        let output = MidiOutput::new(client_name)?;
        Ok(output
            .ports()
            .iter()
            .filter_map(|p| output.port_name(p).ok())
            .collect())
    }

    /// Names of the output ports this backend opened, in port order.
    pub fn out_port_names(&self) -> Arc<Vec<String>> {
        self.out_port_names.load_full()
    }
}

fn find_port<P>(
    ports: Vec<P>,
    port_name: impl Fn(&P) -> Option<String>,
    wanted: &str,
) -> Result<P> {
    let wanted_lower = wanted.to_lowercase();
    ports
        .into_iter()
        .find(|p| {
            port_name(p)
                .map(|n| n.to_lowercase().contains(&wanted_lower))
                .unwrap_or(false)
        })
        .ok_or_else(|| Error::PortNotFound(wanted.to_string()))
}

impl Backend for MidirBackend {
    fn start(&self, init: InitFn, mut cycle: CycleFn) -> segue_core::Result<()> {
        let mut rt_thread = self.rt_thread.lock();
        if rt_thread.is_some() {
            return Err(segue_core::Error::Backend(
                Error::AlreadyStarted.to_string(),
            ));
        }

        let wake_rx = self.wake_rx.clone();
        let shutdown = self.shutdown.clone();

        let handle = thread::Builder::new()
            .name("segue-rt".to_string())
            .spawn(move || {
                init();
                loop {
                    match wake_rx.recv_timeout(RT_POLL_INTERVAL) {
                        Ok(()) => {
                            if shutdown.load(Ordering::Acquire) {
                                break;
                            }
                            cycle();
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if shutdown.load(Ordering::Acquire) {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|e| segue_core::Error::Backend(e.to_string()))?;

        *rt_thread = Some(handle);
        Ok(())
    }

    fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.wake_tx.try_send(());
        if let Some(handle) = self.rt_thread.lock().take() {
            let _ = handle.join();
        }
    }

    fn input_event(&self) -> Option<MidiEvent> {
        let mut consumers = self.consumers.lock();
        for consumer in consumers.iter_mut() {
            if let Some(ev) = consumer.try_pop() {
                return Some(ev);
            }
        }
        None
    }

    fn output_event(&self, ev: &MidiEvent) {
        let Some(bytes) = segue_midi::encode(ev) else {
            return;
        };
        let mut outputs = self.outputs.lock();
        let connection = usize::try_from(ev.port)
            .ok()
            .and_then(|port| outputs.get_mut(port));
        match connection {
            Some(connection) => {
                if let Err(e) = connection.send(&bytes) {
                    debug!("MIDI send failed on port {}: {e}", ev.port);
                }
            }
            None => debug!("no output connection for port {}", ev.port),
        }
    }

    fn num_out_ports(&self) -> usize {
        self.num_out_ports
    }
}

impl Drop for MidirBackend {
    fn drop(&mut self) {
        self.stop();
    }
}
