//! Shared helpers for integration tests.

#![allow(dead_code)]

use osc_receiver::{
    OscBundle, OscMessage, OscPacket, OscReceiver, OscTime, OscType, PacketSink, ReceiverBackend,
    ReceiverConfig, Result,
};
use parking_lot::Mutex;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Backend with no socket: packets are fed through the receiver directly.
#[derive(Default)]
pub struct StubBackend {
    sink: Option<PacketSink>,
    running: bool,
}

impl ReceiverBackend for StubBackend {
    fn connect(
        &mut self,
        _host: &str,
        _port: u16,
        _multicast: Option<Ipv4Addr>,
        sink: PacketSink,
    ) -> Result<()> {
        self.sink = Some(sink);
        self.running = true;
        Ok(())
    }

    fn close(&mut self) {
        self.sink = None;
        self.running = false;
    }

    fn is_available(&self) -> bool {
        self.sink.is_some()
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

/// Endpoint a backend was asked to connect to.
pub type Endpoint = (String, u16, Option<Ipv4Addr>);

/// Stub backend that records every connect and counts closes.
#[derive(Clone, Default)]
pub struct CountingBackend {
    pub connects: Arc<Mutex<Vec<Endpoint>>>,
    pub closes: Arc<AtomicUsize>,
    sink: Option<PacketSink>,
}

impl CountingBackend {
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().len()
    }

    pub fn last_endpoint(&self) -> Option<Endpoint> {
        self.connects.lock().last().cloned()
    }
}

impl ReceiverBackend for CountingBackend {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        multicast: Option<Ipv4Addr>,
        sink: PacketSink,
    ) -> Result<()> {
        self.connects.lock().push((host.to_string(), port, multicast));
        self.sink = Some(sink);
        Ok(())
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.sink = None;
    }

    fn is_available(&self) -> bool {
        self.sink.is_some()
    }

    fn is_running(&self) -> bool {
        self.sink.is_some()
    }
}

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

pub fn started_receiver(config: ReceiverConfig) -> Arc<OscReceiver> {
    init_tracing();
    let receiver = OscReceiver::with_backend(config, Box::new(StubBackend::default()));
    receiver.connect().unwrap();
    Arc::new(receiver)
}

pub fn message(addr: &str) -> OscPacket {
    OscPacket::Message(OscMessage {
        addr: addr.to_string(),
        args: vec![],
    })
}

pub fn message_with(addr: &str, value: i32) -> OscPacket {
    OscPacket::Message(OscMessage {
        addr: addr.to_string(),
        args: vec![OscType::Int(value)],
    })
}

pub fn bundle(content: Vec<OscPacket>) -> OscPacket {
    OscPacket::Bundle(OscBundle {
        timetag: OscTime {
            seconds: 0,
            fractional: 1,
        },
        content,
    })
}
