//! Transport backends that feed received packets into the queue.

mod udp;

pub use udp::UdpBackend;

use crate::error::Result;
use crate::queue::PacketSink;
use std::net::Ipv4Addr;

/// A transport that listens for OSC packets and hands them to a sink.
///
/// `deliver` on the sink may be called from any thread at any time,
/// including after `close`.
pub trait ReceiverBackend: Send {
    /// Start listening on `host:port`, joining `multicast` if given.
    /// Connecting an already connected backend reconnects it.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        multicast: Option<Ipv4Addr>,
        sink: PacketSink,
    ) -> Result<()>;

    /// Stop listening. A later `connect` must work again.
    fn close(&mut self);

    /// Whether the backend holds an open endpoint.
    fn is_available(&self) -> bool;

    /// Whether the backend is actively receiving.
    fn is_running(&self) -> bool;
}
