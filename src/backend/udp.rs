//! UDP transport backend.

use crate::error::{ReceiverError, Result};
use crate::queue::PacketSink;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, trace, warn};

use super::ReceiverBackend;

/// Largest UDP payload we accept.
const MAX_DATAGRAM_SIZE: usize = 65_507;

/// How often the receive thread wakes up to check for shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Receives OSC datagrams on a UDP socket from a background thread.
pub struct UdpBackend {
    local_addr: Option<SocketAddr>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl UdpBackend {
    /// Create a disconnected backend.
    pub fn new() -> Self {
        Self {
            local_addr: None,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// Address the socket is bound to, while connected.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn bind_socket(host: &str, port: u16, multicast: Option<Ipv4Addr>) -> Result<UdpSocket> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| ReceiverError::InvalidHost(format!("{}: {}", host, e)))?
            .next()
            .ok_or_else(|| ReceiverError::InvalidHost(host.to_string()))?;

        let interface = match (addr, multicast) {
            (SocketAddr::V6(_), Some(group)) => {
                return Err(ReceiverError::InvalidHost(format!(
                    "{}: multicast group {} needs an IPv4 local host",
                    host, group
                )));
            }
            (SocketAddr::V4(v4), _) => Some(*v4.ip()),
            (SocketAddr::V6(_), None) => None,
        };

        let socket = UdpSocket::bind(addr)?;
        if let (Some(group), Some(interface)) = (multicast, interface) {
            socket.join_multicast_v4(&group, &interface)?;
        }
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        Ok(socket)
    }
}

impl Default for UdpBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiverBackend for UdpBackend {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        multicast: Option<Ipv4Addr>,
        sink: PacketSink,
    ) -> Result<()> {
        if self.is_available() {
            self.close();
        }

        let socket = Self::bind_socket(host, port, multicast)?;
        let local_addr = socket.local_addr()?;

        // Each connection owns its own flag.
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name(format!("osc-recv-{}", local_addr.port()))
            .spawn(move || receive_loop(socket, sink, flag))?;

        info!(%local_addr, multicast = ?multicast, "OSC receiver listening");

        self.local_addr = Some(local_addr);
        self.running = running;
        self.thread = Some(thread);
        Ok(())
    }

    fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("OSC receive thread panicked");
            }
        }
        if let Some(addr) = self.local_addr.take() {
            info!(local_addr = %addr, "OSC receiver closed");
        }
    }

    fn is_available(&self) -> bool {
        self.local_addr.is_some()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for UdpBackend {
    fn drop(&mut self) {
        self.close();
    }
}

fn receive_loop(socket: UdpSocket, sink: PacketSink, running: Arc<AtomicBool>) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    while running.load(Ordering::SeqCst) {
        match socket.recv_from(&mut buf) {
            Ok((n, from)) => match rosc::decoder::decode_udp(&buf[..n]) {
                Ok((_, packet)) => {
                    trace!(%from, bytes = n, "datagram received");
                    sink.deliver(packet);
                }
                Err(e) => warn!(%from, error = ?e, "skipping undecodable datagram"),
            },
            Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                continue
            }
            Err(e) => {
                warn!(error = %e, "OSC receive failed, stopping");
                break;
            }
        }
    }

    running.store(false, Ordering::SeqCst);
}
