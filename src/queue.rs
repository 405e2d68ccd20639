//! Inbound packet queue shared between the transport and the dispatch cycle.

use crossbeam_channel::{unbounded, Receiver, Sender};
use rosc::OscPacket;
use std::time::Instant;
use tracing::trace;

/// Unbounded FIFO of received packets.
///
/// Producers push through a [`PacketSink`] from any thread; the dispatch
/// cycle is the only consumer. Pushing never waits on the consumer, not even
/// while subscriber callbacks are running.
pub struct PacketQueue {
    sender: Sender<OscPacket>,
    receiver: Receiver<OscPacket>,
}

impl PacketQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Handle for producers.
    pub fn sink(&self) -> PacketSink {
        PacketSink {
            sender: self.sender.clone(),
        }
    }

    /// Push a packet.
    pub fn enqueue(&self, packet: OscPacket) {
        // The queue owns a receiver, so this cannot disconnect.
        let _ = self.sender.send(packet);
    }

    /// Pop the oldest packet, if any.
    pub fn pop(&self) -> Option<OscPacket> {
        self.receiver.try_recv().ok()
    }

    /// Number of queued packets.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether no packets are queued.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Pop packets until the queue is empty or `deadline` has passed.
    ///
    /// The deadline is checked before every pop except the first, i.e. after
    /// the caller finished with the previous packet, so each batch yields at
    /// least one packet when any are queued.
    pub fn drain_until(&self, deadline: Instant) -> Drain<'_> {
        Drain {
            queue: self,
            deadline,
            yielded: 0,
            expired: false,
        }
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`PacketQueue::drain_until`].
pub struct Drain<'a> {
    queue: &'a PacketQueue,
    deadline: Instant,
    yielded: usize,
    expired: bool,
}

impl Drain<'_> {
    /// Whether the batch ended because the deadline passed.
    pub fn expired(&self) -> bool {
        self.expired
    }

    /// Packets yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Packets still queued.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl Iterator for Drain<'_> {
    type Item = OscPacket;

    fn next(&mut self) -> Option<OscPacket> {
        if self.expired {
            return None;
        }
        if self.yielded > 0 && Instant::now() > self.deadline {
            self.expired = true;
            return None;
        }

        let packet = self.queue.pop()?;
        self.yielded += 1;
        Some(packet)
    }
}

/// Cloneable producer handle. This is the delivery callback given to the
/// transport.
#[derive(Clone)]
pub struct PacketSink {
    sender: Sender<OscPacket>,
}

impl PacketSink {
    /// Queue a received packet. Never blocks and never fails; packets sent
    /// after the receiver is gone are dropped.
    pub fn deliver(&self, packet: OscPacket) {
        if self.sender.send(packet).is_err() {
            trace!("receiver dropped, discarding packet");
        }
    }
}
