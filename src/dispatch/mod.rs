//! Packet dispatch: walking packets into binds, and per-cycle bookkeeping.

mod overload;

pub use overload::{CycleOutcome, OverloadDetector};

use crate::bindings::BindingRegistry;
use crate::error::Result;
use rosc::OscPacket;
use std::time::Duration;

/// Summary of one dispatch cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleReport {
    /// Packets taken off the queue.
    pub processed: usize,
    /// Packets left queued for the next cycle.
    pub remaining: usize,
    pub outcome: CycleOutcome,
    /// Overload flag after this cycle.
    pub overloaded: bool,
    pub elapsed: Duration,
}

impl CycleReport {
    /// Whether the time budget ended the cycle.
    pub fn was_cut_short(&self) -> bool {
        matches!(self.outcome, CycleOutcome::CutShort { .. })
    }
}

/// Deliver a packet to the registry, depth first.
///
/// A bundle goes to every bundle bind before its nested packets are
/// dispatched in order. Stops at the first callback error.
pub fn dispatch_packet(registry: &BindingRegistry, packet: &OscPacket) -> Result<()> {
    match packet {
        OscPacket::Message(message) => {
            registry.deliver_message(message)?;
        }
        OscPacket::Bundle(bundle) => {
            registry.deliver_bundle(bundle)?;
            for nested in &bundle.content {
                dispatch_packet(registry, nested)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{BundleBind, MessageBind};
    use parking_lot::Mutex;
    use rosc::{OscBundle, OscMessage, OscTime};
    use std::sync::Arc;

    fn message(addr: &str) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args: vec![],
        })
    }

    fn bundle(content: Vec<OscPacket>) -> OscPacket {
        OscPacket::Bundle(OscBundle {
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content,
        })
    }

    #[test]
    fn test_bundle_walk_is_depth_first() {
        let registry = BindingRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = Arc::clone(&log);
        registry
            .bind_bundle(BundleBind::new(move |b| {
                l.lock().push(format!("bundle({})", b.content.len()));
                Ok(())
            }))
            .unwrap();
        let l = Arc::clone(&log);
        registry
            .bind_message(MessageBind::new("*", move |m| {
                l.lock().push(m.addr.clone());
                Ok(())
            }))
            .unwrap();

        let packet = bundle(vec![
            message("/a"),
            bundle(vec![message("/b")]),
            message("/c"),
        ]);
        dispatch_packet(&registry, &packet).unwrap();

        assert_eq!(
            *log.lock(),
            vec!["bundle(3)", "/a", "bundle(1)", "/b", "/c"]
        );
    }

    #[test]
    fn test_callback_error_stops_walk() {
        let registry = BindingRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&seen);
        registry
            .bind_message(MessageBind::new("/*", move |m| {
                s.lock().push(m.addr.clone());
                if m.addr == "/bad" {
                    return Err("bad message".into());
                }
                Ok(())
            }))
            .unwrap();

        let packet = bundle(vec![message("/ok"), message("/bad"), message("/never")]);
        assert!(dispatch_packet(&registry, &packet).is_err());
        assert_eq!(*seen.lock(), vec!["/ok", "/bad"]);
    }
}
