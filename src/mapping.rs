//! Bundle mapping hook run on each packet before dispatch.

use rosc::OscPacket;

/// Pre-processes a received packet before it is dispatched.
///
/// Runs once per top-level packet. Implementations may rewrite contents
/// (addresses, arguments, time tags) but must keep the packet kind and the
/// order of nested packets.
pub trait BundleMapper: Send + Sync {
    fn map(&self, packet: &mut OscPacket);
}

impl<F> BundleMapper for F
where
    F: Fn(&mut OscPacket) + Send + Sync,
{
    fn map(&self, packet: &mut OscPacket) {
        self(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::{OscMessage, OscType};

    #[test]
    fn test_closure_mapper() {
        let mapper = |packet: &mut OscPacket| {
            if let OscPacket::Message(msg) = packet {
                msg.args.push(OscType::Int(1));
            }
        };

        let mut packet = OscPacket::Message(OscMessage {
            addr: "/x".to_string(),
            args: vec![],
        });
        BundleMapper::map(&mapper, &mut packet);

        match packet {
            OscPacket::Message(msg) => assert_eq!(msg.args, vec![OscType::Int(1)]),
            OscPacket::Bundle(_) => panic!("kind changed"),
        }
    }
}
