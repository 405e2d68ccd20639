//! # OSC Receiver
//!
//! The receive side of an OSC endpoint: packets arrive from a transport on
//! its own threads, wait in a queue, and are delivered to binds matched by
//! address pattern during host-driven dispatch cycles.
//!
//! ## Core Concepts
//!
//! - **Queue**: Unbounded FIFO; producers never wait on dispatch
//! - **Cycle**: `run_cycle` drains the queue within a time budget
//! - **Binds**: Callbacks on OSC address patterns (`*`, `?`, `[a-z]`, `{a,b}`)
//! - **Reentrancy**: Binds may bind/unbind from inside their own callbacks
//! - **Overload**: Flag raised when consecutive cycles fail to catch up
//!
//! ## Example
//!
//! ```ignore
//! use osc_receiver::{OscReceiver, ReceiverConfig};
//!
//! let receiver = OscReceiver::new(ReceiverConfig {
//!     local_port: 9000,
//!     ..Default::default()
//! });
//! receiver.connect()?;
//!
//! receiver.bind("/mixer/*/fader", |msg| {
//!     println!("{} {:?}", msg.addr, msg.args);
//!     Ok(())
//! })?;
//!
//! loop {
//!     receiver.run_cycle()?;
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! ```

pub mod address;
pub mod backend;
pub mod bindings;
pub mod dispatch;
pub mod error;
pub mod mapping;
pub mod queue;
pub mod receiver;

// Re-exports
pub use address::matches;
pub use backend::{ReceiverBackend, UdpBackend};
pub use bindings::{BindingRegistry, BundleBind, BundleCallback, MessageBind, MessageCallback};
pub use dispatch::{dispatch_packet, CycleOutcome, CycleReport, OverloadDetector};
pub use error::{CallbackError, CallbackResult, ReceiverError, Result};
pub use mapping::BundleMapper;
pub use queue::{Drain, PacketQueue, PacketSink};
pub use receiver::{LocalHostMode, OscReceiver, ReceiverConfig, DEFAULT_MULTICAST_GROUP};
pub use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};
