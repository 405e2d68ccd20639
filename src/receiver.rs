//! Main receiver tying the transport, queue, binds and dispatch together.

use crate::backend::{ReceiverBackend, UdpBackend};
use crate::bindings::{BindingRegistry, BundleBind, MessageBind};
use crate::dispatch::{dispatch_packet, CycleOutcome, CycleReport, OverloadDetector};
use crate::error::{CallbackResult, ReceiverError, Result};
use crate::mapping::BundleMapper;
use crate::queue::{PacketQueue, PacketSink};
use parking_lot::{Mutex, RwLock};
use rosc::{OscBundle, OscMessage, OscPacket};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Multicast group conventionally used for OSC.
pub const DEFAULT_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 0, 0, 1);

/// Which local address the transport binds to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalHostMode {
    /// All interfaces (`0.0.0.0`).
    #[default]
    Any,
    /// The configured `local_host`.
    Custom,
}

/// Receiver configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub local_host_mode: LocalHostMode,

    /// Host to bind in [`LocalHostMode::Custom`].
    pub local_host: String,

    pub local_port: u16,

    /// Multicast group to join, if any.
    pub multicast_group: Option<Ipv4Addr>,

    /// Time budget for one dispatch cycle, in milliseconds.
    /// Default: 20
    pub processing_budget_ms: u64,

    /// Track overload across cycles.
    pub overload_detection: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            local_host_mode: LocalHostMode::Any,
            local_host: "127.0.0.1".to_string(),
            local_port: 7001,
            multicast_group: None,
            processing_budget_ms: 20,
            overload_detection: true,
        }
    }
}

impl ReceiverConfig {
    /// Host the transport actually binds to.
    pub fn bind_host(&self) -> &str {
        match self.local_host_mode {
            LocalHostMode::Any => "0.0.0.0",
            LocalHostMode::Custom => &self.local_host,
        }
    }

    /// Time budget for one dispatch cycle.
    pub fn processing_budget(&self) -> Duration {
        Duration::from_millis(self.processing_budget_ms)
    }

    fn endpoint(&self) -> (&str, u16, Option<Ipv4Addr>) {
        (self.bind_host(), self.local_port, self.multicast_group)
    }
}

/// The receive side of an OSC endpoint.
///
/// The transport pushes packets into a queue from its own threads; the host
/// calls [`run_cycle`](Self::run_cycle) periodically (timer, frame tick,
/// poll loop) to deliver queued packets to binds within a time budget.
///
/// Every method takes `&self`, so callbacks holding an `Arc<OscReceiver>`
/// can bind and unbind while they are being delivered to.
pub struct OscReceiver {
    config: RwLock<ReceiverConfig>,
    backend: Mutex<Box<dyn ReceiverBackend>>,
    queue: PacketQueue,
    bindings: BindingRegistry,
    mapper: RwLock<Option<Arc<dyn BundleMapper>>>,
    overload: Mutex<OverloadDetector>,
    /// Set while a dispatch cycle runs.
    cycling: AtomicBool,
}

impl OscReceiver {
    /// Create a receiver backed by UDP. Call [`connect`](Self::connect) to
    /// start listening.
    pub fn new(config: ReceiverConfig) -> Self {
        Self::with_backend(config, Box::new(UdpBackend::new()))
    }

    /// Create a receiver on a custom transport.
    pub fn with_backend(config: ReceiverConfig, backend: Box<dyn ReceiverBackend>) -> Self {
        Self {
            config: RwLock::new(config),
            backend: Mutex::new(backend),
            queue: PacketQueue::new(),
            bindings: BindingRegistry::new(),
            mapper: RwLock::new(None),
            overload: Mutex::new(OverloadDetector::new()),
            cycling: AtomicBool::new(false),
        }
    }

    // --- Transport ---

    /// Start the transport with the current configuration.
    pub fn connect(&self) -> Result<()> {
        let (host, port, multicast) = {
            let config = self.config.read();
            let (host, port, multicast) = config.endpoint();
            (host.to_string(), port, multicast)
        };

        debug!(%host, port, ?multicast, "connecting receiver");
        self.backend
            .lock()
            .connect(&host, port, multicast, self.queue.sink())
    }

    /// Stop the transport. Queued packets stay queued.
    pub fn close(&self) {
        let mut backend = self.backend.lock();
        if backend.is_available() {
            backend.close();
        }
    }

    /// Whether the transport holds an open endpoint.
    pub fn is_started(&self) -> bool {
        self.backend.lock().is_available()
    }

    /// Whether the transport is actively receiving.
    pub fn is_running(&self) -> bool {
        self.backend.lock().is_running()
    }

    /// Handle the transport (or any other producer) uses to queue packets.
    pub fn sink(&self) -> PacketSink {
        self.queue.sink()
    }

    /// Queue a received packet.
    pub fn packet_received(&self, packet: OscPacket) {
        self.queue.enqueue(packet);
    }

    /// Packets waiting for the next cycle.
    pub fn pending_packets(&self) -> usize {
        self.queue.len()
    }

    // --- Configuration ---

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ReceiverConfig {
        self.config.read().clone()
    }

    /// Replace the configuration, reconnecting if the endpoint changed while
    /// running.
    pub fn set_config(&self, config: ReceiverConfig) -> Result<()> {
        self.reconfigure(|current| *current = config)
    }

    /// Change the host mode, reconnecting if running.
    pub fn set_local_host_mode(&self, mode: LocalHostMode) -> Result<()> {
        self.reconfigure(|config| config.local_host_mode = mode)
    }

    /// Change the custom host, reconnecting if running and in custom mode.
    pub fn set_local_host(&self, host: impl Into<String>) -> Result<()> {
        let host = host.into();
        self.reconfigure(|config| config.local_host = host)
    }

    /// Change the port, reconnecting if running.
    pub fn set_local_port(&self, port: u16) -> Result<()> {
        self.reconfigure(|config| config.local_port = port)
    }

    /// Join a different multicast group (or none), reconnecting if running.
    pub fn set_multicast_group(&self, group: Option<Ipv4Addr>) -> Result<()> {
        self.reconfigure(|config| config.multicast_group = group)
    }

    fn reconfigure(&self, change: impl FnOnce(&mut ReceiverConfig)) -> Result<()> {
        let endpoint_changed = {
            let mut config = self.config.write();
            let before = config.clone();
            change(&mut config);
            before.endpoint() != config.endpoint()
        };

        if endpoint_changed && self.is_started() && self.is_running() {
            self.close();
            self.connect()?;
        }
        Ok(())
    }

    // --- Binds ---

    /// The bind registry.
    pub fn bindings(&self) -> &BindingRegistry {
        &self.bindings
    }

    /// Bind a callback to an address pattern and return the bind.
    pub fn bind<F>(&self, address: impl Into<String>, callback: F) -> Result<Arc<MessageBind>>
    where
        F: Fn(&OscMessage) -> CallbackResult + Send + Sync + 'static,
    {
        let bind = MessageBind::new(address, callback);
        self.bind_message(Arc::clone(&bind))?;
        Ok(bind)
    }

    /// Add a message bind. Binding the same bind twice is a no-op.
    pub fn bind_message(&self, bind: Arc<MessageBind>) -> Result<()> {
        self.bindings.bind_message(bind)
    }

    /// Remove a message bind. Unknown binds are ignored.
    pub fn unbind_message(&self, bind: &Arc<MessageBind>) {
        self.bindings.unbind_message(bind)
    }

    /// Bind a callback to every bundle and return the bind.
    pub fn bind_bundle_callback<F>(&self, callback: F) -> Result<Arc<BundleBind>>
    where
        F: Fn(&OscBundle) -> CallbackResult + Send + Sync + 'static,
    {
        let bind = BundleBind::new(callback);
        self.bind_bundle(Arc::clone(&bind))?;
        Ok(bind)
    }

    /// Add a bundle bind. Fails if it is already bound.
    pub fn bind_bundle(&self, bind: Arc<BundleBind>) -> Result<()> {
        self.bindings.bind_bundle(bind)
    }

    /// Remove a bundle bind. Fails if it is not bound.
    pub fn unbind_bundle(&self, bind: &Arc<BundleBind>) -> Result<()> {
        self.bindings.unbind_bundle(bind)
    }

    /// Remove every message and bundle bind.
    pub fn clear_binds(&self) -> Result<()> {
        self.bindings.clear()
    }

    // --- Mapping ---

    /// Install a hook run on every packet before dispatch.
    pub fn set_mapper(&self, mapper: impl BundleMapper + 'static) {
        let mapper: Arc<dyn BundleMapper> = Arc::new(mapper);
        *self.mapper.write() = Some(mapper);
    }

    /// Remove the mapping hook.
    pub fn clear_mapper(&self) {
        *self.mapper.write() = None;
    }

    // --- Dispatch ---

    /// Deliver queued packets to binds.
    ///
    /// Returns `None` without touching the queue when the transport is not
    /// started or not running. Otherwise pops packets in FIFO order until the
    /// queue is empty or the time budget is spent; the budget is checked
    /// between packets, never during a callback. Leftover packets wait for
    /// the next cycle.
    ///
    /// A callback error aborts the rest of the cycle and is returned. The
    /// failing packet is consumed; later packets stay queued.
    pub fn run_cycle(&self) -> Result<Option<CycleReport>> {
        if !self.is_started() || !self.is_running() {
            return Ok(None);
        }

        if self.cycling.swap(true, Ordering::AcqRel) {
            return Err(ReceiverError::CycleInProgress);
        }
        let _cycle = CycleGuard(&self.cycling);

        let (budget, detect_overload) = {
            let config = self.config.read();
            (config.processing_budget(), config.overload_detection)
        };
        let mapper = self.mapper.read().clone();

        let started = Instant::now();
        let mut drain = self.queue.drain_until(started + budget);
        for mut packet in drain.by_ref() {
            if let Some(mapper) = &mapper {
                mapper.map(&mut packet);
            }
            trace!(?packet, "dispatching packet");
            dispatch_packet(&self.bindings, &packet)?;
        }

        let processed = drain.yielded();
        let remaining = drain.remaining();
        let outcome = if drain.expired() {
            debug!(processed, remaining, "dispatch cycle cut short");
            CycleOutcome::CutShort { remaining }
        } else {
            CycleOutcome::Drained
        };

        let overloaded = if detect_overload {
            let mut detector = self.overload.lock();
            let was_overloaded = detector.is_overloaded();
            let overloaded = detector.record(outcome);
            if overloaded && !was_overloaded {
                warn!(remaining, "receiver is overloaded");
            }
            overloaded
        } else {
            false
        };

        Ok(Some(CycleReport {
            processed,
            remaining,
            outcome,
            overloaded,
            elapsed: started.elapsed(),
        }))
    }

    /// Whether recent cycles have been unable to keep up.
    pub fn is_overloaded(&self) -> bool {
        self.config.read().overload_detection && self.overload.lock().is_overloaded()
    }
}

impl fmt::Display for OscReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.config.read();
        write!(
            f,
            "<OscReceiver (LocalHost: {} LocalPort: {})>",
            config.bind_host(),
            config.local_port
        )
    }
}

/// Clears the cycle flag when a cycle ends, however it ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReceiverConfig::default();
        assert_eq!(config.local_port, 7001);
        assert_eq!(config.bind_host(), "0.0.0.0");
        assert_eq!(config.processing_budget(), Duration::from_millis(20));
        assert!(config.overload_detection);
    }

    #[test]
    fn test_custom_host_mode() {
        let config = ReceiverConfig {
            local_host_mode: LocalHostMode::Custom,
            local_host: "192.168.1.20".to_string(),
            ..Default::default()
        };
        assert_eq!(config.bind_host(), "192.168.1.20");
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: ReceiverConfig = serde_json::from_str(
            r#"{"local_port": 9000, "multicast_group": "239.0.0.1", "local_host_mode": "custom"}"#,
        )
        .unwrap();
        assert_eq!(config.local_port, 9000);
        assert_eq!(config.multicast_group, Some(DEFAULT_MULTICAST_GROUP));
        assert_eq!(config.local_host_mode, LocalHostMode::Custom);
        assert_eq!(config.processing_budget_ms, 20);
    }

    #[test]
    fn test_not_started_cycle_is_skipped() {
        let receiver = OscReceiver::new(ReceiverConfig::default());
        receiver.packet_received(OscPacket::Message(OscMessage {
            addr: "/x".to_string(),
            args: vec![],
        }));

        assert!(receiver.run_cycle().unwrap().is_none());
        assert_eq!(receiver.pending_packets(), 1);
    }

    #[test]
    fn test_display() {
        let receiver = OscReceiver::new(ReceiverConfig::default());
        assert_eq!(
            receiver.to_string(),
            "<OscReceiver (LocalHost: 0.0.0.0 LocalPort: 7001)>"
        );
    }

    #[test]
    fn test_setters_update_config_when_closed() {
        let receiver = OscReceiver::new(ReceiverConfig::default());
        receiver.set_local_port(9100).unwrap();
        receiver.set_multicast_group(Some(DEFAULT_MULTICAST_GROUP)).unwrap();
        receiver.set_local_host("10.0.0.2").unwrap();

        let config = receiver.config();
        assert_eq!(config.local_port, 9100);
        assert_eq!(config.multicast_group, Some(DEFAULT_MULTICAST_GROUP));
        assert_eq!(config.local_host, "10.0.0.2");
        assert!(!receiver.is_started());
    }
}
