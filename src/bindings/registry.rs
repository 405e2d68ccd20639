//! Bind registry with reentrant bind/unbind.

use crate::address;
use crate::error::{ReceiverError, Result};
use parking_lot::Mutex;
use rosc::{OscBundle, OscMessage};
use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{BundleBind, MessageBind};

/// Bind/unbind requests made while a delivery walk is running.
///
/// Each stack is applied LIFO once the walk finishes.
#[derive(Default)]
struct StagedBinds {
    message_binds: Vec<Arc<MessageBind>>,
    message_unbinds: Vec<Arc<MessageBind>>,
    bundle_binds: Vec<Arc<BundleBind>>,
    bundle_unbinds: Vec<Arc<BundleBind>>,
}

impl StagedBinds {
    fn len(&self) -> usize {
        self.message_binds.len()
            + self.message_unbinds.len()
            + self.bundle_binds.len()
            + self.bundle_unbinds.len()
    }
}

#[derive(Default)]
struct RegistryState {
    /// Live message binds, in delivery order.
    messages: Vec<Arc<MessageBind>>,
    /// Live bundle binds, in delivery order.
    bundles: Vec<Arc<BundleBind>>,
    /// Number of delivery walks currently running. Live sets are frozen
    /// while this is non-zero.
    passes: usize,
    staged: StagedBinds,
}

impl RegistryState {
    fn delivering(&self) -> bool {
        self.passes > 0
    }

    fn add_message(&mut self, bind: Arc<MessageBind>) {
        if !self.messages.iter().any(|b| Arc::ptr_eq(b, &bind)) {
            self.messages.push(bind);
        }
    }

    fn remove_message(&mut self, bind: &Arc<MessageBind>) {
        if let Some(pos) = self.messages.iter().position(|b| Arc::ptr_eq(b, bind)) {
            self.messages.remove(pos);
        }
    }

    fn add_bundle(&mut self, bind: Arc<BundleBind>) -> Result<()> {
        if self.bundles.iter().any(|b| Arc::ptr_eq(b, &bind)) {
            return Err(ReceiverError::BundleAlreadyBound);
        }
        self.bundles.push(bind);
        Ok(())
    }

    fn remove_bundle(&mut self, bind: &Arc<BundleBind>) -> Result<()> {
        let pos = self
            .bundles
            .iter()
            .position(|b| Arc::ptr_eq(b, bind))
            .ok_or(ReceiverError::BundleNotBound)?;
        self.bundles.remove(pos);
        Ok(())
    }

    /// Apply staged requests: message binds, message unbinds, bundle binds,
    /// bundle unbinds.
    fn drain_staged(&mut self) {
        while let Some(bind) = self.staged.message_binds.pop() {
            self.add_message(bind);
        }

        while let Some(bind) = self.staged.message_unbinds.pop() {
            self.remove_message(&bind);
        }

        // Nobody is left to receive these errors.
        while let Some(bind) = self.staged.bundle_binds.pop() {
            if let Err(e) = self.add_bundle(bind) {
                warn!(error = %e, "dropping staged bundle bind");
            }
        }

        while let Some(bind) = self.staged.bundle_unbinds.pop() {
            if let Err(e) = self.remove_bundle(&bind) {
                warn!(error = %e, "dropping staged bundle unbind");
            }
        }
    }
}

/// Live message and bundle binds.
///
/// All operations take `&self`, so callbacks may bind and unbind on the
/// registry that is currently delivering to them. While a delivery walk is
/// running those requests are staged and applied when the walk ends; the
/// walk itself always sees the set it started with.
#[derive(Default)]
pub struct BindingRegistry {
    state: Mutex<RegistryState>,
}

impl BindingRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Message Binds ---

    /// Add a message bind. Binding the same bind twice is a no-op.
    pub fn bind_message(&self, bind: Arc<MessageBind>) -> Result<()> {
        if bind.address().is_empty() {
            return Err(ReceiverError::EmptyAddress);
        }

        let mut state = self.state.lock();
        if state.delivering() {
            debug!(address = bind.address(), "staging message bind");
            state.staged.message_binds.push(bind);
        } else {
            state.add_message(bind);
        }
        Ok(())
    }

    /// Remove a message bind. Unknown binds are ignored.
    pub fn unbind_message(&self, bind: &Arc<MessageBind>) {
        let mut state = self.state.lock();
        if state.delivering() {
            debug!(address = bind.address(), "staging message unbind");
            state.staged.message_unbinds.push(Arc::clone(bind));
        } else {
            state.remove_message(bind);
        }
    }

    // --- Bundle Binds ---

    /// Add a bundle bind.
    ///
    /// Fails with [`ReceiverError::BundleAlreadyBound`] if it is already
    /// bound. A bind staged during delivery is checked when it is applied.
    pub fn bind_bundle(&self, bind: Arc<BundleBind>) -> Result<()> {
        let mut state = self.state.lock();
        if state.delivering() {
            debug!("staging bundle bind");
            state.staged.bundle_binds.push(bind);
            return Ok(());
        }
        state.add_bundle(bind)
    }

    /// Remove a bundle bind.
    ///
    /// Fails with [`ReceiverError::BundleNotBound`] if it is not bound.
    pub fn unbind_bundle(&self, bind: &Arc<BundleBind>) -> Result<()> {
        let mut state = self.state.lock();
        if state.delivering() {
            debug!("staging bundle unbind");
            state.staged.bundle_unbinds.push(Arc::clone(bind));
            return Ok(());
        }
        state.remove_bundle(bind)
    }

    /// Remove every bind.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.delivering() {
            return Err(ReceiverError::ClearDuringDelivery);
        }
        state.messages.clear();
        state.bundles.clear();
        Ok(())
    }

    /// Apply staged bind/unbind requests. Does nothing while a delivery walk
    /// is running.
    pub fn drain_staged(&self) {
        let mut state = self.state.lock();
        if !state.delivering() {
            state.drain_staged();
        }
    }

    // --- Inspection ---

    /// Number of live message binds.
    pub fn message_count(&self) -> usize {
        self.state.lock().messages.len()
    }

    /// Number of live bundle binds.
    pub fn bundle_count(&self) -> usize {
        self.state.lock().bundles.len()
    }

    /// Whether this exact message bind is live.
    pub fn contains_message(&self, bind: &Arc<MessageBind>) -> bool {
        self.state
            .lock()
            .messages
            .iter()
            .any(|b| Arc::ptr_eq(b, bind))
    }

    /// Whether this exact bundle bind is live.
    pub fn contains_bundle(&self, bind: &Arc<BundleBind>) -> bool {
        self.state
            .lock()
            .bundles
            .iter()
            .any(|b| Arc::ptr_eq(b, bind))
    }

    /// Whether a delivery walk is running.
    pub fn is_delivering(&self) -> bool {
        self.state.lock().delivering()
    }

    /// Number of staged requests waiting for the current walk to end.
    pub fn staged_count(&self) -> usize {
        self.state.lock().staged.len()
    }

    // --- Delivery ---

    /// Deliver a message to every bind whose pattern matches its address.
    ///
    /// Returns the number of callbacks invoked. The first callback error
    /// ends the walk; staged requests are applied either way.
    pub fn deliver_message(&self, message: &OscMessage) -> Result<usize> {
        let _pass = self.begin_pass();

        let mut delivered = 0;
        let mut index = 0;
        while let Some(bind) = self.message_at(index) {
            index += 1;

            let Some(callback) = bind.callback() else {
                continue;
            };
            if !address::matches(bind.address(), &message.addr) {
                continue;
            }

            callback(message).map_err(ReceiverError::Callback)?;
            delivered += 1;
        }

        Ok(delivered)
    }

    /// Deliver a bundle to every bundle bind. Nested packets are not
    /// visited here.
    pub fn deliver_bundle(&self, bundle: &OscBundle) -> Result<usize> {
        let _pass = self.begin_pass();

        let mut delivered = 0;
        let mut index = 0;
        while let Some(bind) = self.bundle_at(index) {
            index += 1;

            if let Some(callback) = bind.callback() {
                callback(bundle).map_err(ReceiverError::Callback)?;
                delivered += 1;
            }
        }

        Ok(delivered)
    }

    // The lock is only held while fetching an entry, never across a callback.
    fn message_at(&self, index: usize) -> Option<Arc<MessageBind>> {
        self.state.lock().messages.get(index).cloned()
    }

    fn bundle_at(&self, index: usize) -> Option<Arc<BundleBind>> {
        self.state.lock().bundles.get(index).cloned()
    }

    fn begin_pass(&self) -> DeliveryPass<'_> {
        self.state.lock().passes += 1;
        DeliveryPass { registry: self }
    }
}

/// Marks a delivery walk. Dropping it ends the walk and applies staged
/// requests, including when a callback failed or panicked.
struct DeliveryPass<'a> {
    registry: &'a BindingRegistry,
}

impl Drop for DeliveryPass<'_> {
    fn drop(&mut self) {
        let mut state = self.registry.state.lock();
        state.passes -= 1;
        if state.passes == 0 {
            state.drain_staged();
        }
    }
}
