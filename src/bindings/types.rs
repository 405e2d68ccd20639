//! Bind types: the subscriber side of message and bundle delivery.

use crate::error::CallbackResult;
use rosc::{OscBundle, OscMessage};
use std::fmt;
use std::sync::Arc;

/// Callback invoked with a matching message.
pub type MessageCallback = Box<dyn Fn(&OscMessage) -> CallbackResult + Send + Sync>;

/// Callback invoked with every received bundle.
pub type BundleCallback = Box<dyn Fn(&OscBundle) -> CallbackResult + Send + Sync>;

/// A message bind: an address pattern and the callback to run for matching
/// messages.
///
/// Binds are compared by identity (`Arc::ptr_eq`), never by pattern. Two binds
/// with the same pattern are two separate entries.
pub struct MessageBind {
    address: String,
    callback: Option<MessageCallback>,
}

impl MessageBind {
    /// Create a bind for `address` with a callback.
    pub fn new<F>(address: impl Into<String>, callback: F) -> Arc<Self>
    where
        F: Fn(&OscMessage) -> CallbackResult + Send + Sync + 'static,
    {
        Arc::new(Self {
            address: address.into(),
            callback: Some(Box::new(callback)),
        })
    }

    /// Create a bind with no callback. It occupies a slot in the registry
    /// but is skipped during delivery.
    pub fn detached(address: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            address: address.into(),
            callback: None,
        })
    }

    /// The address pattern this bind listens on.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether a callback is set.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn callback(&self) -> Option<&MessageCallback> {
        self.callback.as_ref()
    }
}

impl fmt::Debug for MessageBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBind")
            .field("address", &self.address)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// A bundle bind: fires for every bundle, unfiltered by address.
pub struct BundleBind {
    callback: Option<BundleCallback>,
}

impl BundleBind {
    /// Create a bundle bind with a callback.
    pub fn new<F>(callback: F) -> Arc<Self>
    where
        F: Fn(&OscBundle) -> CallbackResult + Send + Sync + 'static,
    {
        Arc::new(Self {
            callback: Some(Box::new(callback)),
        })
    }

    /// Create a bundle bind with no callback.
    pub fn detached() -> Arc<Self> {
        Arc::new(Self { callback: None })
    }

    /// Whether a callback is set.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn callback(&self) -> Option<&BundleCallback> {
        self.callback.as_ref()
    }
}

impl fmt::Debug for BundleBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleBind")
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
