//! Message and bundle binds.
//!
//! Message binds carry an OSC address pattern and fire for every message
//! whose address matches it. Bundle binds fire for every bundle.
//!
//! Binds can be added and removed from inside their own callbacks:
//! - requests made during a delivery walk are staged
//! - staged requests are applied once the walk finishes
//! - the walk in progress is never affected
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(BindingRegistry::new());
//!
//! let reg = Arc::clone(&registry);
//! let once = Arc::new(Mutex::new(None::<Arc<MessageBind>>));
//! let slot = Arc::clone(&once);
//! let bind = MessageBind::new("/transport/play", move |msg| {
//!     println!("play: {:?}", msg.args);
//!     if let Some(me) = slot.lock().take() {
//!         reg.unbind_message(&me);
//!     }
//!     Ok(())
//! });
//! *once.lock() = Some(Arc::clone(&bind));
//! registry.bind_message(bind)?;
//! ```

mod registry;
mod types;

pub use registry::BindingRegistry;
pub use types::{BundleBind, BundleCallback, MessageBind, MessageCallback};
