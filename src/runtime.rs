//! Hook runtime contract.
//!
//! Generated proxies call a package-level helper before every forwarded
//! call. [`HookHandle`] is the same contract as a value: an atomic call id
//! counter plus a swappable, optional handler. The generated Go sidecar
//! follows it line for line.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

/// Call id meaning "not assigned yet, take the next one".
pub const UNASSIGNED_CALL_ID: i64 = -1;

/// Handler signature: `(name, call id) -> (name, call id)`.
pub type Handler = dyn Fn(&str, i64) -> (String, i64) + Send + Sync;

#[derive(Default)]
pub struct HookHandle {
    counter: AtomicI64,
    handler: RwLock<Option<Arc<Handler>>>,
}

impl HookHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler`, replacing any previous one.
    pub fn set<F>(&self, handler: F)
    where
        F: Fn(&str, i64) -> (String, i64) + Send + Sync + 'static,
    {
        let mut slot = self.handler.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::new(handler));
    }

    pub fn clear(&self) {
        let mut slot = self.handler.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    pub fn is_set(&self) -> bool {
        self.handler
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or_else(|e| e.into_inner().is_some())
    }

    /// Last call id handed out; 0 before the first call.
    pub fn last_call_id(&self) -> i64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Run the hook for one call.
    ///
    /// An input id of [`UNASSIGNED_CALL_ID`] is replaced by the next counter
    /// value; any other id passes through. Without a handler the (possibly
    /// assigned) inputs come back unchanged.
    pub fn invoke(&self, name: &str, call_id: i64) -> (String, i64) {
        let call_id = if call_id == UNASSIGNED_CALL_ID {
            self.counter.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            call_id
        };

        // Clone the Arc so the handler runs without holding the lock.
        let handler = match self.handler.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        match handler {
            Some(handler) => handler(name, call_id),
            None => (name.to_string(), call_id),
        }
    }
}

impl fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookHandle")
            .field("last_call_id", &self.last_call_id())
            .field("handler_set", &self.is_set())
            .finish()
    }
}
