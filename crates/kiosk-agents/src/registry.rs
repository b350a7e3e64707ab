//! Responder registry: an explicit kind → implementation map built at
//! startup. No global state; the workflow owns the registry it was given.

use crate::responder::{Responder, ResponderKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Default)]
pub struct ResponderRegistry {
    responders: HashMap<ResponderKind, Arc<dyn Responder>>,
}

impl ResponderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the responder's own kind. Re-registering replaces.
    pub fn register(&mut self, responder: Arc<dyn Responder>) {
        self.responders.insert(responder.kind(), responder);
    }

    pub fn get(&self, kind: ResponderKind) -> Option<Arc<dyn Responder>> {
        self.responders.get(&kind).cloned()
    }

    /// Resolve a kind, falling back to the general-knowledge responder when
    /// the requested specialist is not installed. Missing fallback too is the
    /// caller's configuration error and returns `None`.
    pub fn resolve(&self, kind: ResponderKind) -> Option<Arc<dyn Responder>> {
        if let Some(r) = self.get(kind) {
            return Some(r);
        }
        warn!(kind = kind.as_str(), "responder not installed; falling back");
        self.get(ResponderKind::GeneralKnowledge)
    }

    pub fn len(&self) -> usize {
        self.responders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responders.is_empty()
    }
}
