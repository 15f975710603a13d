//! Session registry
//!
//! Scoped two-slot pairing map resolving "the other side" of a negotiation.
//! The registry is injected into the coordinator rather than looked up
//! through ambient globals, so a process can host several independent pairs
//! by giving each coordinator its own registry.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::{Result, SessionError};
use crate::types::EndpointId;

/// Two-party pairing registry
///
/// Exactly one pair may be active. Registering a third endpoint while two
/// are paired fails with [`SessionError::RegistryFull`] and leaves the
/// existing pair untouched. A slot is freed when its endpoint closes.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    slots: Arc<RwLock<Vec<EndpointId>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(RwLock::new(Vec::with_capacity(2))),
        }
    }

    /// Register an endpoint into the pair. Re-registering an endpoint that
    /// already holds a slot is a no-op.
    pub async fn register(&self, endpoint: &EndpointId) -> Result<()> {
        let mut slots = self.slots.write().await;
        if slots.contains(endpoint) {
            return Ok(());
        }
        if slots.len() >= 2 {
            return Err(SessionError::RegistryFull);
        }
        slots.push(endpoint.clone());
        debug!("Registered endpoint {} ({} of 2 slots)", endpoint, slots.len());
        Ok(())
    }

    /// Resolve the other half of the pair
    pub async fn lookup_counterpart(&self, endpoint: &EndpointId) -> Result<EndpointId> {
        let slots = self.slots.read().await;
        if !slots.contains(endpoint) {
            return Err(SessionError::endpoint_not_found(endpoint.to_string()));
        }
        slots
            .iter()
            .find(|id| *id != endpoint)
            .cloned()
            .ok_or_else(|| SessionError::CounterpartUnreachable {
                endpoint: endpoint.to_string(),
            })
    }

    /// Free an endpoint's slot. Unknown endpoints are a no-op.
    pub async fn unregister(&self, endpoint: &EndpointId) {
        let mut slots = self.slots.write().await;
        if let Some(pos) = slots.iter().position(|id| id == endpoint) {
            slots.remove(pos);
            debug!("Unregistered endpoint {}", endpoint);
        }
    }

    /// Number of occupied slots
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pairs_two_endpoints() {
        let registry = SessionRegistry::new();
        let a = EndpointId::new();
        let b = EndpointId::new();

        registry.register(&a).await.unwrap();
        registry.register(&b).await.unwrap();

        assert_eq!(registry.lookup_counterpart(&a).await.unwrap(), b);
        assert_eq!(registry.lookup_counterpart(&b).await.unwrap(), a);
    }

    #[tokio::test]
    async fn third_registration_fails_without_disturbing_pair() {
        let registry = SessionRegistry::new();
        let a = EndpointId::new();
        let b = EndpointId::new();
        let c = EndpointId::new();

        registry.register(&a).await.unwrap();
        registry.register(&b).await.unwrap();

        assert_eq!(
            registry.register(&c).await.unwrap_err(),
            SessionError::RegistryFull
        );

        // Existing pair is intact
        assert_eq!(registry.lookup_counterpart(&a).await.unwrap(), b);
        assert_eq!(registry.lookup_counterpart(&b).await.unwrap(), a);
    }

    #[tokio::test]
    async fn lone_endpoint_has_no_counterpart() {
        let registry = SessionRegistry::new();
        let a = EndpointId::new();
        registry.register(&a).await.unwrap();

        assert!(matches!(
            registry.lookup_counterpart(&a).await.unwrap_err(),
            SessionError::CounterpartUnreachable { .. }
        ));
    }

    #[tokio::test]
    async fn unregister_frees_the_slot() {
        let registry = SessionRegistry::new();
        let a = EndpointId::new();
        let b = EndpointId::new();
        let c = EndpointId::new();

        registry.register(&a).await.unwrap();
        registry.register(&b).await.unwrap();
        registry.unregister(&a).await;

        // Freed slot can be reused
        registry.register(&c).await.unwrap();
        assert_eq!(registry.lookup_counterpart(&b).await.unwrap(), c);
    }

    #[tokio::test]
    async fn reregistration_is_a_noop() {
        let registry = SessionRegistry::new();
        let a = EndpointId::new();
        registry.register(&a).await.unwrap();
        registry.register(&a).await.unwrap();
        assert_eq!(registry.len().await, 1);
    }
}
