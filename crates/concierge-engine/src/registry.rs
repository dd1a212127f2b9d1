//! Multi-tenant engine registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use concierge_core::config::TenantConfig;

use crate::error::EngineError;
use crate::orchestrator::{ChatEngine, TurnOutput};

enum TenantEntry {
    Enabled(Arc<ChatEngine>),
    /// Config failed validation; the reason is replayed on every call.
    Disabled(String),
}

/// Maps client ids to their engines.
///
/// A tenant whose config fails validation still registers, but as
/// disabled: its turns fail with a clear error while every other tenant
/// keeps working.
#[derive(Default)]
pub struct TenantRegistry {
    tenants: HashMap<String, TenantEntry>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tenant. The engine is only built when the config
    /// passes validation.
    pub fn register<F>(&mut self, config: &TenantConfig, build: F)
    where
        F: FnOnce() -> ChatEngine,
    {
        let client_id = config.tenant.client_id.clone();
        let entry = match config.validate() {
            Ok(()) => {
                info!(client_id = %client_id, "tenant registered");
                TenantEntry::Enabled(Arc::new(build()))
            }
            Err(err) => {
                warn!(client_id = %client_id, %err, "tenant registered disabled");
                TenantEntry::Disabled(err.to_string())
            }
        };
        self.tenants.insert(client_id, entry);
    }

    /// Look up a tenant's engine.
    pub fn engine(&self, client_id: &str) -> Result<Arc<ChatEngine>, EngineError> {
        match self.tenants.get(client_id) {
            None => Err(EngineError::UnknownTenant(client_id.to_string())),
            Some(TenantEntry::Disabled(reason)) => {
                Err(EngineError::NotConfigured(reason.clone()))
            }
            Some(TenantEntry::Enabled(engine)) => Ok(engine.clone()),
        }
    }

    /// Route one turn to the named tenant.
    pub async fn handle_turn(
        &self,
        client_id: &str,
        session_id: &str,
        user_text: &str,
    ) -> Result<TurnOutput, EngineError> {
        self.engine(client_id)?.handle_turn(session_id, user_text).await
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}
