//! The name-to-endpoint table behind the binder.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

/// A registered network endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Errors surfaced to binder callers as faults.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BinderError {
    /// No endpoint is registered under this name.
    #[error("service not found: {name}")]
    ServiceNotFound { name: String },
}

/// Shared name-to-endpoint table.
///
/// Registrations are infrequent and lookups are cheap, so a RwLock is a
/// better fit here than an actor; there are no check-then-act sequences
/// to serialize. Last writer wins on re-registration, which is what lets
/// a restarted messenger reclaim its name.
#[derive(Clone, Default)]
pub struct Directory {
    inner: Arc<RwLock<HashMap<String, ServiceEndpoint>>>,
}

impl Directory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or overwrites the endpoint for `name`. Always succeeds.
    pub async fn register(&self, name: impl Into<String>, endpoint: ServiceEndpoint) -> bool {
        let name = name.into();
        let mut table = self.inner.write().await;

        let replaced = table.insert(name.clone(), endpoint.clone()).is_some();

        info!(
            service = %name,
            endpoint = %endpoint,
            replaced = replaced,
            total_services = table.len(),
            "Service registered"
        );
        true
    }

    /// Resolves `name` to its rendered "host:port" endpoint.
    ///
    /// # Errors
    ///
    /// - `BinderError::ServiceNotFound` if nothing is registered under `name`
    pub async fn lookup(&self, name: &str) -> Result<String, BinderError> {
        let table = self.inner.read().await;

        match table.get(name) {
            Some(endpoint) => {
                debug!(service = name, endpoint = %endpoint, "Service resolved");
                Ok(endpoint.to_string())
            }
            None => Err(BinderError::ServiceNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Returns the number of registered services.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Returns true if no services are registered.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
