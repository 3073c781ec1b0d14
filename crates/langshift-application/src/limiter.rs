//! Per-provider concurrency cap on gateway calls.

use langshift_core::config::Provider;
use langshift_core::{Result, ShiftError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Hands out at most `permits_per_provider` concurrent call permits for
/// each provider. Semaphores are created on first use.
#[derive(Clone)]
pub struct ProviderLimiter {
    permits_per_provider: usize,
    semaphores: Arc<Mutex<HashMap<Provider, Arc<Semaphore>>>>,
}

impl ProviderLimiter {
    pub fn new(permits_per_provider: usize) -> Self {
        Self {
            permits_per_provider: permits_per_provider.max(1),
            semaphores: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn semaphore(&self, provider: Provider) -> Result<Arc<Semaphore>> {
        let mut semaphores = self
            .semaphores
            .lock()
            .map_err(|_| ShiftError::internal("provider limiter lock poisoned"))?;
        Ok(semaphores
            .entry(provider)
            .or_insert_with(|| Arc::new(Semaphore::new(self.permits_per_provider)))
            .clone())
    }

    /// Waits for a call slot on `provider`; the slot frees when the permit drops.
    pub async fn acquire(&self, provider: Provider) -> Result<OwnedSemaphorePermit> {
        self.semaphore(provider)?
            .acquire_owned()
            .await
            .map_err(|_| ShiftError::internal("provider limiter closed"))
    }

    /// Free slots for `provider` right now.
    pub fn available(&self, provider: Provider) -> usize {
        self.semaphore(provider)
            .map(|s| s.available_permits())
            .unwrap_or(0)
    }
}
