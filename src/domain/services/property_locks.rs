use std::sync::Arc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per property. Holding the guard serializes the overlap check,
/// the booking write and the derived-record updates for that property.
#[derive(Default)]
pub struct PropertyLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PropertyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, property_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(property_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
