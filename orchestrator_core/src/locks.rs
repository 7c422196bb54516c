//! Per-resource mutual exclusion.
//!
//! Only used when `serialize_per_resource` is enabled. It orders actions on
//! one resource within this process; other processes and out-of-band changes
//! are not covered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use orchestrator_shared_types::ResourceRef;

#[derive(Default)]
pub struct ResourceLocks {
    table: Mutex<HashMap<ResourceRef, Arc<AsyncMutex<()>>>>,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `reference`. Released on drop.
    pub async fn acquire(&self, reference: &ResourceRef) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(|p| p.into_inner());
            // Entries nobody holds or waits on can go.
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            table
                .entry(reference.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of tracked resources.
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_resource_is_exclusive() {
        let locks = Arc::new(ResourceLocks::new());
        let reference = ResourceRef::new("team-a", "vm1");

        let guard = locks.acquire(&reference).await;

        let waiter = {
            let locks = locks.clone();
            let reference = reference.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&reference).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_resources_do_not_block() {
        let locks = ResourceLocks::new();
        let _a = locks.acquire(&ResourceRef::new("team-a", "vm1")).await;
        let _b = tokio::time::timeout(
            Duration::from_secs(1),
            locks.acquire(&ResourceRef::new("team-a", "vm2")),
        )
        .await
        .unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = ResourceLocks::new();
        drop(locks.acquire(&ResourceRef::new("team-a", "vm1")).await);
        let _b = locks.acquire(&ResourceRef::new("team-a", "vm2")).await;
        assert_eq!(locks.len(), 1);
    }
}
