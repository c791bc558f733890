//! Per-address serialization of the nonce-read → broadcast window.
//!
//! Two invocations signing with the same key must not read the same pending
//! nonce. Holding the address lock from the nonce read until the node has
//! accepted the transaction makes the second reader see the first one's
//! pending transaction.

use std::sync::Arc;

use alloy::primitives::Address;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Guard held while a nonce is in flight for one address.
pub type NonceGuard = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub struct NonceLocks {
    locks: DashMap<Address, Arc<Mutex<()>>>,
}

impl NonceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `address`'s nonce sequence.
    pub async fn acquire(&self, address: Address) -> NonceGuard {
        let lock = self.locks.entry(address).or_default().clone();
        lock.lock_owned().await
    }

    /// Number of addresses seen so far.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_address_serialized() {
        let locks = Arc::new(NonceLocks::new());
        let addr = Address::repeat_byte(0x11);

        let guard = locks.acquire(addr).await;
        let locks2 = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = locks2.acquire(addr).await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_distinct_addresses_independent() {
        let locks = NonceLocks::new();
        let _a = locks.acquire(Address::repeat_byte(0x01)).await;
        let _b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(Address::repeat_byte(0x02)),
        )
        .await
        .unwrap();
        assert_eq!(locks.len(), 2);
    }
}
