//! In-memory transaction store.
//!
//! Two indices live behind a single lock: live transactions by handle, and
//! pending interaction keys to the handle that owns them. Reads hand out
//! clones; every change goes through [`TransactionStore::commit`], which
//! checks the record's revision so a caller working on an outdated copy
//! cannot overwrite a newer one.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::models::Transaction;

#[derive(Default)]
struct Indices {
    by_handle: HashMap<String, Transaction>,
    by_interaction: HashMap<String, String>,
}

/// Concurrency-safe transaction repository.
#[derive(Clone, Default)]
pub struct TransactionStore {
    inner: Arc<RwLock<Indices>>,
}

impl TransactionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new transaction.
    ///
    /// Fails if its handle or interaction key is already live.
    pub async fn insert(&self, transaction: Transaction) -> StoreResult<()> {
        let mut indices = self.inner.write().await;

        if indices.by_handle.contains_key(&transaction.handle) {
            return Err(StoreError::HandleCollision);
        }
        if let Some(key) = transaction.interaction_key.as_ref() {
            if indices.by_interaction.contains_key(key) {
                return Err(StoreError::HandleCollision);
            }
            indices.by_interaction.insert(key.clone(), transaction.handle.clone());
        }
        indices.by_handle.insert(transaction.handle.clone(), transaction);
        Ok(())
    }

    /// Copy of the transaction under `handle`.
    pub async fn get(&self, handle: &str) -> StoreResult<Transaction> {
        let indices = self.inner.read().await;
        indices.by_handle.get(handle).cloned().ok_or(StoreError::NotFound)
    }

    /// Copy of the transaction owning the pending interaction `key`.
    pub async fn get_by_interaction(&self, key: &str) -> StoreResult<Transaction> {
        let indices = self.inner.read().await;
        let handle = indices.by_interaction.get(key).ok_or(StoreError::NotFound)?;
        indices.by_handle.get(handle).cloned().ok_or(StoreError::NotFound)
    }

    /// Replace the record stored under `previous_handle` with `transaction`.
    ///
    /// `transaction` must be a copy obtained from this store and still carry
    /// the revision it was read at. When its handle differs from
    /// `previous_handle` the old handle stops resolving in the same critical
    /// section that makes the new one visible. A pending interaction key that
    /// `transaction` no longer carries is removed from the interaction index.
    ///
    /// Returns the committed copy with its new revision.
    pub async fn commit(
        &self,
        previous_handle: &str,
        mut transaction: Transaction,
    ) -> StoreResult<Transaction> {
        let mut indices = self.inner.write().await;

        let current = indices.by_handle.get(previous_handle).ok_or(StoreError::NotFound)?;
        if current.revision != transaction.revision {
            return Err(StoreError::Stale);
        }
        let rotating = transaction.handle != previous_handle;
        if rotating && indices.by_handle.contains_key(&transaction.handle) {
            return Err(StoreError::HandleCollision);
        }
        if let Some(key) = transaction.interaction_key.as_ref() {
            let owner = indices.by_interaction.get(key);
            if owner.is_some_and(|owner| owner != previous_handle) {
                return Err(StoreError::HandleCollision);
            }
        }

        let Some(previous) = indices.by_handle.remove(previous_handle) else {
            return Err(StoreError::NotFound);
        };
        if let Some(old_key) = previous.interaction_key {
            if transaction.interaction_key.as_ref() != Some(&old_key) {
                indices.by_interaction.remove(&old_key);
            }
        }
        if let Some(key) = transaction.interaction_key.as_ref() {
            indices.by_interaction.insert(key.clone(), transaction.handle.clone());
        }

        transaction.revision += 1;
        indices.by_handle.insert(transaction.handle.clone(), transaction.clone());
        Ok(transaction)
    }

    /// Remove the transaction under `handle` and its pending interaction key.
    ///
    /// Returns false if nothing was stored under `handle`.
    pub async fn drop_transaction(&self, handle: &str) -> bool {
        let mut indices = self.inner.write().await;
        let Some(removed) = indices.by_handle.remove(handle) else {
            return false;
        };
        if let Some(key) = removed.interaction_key {
            indices.by_interaction.remove(&key);
        }
        true
    }

    /// Number of live transactions.
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_handle.len()
    }

    /// Whether the store holds no transactions.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.by_handle.is_empty()
    }

    /// Number of pending interaction keys.
    pub async fn pending_interactions(&self) -> usize {
        self.inner.read().await.by_interaction.len()
    }
}

impl std::fmt::Debug for TransactionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Jwk;
    use crate::models::TransactionState;
    use chrono::Utc;

    fn transaction(handle: &str, key: Option<&str>) -> Transaction {
        let mut tx = Transaction::new(handle, Jwk::ed25519(&[1; 32]), Utc::now());
        tx.state = TransactionState::WaitingForAuthz;
        tx.interaction_key = key.map(str::to_string);
        tx
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = TransactionStore::new();
        store.insert(transaction("H1", Some("K1"))).await.unwrap();

        assert_eq!(store.get("H1").await.unwrap().handle, "H1");
        assert_eq!(store.get_by_interaction("K1").await.unwrap().handle, "H1");
        assert_eq!(store.get("nope").await, Err(StoreError::NotFound));
        assert_eq!(store.get_by_interaction("nope").await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = TransactionStore::new();
        store.insert(transaction("H1", Some("K1"))).await.unwrap();

        assert_eq!(store.insert(transaction("H1", None)).await, Err(StoreError::HandleCollision));
        assert_eq!(
            store.insert(transaction("H2", Some("K1"))).await,
            Err(StoreError::HandleCollision)
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_reads_are_copies() {
        let store = TransactionStore::new();
        store.insert(transaction("H1", None)).await.unwrap();

        let mut copy = store.get("H1").await.unwrap();
        copy.state = TransactionState::Issued;

        assert_eq!(store.get("H1").await.unwrap().state, TransactionState::WaitingForAuthz);
    }

    #[tokio::test]
    async fn test_rotation_moves_handle_and_interaction_key() {
        let store = TransactionStore::new();
        store.insert(transaction("H1", Some("K1"))).await.unwrap();

        let mut tx = store.get("H1").await.unwrap();
        tx.handle = "H2".into();
        let committed = store.commit("H1", tx).await.unwrap();

        assert_eq!(committed.revision(), 1);
        assert_eq!(store.get("H1").await, Err(StoreError::NotFound));
        assert_eq!(store.get("H2").await.unwrap().handle, "H2");
        assert_eq!(store.get_by_interaction("K1").await.unwrap().handle, "H2");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_stale_handle_commit_fails() {
        let store = TransactionStore::new();
        store.insert(transaction("H1", None)).await.unwrap();

        let first = store.get("H1").await.unwrap();
        let second = store.get("H1").await.unwrap();

        let mut first = first;
        first.handle = "H2".into();
        store.commit("H1", first).await.unwrap();

        let mut second = second;
        second.handle = "H3".into();
        assert_eq!(store.commit("H1", second).await, Err(StoreError::NotFound));
        assert_eq!(store.get("H3").await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_outdated_revision_is_stale() {
        let store = TransactionStore::new();
        store.insert(transaction("H1", Some("K1"))).await.unwrap();

        let outdated = store.get("H1").await.unwrap();
        let mut resolved = store.get("H1").await.unwrap();
        resolved.interaction_key = None;
        resolved.state = TransactionState::WaitingForIssuing;
        store.commit("H1", resolved).await.unwrap();

        assert_eq!(store.commit("H1", outdated).await, Err(StoreError::Stale));
        assert_eq!(store.get("H1").await.unwrap().state, TransactionState::WaitingForIssuing);
    }

    #[tokio::test]
    async fn test_consumed_interaction_key_is_unindexed() {
        let store = TransactionStore::new();
        store.insert(transaction("H1", Some("K1"))).await.unwrap();

        let mut tx = store.get_by_interaction("K1").await.unwrap();
        tx.interaction_key = None;
        store.commit("H1", tx).await.unwrap();

        assert_eq!(store.get_by_interaction("K1").await, Err(StoreError::NotFound));
        assert_eq!(store.pending_interactions().await, 0);
        assert!(store.get("H1").await.is_ok());
    }

    #[tokio::test]
    async fn test_rotation_onto_live_handle_rejected() {
        let store = TransactionStore::new();
        store.insert(transaction("H1", None)).await.unwrap();
        store.insert(transaction("H2", None)).await.unwrap();

        let mut tx = store.get("H1").await.unwrap();
        tx.handle = "H2".into();
        assert_eq!(store.commit("H1", tx).await, Err(StoreError::HandleCollision));
        assert!(store.get("H1").await.is_ok());
    }

    #[tokio::test]
    async fn test_drop_removes_both_indices() {
        let store = TransactionStore::new();
        store.insert(transaction("H1", Some("K1"))).await.unwrap();

        assert!(store.drop_transaction("H1").await);
        assert!(!store.drop_transaction("H1").await);
        assert!(store.is_empty().await);
        assert_eq!(store.pending_interactions().await, 0);
    }
}
