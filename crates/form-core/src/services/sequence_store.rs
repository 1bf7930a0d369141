//! Per-template sequence allocation
//!
//! The repository only offers find/create/update; this wrapper turns
//! "read last number, compute next, write next" into one critical section per
//! template so concurrent submissions never share a number.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{FormsError, Result};
use crate::workflow::traits::SequenceRepository;
use crate::workflow::submission_types::FormSequence;

pub struct SequenceStore {
    repository: Arc<dyn SequenceRepository>,
    /// One lock per template id; templates never contend with each other
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SequenceStore {
    pub fn new(repository: Arc<dyn SequenceRepository>) -> Self {
        Self {
            repository,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, template_id: &str) -> Result<Arc<AsyncMutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| FormsError::FolioGeneration("sequence lock table poisoned".to_string()))?;

        Ok(locks
            .entry(template_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone())
    }

    /// Current sequence, created lazily at `start_from`
    async fn load_or_create(&self, template_id: &str, start_from: u64) -> Result<FormSequence> {
        match self.repository.find_by_template_id(template_id).await {
            Ok(Some(sequence)) => Ok(sequence),
            Ok(None) => {
                log::info!("Creating sequence for template {} starting at {}", template_id, start_from);
                self.repository
                    .create(template_id, start_from)
                    .await
                    .map_err(|e| FormsError::FolioGeneration(e.to_string()))
            }
            Err(e) => Err(FormsError::FolioGeneration(e.to_string())),
        }
    }

    /// Allocate under the template lock; `compute` maps the current sequence
    /// to `(value, new_last_number)` and the new number is persisted
    pub async fn allocate<T, F>(&self, template_id: &str, start_from: u64, compute: F) -> Result<T>
    where
        F: FnOnce(&FormSequence) -> (T, u64) + Send,
        T: Send,
    {
        let lock = self.lock_for(template_id)?;
        let _guard = lock.lock().await;

        let sequence = self.load_or_create(template_id, start_from).await?;
        let (value, next_number) = compute(&sequence);

        self.repository
            .update(template_id, next_number)
            .await
            .map_err(|e| FormsError::FolioGeneration(e.to_string()))?;

        log::debug!("Sequence {} advanced {} -> {}", template_id, sequence.last_number, next_number);
        Ok(value)
    }

    /// Next number without reserving it
    pub async fn peek_next(&self, template_id: &str, start_from: u64) -> Result<u64> {
        let last_number = self
            .repository
            .find_by_template_id(template_id)
            .await
            .map_err(|e| FormsError::FolioGeneration(e.to_string()))?
            .map(|sequence| sequence.last_number)
            .unwrap_or(start_from);

        Ok(last_number + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_allocate_starts_after_start_from() {
        let store = SequenceStore::new(Arc::new(MemoryStore::new()));

        let first = store.allocate("tpl", 10, |s| (s.last_number + 1, s.last_number + 1)).await.unwrap();
        let second = store.allocate("tpl", 10, |s| (s.last_number + 1, s.last_number + 1)).await.unwrap();

        assert_eq!(first, 11);
        assert_eq!(second, 12);
    }

    #[tokio::test]
    async fn test_peek_does_not_advance() {
        let repository = Arc::new(MemoryStore::new());
        let store = SequenceStore::new(repository.clone());

        assert_eq!(store.peek_next("tpl", 0).await.unwrap(), 1);
        assert_eq!(store.peek_next("tpl", 0).await.unwrap(), 1);
        assert!(repository.find_by_template_id("tpl").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocations_never_repeat() {
        let store = Arc::new(SequenceStore::new(Arc::new(MemoryStore::new())));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .allocate("tpl", 0, |s| (s.last_number + 1, s.last_number + 1))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut numbers = Vec::new();
        for handle in futures::future::join_all(handles).await {
            numbers.push(handle.unwrap());
        }
        numbers.sort_unstable();

        assert_eq!(numbers, (1..=32).collect::<Vec<u64>>());
    }
}
