use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;

/// Initialize-once slot for a shared, read-only model handle.
///
/// The lock is held across the load so concurrent first callers trigger a
/// single load. An `Err` from the loader leaves the slot empty.
#[derive(Debug)]
pub struct ModelCache<C> {
    slot: Mutex<Option<Arc<C>>>,
}

impl<C> ModelCache<C> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<C>>
    where
        F: FnOnce() -> Result<C>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        let model = Arc::new(load()?);
        *slot = Some(Arc::clone(&model));
        tracing::info!("Model loaded and cached");
        Ok(model)
    }

    pub fn get(&self) -> Option<Arc<C>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.get().is_some()
    }
}

impl<C> Default for ModelCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_loads_once_and_returns_same_handle() {
        let cache = ModelCache::new();
        let reads = AtomicUsize::new(0);
        let load = || {
            reads.fetch_add(1, Ordering::SeqCst);
            Ok(String::from("weights"))
        };

        let first = cache.get_or_load(load).unwrap();
        for _ in 0..5 {
            let again = cache.get_or_load(load).unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(cache.is_loaded());
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache: ModelCache<u32> = ModelCache::new();
        let err = cache
            .get_or_load(|| Err(AppError::ModelUnavailable("model not found".into())))
            .unwrap_err();
        assert!(err.is_model_unavailable());
        assert!(cache.get().is_none());

        let model = cache.get_or_load(|| Ok(7)).unwrap();
        assert_eq!(*model, 7);
    }

    #[test]
    fn test_concurrent_first_calls_load_once() {
        let cache: ModelCache<usize> = ModelCache::new();
        let reads = AtomicUsize::new(0);

        let handles: Vec<Arc<usize>> = thread::scope(|s| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        cache
                            .get_or_load(|| Ok(reads.fetch_add(1, Ordering::SeqCst)))
                            .unwrap()
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
