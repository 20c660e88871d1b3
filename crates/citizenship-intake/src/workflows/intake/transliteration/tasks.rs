use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::AbortHandle;
use tracing::debug;

use super::{TransliterationRequest, Transliterator};

struct InFlight {
    generation: u64,
    abort: AbortHandle,
}

/// Runs lookups as tokio tasks, at most one in flight per key.
///
/// Starting a lookup for a key aborts the task still running for that key, and
/// the caller waiting on the aborted task gets `None`. The form still checks
/// generations when a result lands, since a lookup may finish just before its
/// successor is started.
pub struct TransliterationTasks<T, K> {
    transliterator: Arc<T>,
    in_flight: Mutex<HashMap<K, InFlight>>,
}

impl<T, K> TransliterationTasks<T, K>
where
    T: Transliterator + 'static,
    K: Hash + Eq + Clone,
{
    pub fn new(transliterator: Arc<T>) -> Self {
        Self {
            transliterator,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Look up `request.word` in a background task keyed by `key`.
    pub async fn run(&self, key: K, request: &TransliterationRequest) -> Option<String> {
        let transliterator = Arc::clone(&self.transliterator);
        let word = request.word.clone();
        let handle = tokio::spawn(async move { transliterator.transliterate(&word).await });

        let registration = Registration {
            tasks: self,
            key,
            generation: request.generation,
        };
        let previous = self.lock().insert(
            registration.key.clone(),
            InFlight {
                generation: request.generation,
                abort: handle.abort_handle(),
            },
        );
        if let Some(previous) = previous {
            previous.abort.abort();
        }

        let result = handle.await;
        drop(registration);
        match result {
            Ok(converted) => Some(converted),
            Err(err) => {
                debug!(
                    field = %request.field,
                    generation = request.generation,
                    cancelled = err.is_cancelled(),
                    "transliteration lookup did not finish"
                );
                None
            }
        }
    }

    pub fn cancel(&self, key: &K) {
        if let Some(entry) = self.lock().remove(key) {
            entry.abort.abort();
        }
    }

    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, K> Drop for TransliterationTasks<T, K> {
    fn drop(&mut self) {
        let in_flight = self
            .in_flight
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, entry) in in_flight.drain() {
            entry.abort.abort();
        }
    }
}

/// Clears the key's entry once its waiter is done, unless a newer lookup has
/// already taken the slot. Also runs when the waiter itself is dropped.
struct Registration<'a, T, K>
where
    T: Transliterator + 'static,
    K: Hash + Eq + Clone,
{
    tasks: &'a TransliterationTasks<T, K>,
    key: K,
    generation: u64,
}

impl<T, K> Drop for Registration<'_, T, K>
where
    T: Transliterator + 'static,
    K: Hash + Eq + Clone,
{
    fn drop(&mut self) {
        let mut in_flight = self.tasks.lock();
        if in_flight
            .get(&self.key)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            in_flight.remove(&self.key);
        }
    }
}
