use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Last good result per key, bounded to `capacity` keys. The oldest key is
/// evicted first.
pub(crate) struct FallbackCache<T> {
    capacity: usize,
    inner: Mutex<Entries<T>>,
}

struct Entries<T> {
    values: HashMap<String, T>,
    order: VecDeque<String>,
}

impl<T: Clone> FallbackCache<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Entries {
                values: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<T> {
        let entries = self.inner.lock().ok()?;
        entries.values.get(key).cloned()
    }

    /// Replacing an existing key refreshes its position.
    pub(crate) fn put(&self, key: &str, value: T) {
        let Ok(mut entries) = self.inner.lock() else {
            return;
        };
        if entries.values.insert(key.to_string(), value).is_some() {
            entries.order.retain(|k| k != key);
        }
        entries.order.push_back(key.to_string());
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.values.remove(&oldest);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().map(|e| e.values.len()).unwrap_or(0)
    }
}
