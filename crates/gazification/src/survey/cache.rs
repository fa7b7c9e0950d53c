use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{MunicipalityId, Question};
use super::repository::{RepositoryError, SurveyRepository};

struct CacheEntry<V> {
    value: V,
    loaded_at: Instant,
}

/// Read-through cache whose entries expire a fixed time after loading.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.lock();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.loaded_at.elapsed() < ttl);
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        self.lock().insert(
            key,
            CacheEntry {
                value,
                loaded_at: Instant::now(),
            },
        );
    }

    /// Returns the fresh cached value or runs `loader` and caches its result.
    /// Loader failures are returned as-is and leave the slot empty.
    pub fn get_or_load<E, F>(&self, key: K, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = loader()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, key: &K) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reference tables cached in front of the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKey {
    Municipalities,
    Questions,
}

pub type MunicipalityNames = Arc<HashMap<MunicipalityId, String>>;

/// Municipality names and the question catalog, loaded on demand and shared
/// between requests until the TTL passes or a write invalidates them.
pub struct ReferenceData {
    municipalities: TtlCache<ReferenceKey, MunicipalityNames>,
    questions: TtlCache<ReferenceKey, Arc<Vec<Question>>>,
}

impl ReferenceData {
    pub fn new(ttl: Duration) -> Self {
        Self {
            municipalities: TtlCache::new(ttl),
            questions: TtlCache::new(ttl),
        }
    }

    pub fn municipality_names<R>(&self, repository: &R) -> Result<MunicipalityNames, RepositoryError>
    where
        R: SurveyRepository + ?Sized,
    {
        self.municipalities
            .get_or_load(ReferenceKey::Municipalities, || {
                let names = repository
                    .municipalities()?
                    .into_iter()
                    .map(|municipality| (municipality.id, municipality.name))
                    .collect::<HashMap<_, _>>();
                debug!(count = names.len(), "municipality names loaded");
                Ok(Arc::new(names))
            })
    }

    pub fn questions<R>(&self, repository: &R) -> Result<Arc<Vec<Question>>, RepositoryError>
    where
        R: SurveyRepository + ?Sized,
    {
        self.questions.get_or_load(ReferenceKey::Questions, || {
            let mut questions = repository.questions()?;
            questions.sort_by_key(|question| (question.order, question.id));
            debug!(count = questions.len(), "question catalog loaded");
            Ok(Arc::new(questions))
        })
    }

    pub fn invalidate(&self, key: ReferenceKey) -> bool {
        match key {
            ReferenceKey::Municipalities => self.municipalities.invalidate(&key),
            ReferenceKey::Questions => self.questions.invalidate(&key),
        }
    }

    pub fn invalidate_all(&self) {
        self.municipalities.clear();
        self.questions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn loads_once_while_fresh() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        let calls = Cell::new(0);
        let load = || -> Result<u32, ()> {
            calls.set(calls.get() + 1);
            Ok(42)
        };

        assert_eq!(cache.get_or_load("answer", load), Ok(42));
        assert_eq!(cache.get_or_load("answer", load), Ok(42));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn zero_ttl_always_reloads() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::ZERO);
        let calls = Cell::new(0);
        let load = || -> Result<u32, ()> {
            calls.set(calls.get() + 1);
            Ok(calls.get())
        };

        assert_eq!(cache.get_or_load("counter", load), Ok(1));
        assert_eq!(cache.get_or_load("counter", load), Ok(2));
    }

    #[test]
    fn invalidate_forces_reload() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("key", 1);
        assert!(cache.invalidate(&"key"));
        assert!(!cache.invalidate(&"key"));
        assert_eq!(cache.get(&"key"), None);

        let reloaded = cache.get_or_load("key", || -> Result<u32, ()> { Ok(2) });
        assert_eq!(reloaded, Ok(2));
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        let failed = cache.get_or_load("key", || Err("offline"));
        assert_eq!(failed, Err("offline"));
        assert_eq!(cache.get(&"key"), None);
    }

    #[test]
    fn clear_drops_everything() {
        let cache: TtlCache<u8, u8> = TtlCache::new(Duration::from_secs(60));
        cache.insert(1, 1);
        cache.insert(2, 2);
        cache.clear();
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), None);
    }
}
