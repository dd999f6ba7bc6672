use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use core_types::{Table, UserId};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, trace};
use uuid::Uuid;

/// Cache key: resource table, owning user, and an optional parent scope
/// (the knowledge base for item lists).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub table: Table,
    pub owner: UserId,
    pub scope: Option<Uuid>,
}

impl QueryKey {
    pub fn new(table: Table, owner: UserId) -> Self {
        Self {
            table,
            owner,
            scope: None,
        }
    }

    pub fn scoped(table: Table, owner: UserId, scope: Uuid) -> Self {
        Self {
            table,
            owner,
            scope: Some(scope),
        }
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    stale: bool,
}

/// Shared list cache with invalidation by key, by owner+table, or by table.
///
/// Every write bumps a version counter so views can redraw on change. Each key
/// also carries an invalidation generation; a fetch that started before the
/// latest invalidation of its key lands as stale.
#[derive(Clone)]
pub struct QueryCache {
    entries: Arc<RwLock<HashMap<QueryKey, Entry>>>,
    loading: Arc<Mutex<HashMap<QueryKey, usize>>>,
    generations: Arc<Mutex<HashMap<QueryKey, u64>>>,
    version: Arc<watch::Sender<u64>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            loading: Arc::new(Mutex::new(HashMap::new())),
            generations: Arc::new(Mutex::new(HashMap::new())),
            version: Arc::new(version),
        }
    }

    /// Fresh value for `key`; stale or missing entries return `None`.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries.read();
        let entry = entries.get(key).filter(|entry| !entry.stale)?;
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Last known value for `key`, stale or not.
    pub fn peek<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries.read();
        entries.get(key)?.value.downcast_ref::<T>().cloned()
    }

    pub fn put<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        self.store(key, value, false);
    }

    /// Stores the result of the fetch tracked by `guard`. If the key was
    /// invalidated while the fetch ran, the value is kept but marked stale.
    pub fn finish_loading<T: Send + Sync + 'static>(&self, guard: LoadingGuard, value: T) {
        let stale = self.generation(&guard.key) != guard.generation;
        if stale {
            debug!(table = guard.key.table.name(), "fetch overtaken by invalidation");
        }
        self.store(guard.key.clone(), value, stale);
    }

    fn store<T: Send + Sync + 'static>(&self, key: QueryKey, value: T, stale: bool) {
        self.entries.write().insert(
            key,
            Entry {
                value: Arc::new(value),
                stale,
            },
        );
        self.bump();
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries
            .read()
            .get(key)
            .map(|entry| entry.stale)
            .unwrap_or(true)
    }

    pub fn invalidate(&self, key: &QueryKey) {
        self.mark_stale(|candidate| candidate == key);
    }

    pub fn invalidate_owner(&self, table: Table, owner: UserId) {
        self.mark_stale(|candidate| candidate.table == table && candidate.owner == owner);
    }

    pub fn invalidate_table(&self, table: Table) {
        self.mark_stale(|candidate| candidate.table == table);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
        self.advance_in_flight(|_| true);
        self.bump();
    }

    fn mark_stale(&self, matches: impl Fn(&QueryKey) -> bool) {
        let mut touched = 0_usize;
        for (key, entry) in self.entries.write().iter_mut() {
            if matches(key) {
                entry.stale = true;
                touched += 1;
            }
        }
        let in_flight = self.advance_in_flight(&matches);
        trace!(touched, in_flight, "cache entries invalidated");
        self.bump();
    }

    /// Bumps the generation of every matching key with a fetch in flight.
    fn advance_in_flight(&self, matches: impl Fn(&QueryKey) -> bool) -> usize {
        let loading = self.loading.lock();
        let mut generations = self.generations.lock();
        let mut advanced = 0_usize;
        for key in loading.keys().filter(|key| matches(key)) {
            *generations.entry(key.clone()).or_default() += 1;
            advanced += 1;
        }
        advanced
    }

    fn generation(&self, key: &QueryKey) -> u64 {
        self.generations.lock().get(key).copied().unwrap_or_default()
    }

    pub fn is_loading(&self, key: &QueryKey) -> bool {
        self.loading.lock().contains_key(key)
    }

    /// Marks `key` as loading until the returned guard drops, and remembers
    /// its invalidation generation for [`QueryCache::finish_loading`].
    pub fn begin_loading(&self, key: &QueryKey) -> LoadingGuard {
        *self.loading.lock().entry(key.clone()).or_default() += 1;
        LoadingGuard {
            loading: self.loading.clone(),
            key: key.clone(),
            generation: self.generation(key),
        }
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump(&self) {
        self.version.send_modify(|version| *version += 1);
    }
}

pub struct LoadingGuard {
    loading: Arc<Mutex<HashMap<QueryKey, usize>>>,
    key: QueryKey,
    generation: u64,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let mut loading = self.loading.lock();
        if let Some(count) = loading.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                loading.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_entries_are_hidden_from_get_but_not_peek() {
        let cache = QueryCache::new();
        let owner = Uuid::new_v4();
        let key = QueryKey::new(Table::Agents, owner);

        assert!(cache.get::<Vec<u32>>(&key).is_none());
        cache.put(key.clone(), vec![1_u32, 2]);
        assert_eq!(cache.get::<Vec<u32>>(&key), Some(vec![1, 2]));

        cache.invalidate(&key);
        assert!(cache.is_stale(&key));
        assert!(cache.get::<Vec<u32>>(&key).is_none());
        assert_eq!(cache.peek::<Vec<u32>>(&key), Some(vec![1, 2]));
    }

    #[test]
    fn table_invalidation_spans_owners_and_scopes() {
        let cache = QueryCache::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let alice_items = QueryKey::scoped(Table::KnowledgeItems, alice, Uuid::new_v4());
        let bob_items = QueryKey::scoped(Table::KnowledgeItems, bob, Uuid::new_v4());
        let alice_agents = QueryKey::new(Table::Agents, alice);
        for key in [&alice_items, &bob_items, &alice_agents] {
            cache.put(key.clone(), 0_u8);
        }

        cache.invalidate_owner(Table::KnowledgeItems, alice);
        assert!(cache.is_stale(&alice_items));
        assert!(!cache.is_stale(&bob_items));

        cache.invalidate_table(Table::KnowledgeItems);
        assert!(cache.is_stale(&bob_items));
        assert!(!cache.is_stale(&alice_agents));
    }

    #[test]
    fn wrong_type_reads_as_missing() {
        let cache = QueryCache::new();
        let key = QueryKey::new(Table::KnowledgeBases, Uuid::new_v4());
        cache.put(key.clone(), "text".to_owned());
        assert!(cache.get::<Vec<u8>>(&key).is_none());
    }

    #[test]
    fn loading_guard_clears_on_drop_and_version_moves() {
        let cache = QueryCache::new();
        let key = QueryKey::new(Table::Agents, Uuid::new_v4());
        let start = cache.version();
        {
            let _guard = cache.begin_loading(&key);
            assert!(cache.is_loading(&key));
        }
        assert!(!cache.is_loading(&key));

        cache.put(key.clone(), 1_u8);
        cache.invalidate(&key);
        assert_eq!(cache.version(), start + 2);
    }

    #[test]
    fn invalidation_during_a_fetch_leaves_the_result_stale() {
        let cache = QueryCache::new();
        let owner = Uuid::new_v4();
        let key = QueryKey::new(Table::KnowledgeBases, owner);

        let guard = cache.begin_loading(&key);
        cache.invalidate_owner(Table::KnowledgeBases, owner);
        cache.finish_loading(guard, vec![1_u8]);
        assert!(cache.is_stale(&key));
        assert!(!cache.is_loading(&key));
        assert_eq!(cache.peek::<Vec<u8>>(&key), Some(vec![1]));

        let guard = cache.begin_loading(&key);
        cache.finish_loading(guard, vec![1_u8, 2]);
        assert_eq!(cache.get::<Vec<u8>>(&key), Some(vec![1, 2]));
    }

    #[test]
    fn overlapping_fetches_keep_the_key_loading() {
        let cache = QueryCache::new();
        let key = QueryKey::new(Table::Agents, Uuid::new_v4());
        let first = cache.begin_loading(&key);
        let second = cache.begin_loading(&key);
        drop(first);
        assert!(cache.is_loading(&key));

        cache.clear();
        cache.finish_loading(second, 0_u8);
        assert!(cache.is_stale(&key));
        assert!(!cache.is_loading(&key));
    }
}
