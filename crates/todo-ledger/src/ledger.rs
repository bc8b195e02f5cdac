use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use todo_model::{codec, Clock, Todo, TodoError};
use todo_store::{Blob, BlobStore, ItemId, StoreError};

use crate::deadline::Deadline;
use crate::error::{LedgerError, LedgerResult};

/// A todo bound to its id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub todo: Todo,
}

/// Cache of every todo, kept in lockstep with a durable store.
pub struct Ledger {
    store: Box<dyn BlobStore>,
    blobs: RwLock<HashMap<ItemId, Blob>>,
}

impl Ledger {
    /// Hydrate a ledger from the full content of `store`.
    ///
    /// `load_all` is called exactly once. Either the whole snapshot is
    /// cached or construction fails; the store is never read again.
    pub fn new(store: impl BlobStore + 'static) -> LedgerResult<Self> {
        let items = store.load_all()?;
        let mut blobs = HashMap::with_capacity(items.len());
        for item in items {
            if blobs.contains_key(&item.id) {
                return Err(StoreError::Corrupt {
                    name: item.id.to_string(),
                    reason: "duplicate id in snapshot".into(),
                }
                .into());
            }
            blobs.insert(item.id, item.blob);
        }
        info!(count = blobs.len(), "ledger hydrated");
        Ok(Self {
            store: Box::new(store),
            blobs: RwLock::new(blobs),
        })
    }

    /// Number of cached records.
    pub fn len(&self) -> LedgerResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// All cached ids, sorted.
    pub fn ids(&self) -> LedgerResult<Vec<ItemId>> {
        let mut ids: Vec<ItemId> = self.read()?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// The todo stored under `id`.
    pub fn get(&self, id: &ItemId) -> LedgerResult<Todo> {
        let blobs = self.read()?;
        let blob = blobs
            .get(id)
            .ok_or_else(|| LedgerError::NotFound(id.clone()))?;
        decode(id, blob)
    }

    /// Every todo for which `wants` returns true, in no particular order.
    ///
    /// A blob that fails to decode aborts the scan.
    pub fn filter<F>(&self, wants: F) -> LedgerResult<Vec<Item>>
    where
        F: Fn(&Todo) -> bool,
    {
        let blobs = self.read()?;
        let mut items = Vec::new();
        for (id, blob) in blobs.iter() {
            let todo = decode(id, blob)?;
            if !wants(&todo) {
                continue;
            }
            debug!(%id, "filter: included");
            items.push(Item {
                id: id.clone(),
                todo,
            });
        }
        Ok(items)
    }

    /// Create or update the todo under a caller-supplied `id`.
    ///
    /// An id already in the cache is an update (`save`); an unknown id is a
    /// first-time insert (`create`). Either way, if the store refuses the
    /// write, the cache is left exactly as it was.
    pub fn set(&self, id: &ItemId, todo: &Todo) -> LedgerResult<ItemId> {
        self.set_within(id, todo, Deadline::NONE)
    }

    /// Store `todo` under a freshly generated id.
    pub fn insert(&self, todo: &Todo) -> LedgerResult<ItemId> {
        self.set_within(&ItemId::generate(), todo, Deadline::NONE)
    }

    /// Read-modify-write of a single todo under the ledger lock.
    ///
    /// `apply` runs on a decoded copy; the result is written back only if
    /// it succeeds.
    pub fn update<F>(&self, id: &ItemId, apply: F) -> LedgerResult<Todo>
    where
        F: FnOnce(&mut Todo) -> Result<(), TodoError>,
    {
        self.update_within(id, apply, Deadline::NONE)
    }

    /// Remove `id` from the store, then from the cache.
    ///
    /// If the store refuses, the cache entry stays.
    pub fn delete(&self, id: &ItemId) -> LedgerResult<()> {
        self.delete_within(id, Deadline::NONE)
    }

    /// Merge two ongoing todos.
    ///
    /// Both sources are soft-deleted and the merged todo is stored under a
    /// new id. Every precondition is checked before anything is written; a
    /// store failure part-way through is reported as is.
    pub fn merge(&self, first: &ItemId, second: &ItemId, clock: &dyn Clock) -> LedgerResult<Item> {
        self.merge_within(first, second, clock, Deadline::NONE)
    }

    /// A handle whose writes are refused once `deadline` has passed.
    pub fn within(&self, deadline: Deadline) -> Bounded<'_> {
        Bounded {
            ledger: self,
            deadline,
        }
    }

    fn set_within(&self, id: &ItemId, todo: &Todo, deadline: Deadline) -> LedgerResult<ItemId> {
        if id.is_null() {
            return Err(LedgerError::NullId);
        }
        let blob = codec::encode(todo).map_err(LedgerError::Encode)?;
        let mut blobs = self.write()?;
        deadline.check()?;
        self.commit(&mut blobs, id, blob)?;
        Ok(id.clone())
    }

    fn update_within<F>(&self, id: &ItemId, apply: F, deadline: Deadline) -> LedgerResult<Todo>
    where
        F: FnOnce(&mut Todo) -> Result<(), TodoError>,
    {
        let mut blobs = self.write()?;
        let mut todo = {
            let blob = blobs
                .get(id)
                .ok_or_else(|| LedgerError::NotFound(id.clone()))?;
            decode(id, blob)?
        };
        apply(&mut todo)?;
        let blob = codec::encode(&todo).map_err(LedgerError::Encode)?;
        deadline.check()?;
        self.commit(&mut blobs, id, blob)?;
        Ok(todo)
    }

    fn delete_within(&self, id: &ItemId, deadline: Deadline) -> LedgerResult<()> {
        let mut blobs = self.write()?;
        deadline.check()?;
        self.store.delete(id)?;
        blobs.remove(id);
        debug!(%id, "delete: removed");
        Ok(())
    }

    fn merge_within(
        &self,
        first: &ItemId,
        second: &ItemId,
        clock: &dyn Clock,
        deadline: Deadline,
    ) -> LedgerResult<Item> {
        if first == second {
            return Err(LedgerError::SelfMerge(first.clone()));
        }
        let mut blobs = self.write()?;
        let load = |id: &ItemId| -> LedgerResult<Todo> {
            let blob = blobs
                .get(id)
                .ok_or_else(|| LedgerError::NotFound(id.clone()))?;
            decode(id, blob)
        };
        let mut a = load(first)?;
        let mut b = load(second)?;
        let merged = Todo::merge(&a, &b)?;
        a.delete(clock)?;
        b.delete(clock)?;

        let encoded = [
            codec::encode(&a).map_err(LedgerError::Encode)?,
            codec::encode(&b).map_err(LedgerError::Encode)?,
            codec::encode(&merged).map_err(LedgerError::Encode)?,
        ];
        let merged_id = ItemId::generate();
        let [blob_a, blob_b, blob_merged] = encoded;
        // Checked once: the three writes are never split by the deadline.
        deadline.check()?;
        self.commit(&mut blobs, first, blob_a)?;
        self.commit(&mut blobs, second, blob_b)?;
        self.commit(&mut blobs, &merged_id, blob_merged)?;
        info!(%first, %second, merged = %merged_id, "merged todos");
        Ok(Item {
            id: merged_id,
            todo: merged,
        })
    }

    /// Close the underlying store. The ledger is consumed.
    pub fn close(self) -> LedgerResult<()> {
        self.store.close()?;
        info!("ledger closed");
        Ok(())
    }

    /// Write `blob` to the cache, then to the store; undo the cache write if
    /// the store fails.
    fn commit(
        &self,
        blobs: &mut HashMap<ItemId, Blob>,
        id: &ItemId,
        blob: Blob,
    ) -> LedgerResult<()> {
        let bytes = blob.len();
        let staged = Staged::new(blobs, id, blob);
        let result = match staged.previous {
            Some(_) => self.store.save(id, staged.current()),
            None => self.store.create(id, staged.current()),
        };
        let is_update = staged.previous.is_some();
        match result {
            Ok(()) => {
                staged.keep();
                debug!(%id, bytes, update = is_update, "set: stored");
                Ok(())
            }
            Err(e) => {
                warn!(%id, error = %e, update = is_update, "set: store refused, rolling back cache");
                drop(staged);
                Err(e.into())
            }
        }
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, HashMap<ItemId, Blob>>> {
        self.blobs.read().map_err(|_| LedgerError::Poisoned)
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, HashMap<ItemId, Blob>>> {
        self.blobs.write().map_err(|_| LedgerError::Poisoned)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.blobs.read().map(|b| b.len()).unwrap_or(0);
        f.debug_struct("Ledger").field("item_count", &count).finish()
    }
}

/// Ledger operations bounded by a [`Deadline`].
///
/// Reads are served as usual; every write checks the deadline under the
/// ledger lock and fails with [`LedgerError::DeadlineExceeded`] instead of
/// calling the store once it has passed.
#[derive(Clone, Copy, Debug)]
pub struct Bounded<'a> {
    ledger: &'a Ledger,
    deadline: Deadline,
}

impl Bounded<'_> {
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    pub fn get(&self, id: &ItemId) -> LedgerResult<Todo> {
        self.ledger.get(id)
    }

    pub fn filter<F>(&self, wants: F) -> LedgerResult<Vec<Item>>
    where
        F: Fn(&Todo) -> bool,
    {
        self.ledger.filter(wants)
    }

    pub fn set(&self, id: &ItemId, todo: &Todo) -> LedgerResult<ItemId> {
        self.ledger.set_within(id, todo, self.deadline)
    }

    pub fn insert(&self, todo: &Todo) -> LedgerResult<ItemId> {
        self.ledger
            .set_within(&ItemId::generate(), todo, self.deadline)
    }

    pub fn update<F>(&self, id: &ItemId, apply: F) -> LedgerResult<Todo>
    where
        F: FnOnce(&mut Todo) -> Result<(), TodoError>,
    {
        self.ledger.update_within(id, apply, self.deadline)
    }

    pub fn delete(&self, id: &ItemId) -> LedgerResult<()> {
        self.ledger.delete_within(id, self.deadline)
    }

    pub fn merge(&self, first: &ItemId, second: &ItemId, clock: &dyn Clock) -> LedgerResult<Item> {
        self.ledger.merge_within(first, second, clock, self.deadline)
    }
}

fn decode(id: &ItemId, blob: &[u8]) -> LedgerResult<Todo> {
    codec::decode(blob).map_err(|source| LedgerError::Decode {
        id: id.clone(),
        source,
    })
}

/// A cache write that is undone on drop unless kept.
///
/// Restores the previous blob, or removes the entry if there was none, on
/// every exit path including unwinding.
struct Staged<'a> {
    blobs: &'a mut HashMap<ItemId, Blob>,
    id: &'a ItemId,
    previous: Option<Blob>,
    kept: bool,
}

impl<'a> Staged<'a> {
    fn new(blobs: &'a mut HashMap<ItemId, Blob>, id: &'a ItemId, blob: Blob) -> Self {
        let previous = blobs.insert(id.clone(), blob);
        Self {
            blobs,
            id,
            previous,
            kept: false,
        }
    }

    fn current(&self) -> &[u8] {
        self.blobs.get(self.id).map(Vec::as_slice).unwrap_or_default()
    }

    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for Staged<'_> {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        match self.previous.take() {
            Some(previous) => {
                self.blobs.insert(self.id.clone(), previous);
            }
            None => {
                self.blobs.remove(self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wants;
    use chrono::DateTime;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use todo_model::{ErrorKind, ManualClock, Status};
    use todo_store::{InMemoryBlobStore, StoreResult, StoredItem};

    /// In-memory store whose writes can be made to fail on demand.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryBlobStore,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn seeded(items: Vec<StoredItem>) -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryBlobStore::with_items(items),
                failing: AtomicBool::new(false),
            })
        }

        fn fail_writes(&self, on: bool) {
            self.failing.store(on, Ordering::SeqCst);
        }

        fn check(&self) -> StoreResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("injected failure".into()));
            }
            Ok(())
        }
    }

    impl BlobStore for FlakyStore {
        fn load_all(&self) -> StoreResult<Vec<StoredItem>> {
            self.inner.load_all()
        }

        fn create(&self, id: &ItemId, blob: &[u8]) -> StoreResult<()> {
            self.check()?;
            self.inner.create(id, blob)
        }

        fn save(&self, id: &ItemId, blob: &[u8]) -> StoreResult<()> {
            self.check()?;
            self.inner.save(id, blob)
        }

        fn delete(&self, id: &ItemId) -> StoreResult<()> {
            self.check()?;
            self.inner.delete(id)
        }

        fn close(&self) -> StoreResult<()> {
            self.inner.close()
        }
    }

    fn clock() -> ManualClock {
        ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap())
    }

    fn id(s: &str) -> ItemId {
        ItemId::from(s)
    }

    fn stored(key: &str, todo: &Todo) -> StoredItem {
        StoredItem::new(key, codec::encode(todo).unwrap())
    }

    fn ledger_with(todos: &[(&str, Todo)]) -> (Arc<FlakyStore>, Ledger) {
        let items = todos.iter().map(|(k, t)| stored(k, t)).collect();
        let store = FlakyStore::seeded(items);
        let ledger = Ledger::new(Arc::clone(&store)).unwrap();
        (store, ledger)
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn hydrates_full_snapshot() {
        let clock = clock();
        let (_store, ledger) = ledger_with(&[
            ("1", Todo::new("one", &clock)),
            ("2", Todo::new("two", &clock)),
        ]);
        assert_eq!(ledger.len().unwrap(), 2);
        assert_eq!(ledger.ids().unwrap(), vec![id("1"), id("2")]);
        assert_eq!(ledger.get(&id("2")).unwrap().title(), "two");
    }

    #[test]
    fn construction_fails_when_store_fails() {
        let store = InMemoryBlobStore::new();
        store.close().unwrap();
        let err = Ledger::new(store).unwrap_err();
        assert!(matches!(err, LedgerError::Store(StoreError::Closed)));
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[test]
    fn construction_rejects_duplicate_ids() {
        struct Duplicating;
        impl BlobStore for Duplicating {
            fn load_all(&self) -> StoreResult<Vec<StoredItem>> {
                Ok(vec![
                    StoredItem::new("x", b"{}".to_vec()),
                    StoredItem::new("x", b"{}".to_vec()),
                ])
            }
            fn create(&self, _: &ItemId, _: &[u8]) -> StoreResult<()> {
                Ok(())
            }
            fn save(&self, _: &ItemId, _: &[u8]) -> StoreResult<()> {
                Ok(())
            }
            fn delete(&self, _: &ItemId) -> StoreResult<()> {
                Ok(())
            }
            fn close(&self) -> StoreResult<()> {
                Ok(())
            }
        }
        let err = Ledger::new(Duplicating).unwrap_err();
        assert!(matches!(err, LedgerError::Store(StoreError::Corrupt { .. })));
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[test]
    fn get_missing_is_not_found() {
        let (_store, ledger) = ledger_with(&[]);
        let err = ledger.get(&id("nope")).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn reads_never_touch_the_store() {
        let clock = clock();
        let (store, ledger) = ledger_with(&[("1", Todo::new("one", &clock))]);
        store.close().unwrap();
        assert_eq!(ledger.get(&id("1")).unwrap().title(), "one");
        assert_eq!(ledger.filter(wants::all()).unwrap().len(), 1);
    }

    #[test]
    fn filter_all_and_none() {
        let clock = clock();
        let (_store, ledger) = ledger_with(&[
            ("1", Todo::new("one", &clock)),
            ("2", Todo::new("two", &clock)),
            ("3", Todo::new("three", &clock)),
        ]);

        let everything = ledger.filter(|_| true).unwrap();
        let ids: HashSet<_> = everything.iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids, HashSet::from([id("1"), id("2"), id("3")]));

        assert!(ledger.filter(|_| false).unwrap().is_empty());
    }

    #[test]
    fn filter_applies_predicate() {
        let clock = clock();
        let mut assigned = Todo::new("mine", &clock);
        assigned.assign("alice", &clock).unwrap();
        let (_store, ledger) = ledger_with(&[("1", Todo::new("open", &clock)), ("2", assigned)]);

        let mine = ledger.filter(wants::backlog_of("alice")).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, id("2"));
        assert_eq!(mine[0].todo.assignee(), "alice");
    }

    #[test]
    fn corrupt_entry_aborts_filter() {
        let clock = clock();
        let store = FlakyStore::seeded(vec![
            stored("good", &Todo::new("fine", &clock)),
            StoredItem::new("bad", b"not a todo".to_vec()),
        ]);
        let ledger = Ledger::new(Arc::clone(&store)).unwrap();

        let err = ledger.filter(wants::all()).unwrap_err();
        assert!(matches!(err, LedgerError::Decode { ref id, .. } if id.as_str() == "bad"));
        assert_eq!(err.kind(), ErrorKind::Decode);

        assert_eq!(ledger.get(&id("good")).unwrap().title(), "fine");
        assert_eq!(ledger.get(&id("bad")).unwrap_err().kind(), ErrorKind::Decode);
    }

    // -----------------------------------------------------------------------
    // Set
    // -----------------------------------------------------------------------

    #[test]
    fn set_creates_new_id_and_mirrors_store() {
        let clock = clock();
        let (store, ledger) = ledger_with(&[]);
        let todo = Todo::new("t1", &clock);

        let returned = ledger.set(&id("a"), &todo).unwrap();
        assert_eq!(returned, id("a"));
        assert_eq!(ledger.get(&id("a")).unwrap(), todo);
        assert_eq!(store.inner.get(&id("a")).unwrap(), codec::encode(&todo).unwrap());
    }

    #[test]
    fn set_updates_existing_id() {
        let clock = clock();
        let (store, ledger) = ledger_with(&[("a", Todo::new("t1", &clock))]);
        let mut todo = ledger.get(&id("a")).unwrap();
        todo.assign("bob", &clock).unwrap();

        ledger.set(&id("a"), &todo).unwrap();
        assert_eq!(ledger.get(&id("a")).unwrap().status(), Status::Assigned);
        assert_eq!(store.inner.get(&id("a")).unwrap(), codec::encode(&todo).unwrap());
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[test]
    fn failed_save_rolls_back_cache() {
        let clock = clock();
        let original = Todo::new("t1", &clock);
        let (store, ledger) = ledger_with(&[("a", original.clone())]);

        let mut changed = original.clone();
        changed.describe("should not stick", &clock).unwrap();
        store.fail_writes(true);

        let err = ledger.set(&id("a"), &changed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(ledger.get(&id("a")).unwrap(), original);
        assert_eq!(store.inner.get(&id("a")).unwrap(), codec::encode(&original).unwrap());
    }

    #[test]
    fn failed_create_leaves_no_entry() {
        let clock = clock();
        let (store, ledger) = ledger_with(&[]);
        store.fail_writes(true);

        let err = ledger.set(&id("new"), &Todo::new("t", &clock)).unwrap_err();
        assert!(matches!(err, LedgerError::Store(StoreError::Unavailable(_))));
        assert!(matches!(ledger.get(&id("new")), Err(LedgerError::NotFound(_))));
        assert!(ledger.is_empty().unwrap());
        assert!(store.inner.is_empty());
    }

    #[test]
    fn set_rejects_null_id() {
        let clock = clock();
        let (store, ledger) = ledger_with(&[]);
        let err = ledger.set(&ItemId::null(), &Todo::new("t", &clock)).unwrap_err();
        assert!(matches!(err, LedgerError::NullId));
        assert!(store.inner.is_empty());
    }

    #[test]
    fn insert_generates_id() {
        let clock = clock();
        let (store, ledger) = ledger_with(&[]);
        let new_id = ledger.insert(&Todo::new("t", &clock)).unwrap();
        assert!(!new_id.is_null());
        assert!(store.inner.get(&new_id).is_some());
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    #[test]
    fn update_applies_and_persists() {
        let clock = clock();
        let (store, ledger) = ledger_with(&[("a", Todo::new("t", &clock))]);
        let todo = ledger.update(&id("a"), |t| t.assign("bob", &clock)).unwrap();
        assert_eq!(todo.assignee(), "bob");
        assert_eq!(store.inner.get(&id("a")).unwrap(), codec::encode(&todo).unwrap());
    }

    #[test]
    fn rejected_transition_writes_nothing() {
        let clock = clock();
        let (store, ledger) = ledger_with(&[("a", Todo::new("t", &clock))]);
        let before = store.inner.get(&id("a")).unwrap();

        let err = ledger.update(&id("a"), |t| t.complete(&clock)).unwrap_err();
        assert!(matches!(err, LedgerError::Transition(TodoError::NotAssigned)));
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(store.inner.get(&id("a")).unwrap(), before);
    }

    #[test]
    fn failed_update_rolls_back() {
        let clock = clock();
        let (store, ledger) = ledger_with(&[("a", Todo::new("t", &clock))]);
        store.fail_writes(true);
        assert!(ledger.update(&id("a"), |t| t.assign("bob", &clock)).is_err());
        assert_eq!(ledger.get(&id("a")).unwrap().status(), Status::Pending);
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[test]
    fn delete_removes_from_store_and_cache() {
        let clock = clock();
        let (store, ledger) = ledger_with(&[("a", Todo::new("t", &clock))]);
        ledger.delete(&id("a")).unwrap();
        assert!(matches!(ledger.get(&id("a")), Err(LedgerError::NotFound(_))));
        assert!(store.inner.is_empty());
    }

    #[test]
    fn failed_delete_keeps_cache_entry() {
        let clock = clock();
        let (store, ledger) = ledger_with(&[("a", Todo::new("t", &clock))]);
        store.fail_writes(true);
        assert!(ledger.delete(&id("a")).is_err());
        assert_eq!(ledger.get(&id("a")).unwrap().title(), "t");
    }

    #[test]
    fn delete_missing_is_not_found() {
        let (_store, ledger) = ledger_with(&[]);
        let err = ledger.delete(&id("ghost")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // -----------------------------------------------------------------------
    // Merge
    // -----------------------------------------------------------------------

    #[test]
    fn merge_soft_deletes_sources_and_stores_result() {
        let clock = clock();
        let mut a = Todo::with_description("a", "x", &clock);
        a.assign("alice", &clock).unwrap();
        let b = Todo::with_description("b", "y", &clock);
        let (store, ledger) = ledger_with(&[("1", a), ("2", b)]);

        let merged = ledger.merge(&id("1"), &id("2"), &clock).unwrap();
        assert_eq!(merged.todo.title(), "a-b");
        assert_eq!(merged.todo.assignee(), "alice");
        assert_eq!(ledger.get(&merged.id).unwrap(), merged.todo);
        assert!(store.inner.get(&merged.id).is_some());

        assert_eq!(ledger.get(&id("1")).unwrap().status(), Status::Deleted);
        assert_eq!(ledger.get(&id("2")).unwrap().status(), Status::Deleted);
        assert_eq!(ledger.len().unwrap(), 3);
    }

    #[test]
    fn merge_conflict_changes_nothing() {
        let clock = clock();
        let mut a = Todo::new("a", &clock);
        a.assign("alice", &clock).unwrap();
        let mut b = Todo::new("b", &clock);
        b.assign("bob", &clock).unwrap();
        let (store, ledger) = ledger_with(&[("1", a.clone()), ("2", b.clone())]);

        let err = ledger.merge(&id("1"), &id("2"), &clock).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(ledger.get(&id("1")).unwrap(), a);
        assert_eq!(ledger.get(&id("2")).unwrap(), b);
        assert_eq!(store.inner.len(), 2);
    }

    #[test]
    fn merge_with_itself_is_rejected() {
        let clock = clock();
        let (_store, ledger) = ledger_with(&[("1", Todo::new("a", &clock))]);
        let err = ledger.merge(&id("1"), &id("1"), &clock).unwrap_err();
        assert!(matches!(err, LedgerError::SelfMerge(_)));
    }

    // -----------------------------------------------------------------------
    // Deadlines
    // -----------------------------------------------------------------------

    #[test]
    fn expired_deadline_refuses_every_write() {
        let clock = clock();
        let (store, ledger) = ledger_with(&[("1", Todo::new("a", &clock)), ("2", Todo::new("b", &clock))]);
        let snapshot = ledger.filter(wants::all()).unwrap().len();
        let bounded = ledger.within(Deadline::after(Duration::ZERO));

        let refused = [
            bounded.insert(&Todo::new("late", &clock)).map(|_| ()),
            bounded.set(&id("1"), &Todo::new("late", &clock)).map(|_| ()),
            bounded.update(&id("1"), |t| t.assign("bob", &clock)).map(|_| ()),
            bounded.delete(&id("2")),
            bounded.merge(&id("1"), &id("2"), &clock).map(|_| ()),
        ];
        for result in refused {
            let err = result.unwrap_err();
            assert!(matches!(err, LedgerError::DeadlineExceeded));
            assert_eq!(err.kind(), ErrorKind::Backend);
        }

        assert_eq!(ledger.len().unwrap(), snapshot);
        assert_eq!(store.inner.len(), 2);
        assert_eq!(ledger.get(&id("1")).unwrap().status(), Status::Pending);
        assert_eq!(bounded.get(&id("2")).unwrap().title(), "b");
    }

    #[test]
    fn preconditions_are_reported_before_the_deadline() {
        let (_store, ledger) = ledger_with(&[]);
        let bounded = ledger.within(Deadline::after(Duration::ZERO));
        let err = bounded.update(&id("ghost"), |_| Ok(())).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn open_deadline_writes_through() {
        let clock = clock();
        let (store, ledger) = ledger_with(&[]);
        let bounded = ledger.within(Deadline::after(Duration::from_secs(60)));
        let new_id = bounded.insert(&Todo::new("t", &clock)).unwrap();
        assert!(store.inner.get(&new_id).is_some());
        assert_eq!(bounded.filter(wants::all()).unwrap().len(), 1);
    }

    // -----------------------------------------------------------------------
    // End to end
    // -----------------------------------------------------------------------

    #[test]
    fn lifecycle_through_the_ledger() {
        let clock = clock();
        let (_store, ledger) = ledger_with(&[]);
        let todo_id = ledger.insert(&Todo::new("t1", &clock)).unwrap();
        assert_eq!(ledger.get(&todo_id).unwrap().status(), Status::Pending);

        let todo = ledger.update(&todo_id, |t| t.assign("bob", &clock)).unwrap();
        assert_eq!(todo.status(), Status::Assigned);
        assert_eq!(todo.assignee(), "bob");

        let err = ledger
            .update(&todo_id, |t| t.assign("carol", &clock))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(ledger.get(&todo_id).unwrap().assignee(), "bob");

        ledger.update(&todo_id, |t| t.complete(&clock)).unwrap();
        let err = ledger.update(&todo_id, |t| t.delete(&clock)).unwrap_err();
        assert!(matches!(err, LedgerError::Transition(TodoError::Finalized)));

        assert_eq!(ledger.get(&todo_id).unwrap().status(), Status::Completed);
    }

    #[test]
    fn concurrent_writers_on_distinct_ids() {
        use std::thread;

        let (store, ledger) = ledger_with(&[]);
        let ledger = Arc::new(ledger);
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    let clock = clock();
                    let key = ItemId::from(format!("t{n}"));
                    ledger.set(&key, &Todo::new(format!("todo {n}"), &clock)).unwrap();
                    ledger.update(&key, |t| t.assign("bob", &clock)).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }

        assert_eq!(ledger.len().unwrap(), 8);
        assert_eq!(store.inner.len(), 8);
        assert_eq!(ledger.filter(wants::backlog_of("bob")).unwrap().len(), 8);
    }

    #[test]
    fn close_closes_the_store() {
        let (store, ledger) = ledger_with(&[]);
        ledger.close().unwrap();
        assert!(store.inner.is_closed());
    }
}
