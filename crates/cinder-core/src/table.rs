//! The entry table: typed key → entry storage.
//!
//! Entries live in a slab-style arena indexed by [`EntryId`]; a hash
//! index maps keys to arena slots. Handles let the expiry heap refer to
//! entries without raw pointers: a heap cell stores an `EntryId`, and
//! the heap rewrites `heap_slot` through [`EntryTable::set_heap_slot`]
//! whenever a cell moves.
//!
//! The table itself never touches the heap; the keyspace facade keeps
//! the two consistent.

use ahash::AHashMap;
use bytes::Bytes;

use crate::types::Value;

/// Stable handle to an entry's arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

/// A single keyspace record: key, typed value, and the entry's current
/// position in the expiry heap (`None` when it has no TTL).
#[derive(Debug)]
pub struct Entry {
    pub key: Bytes,
    pub value: Value,
    pub heap_slot: Option<usize>,
}

impl Entry {
    fn new(key: Bytes, value: Value) -> Self {
        Self {
            key,
            value,
            heap_slot: None,
        }
    }
}

/// Arena of entries plus the key index over them.
#[derive(Debug, Default)]
pub struct EntryTable {
    slots: Vec<Option<Entry>>,
    free: Vec<usize>,
    index: AHashMap<Bytes, EntryId>,
}

impl EntryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Looks up the entry handle for a key.
    pub fn find(&self, key: &[u8]) -> Option<EntryId> {
        self.index.get(key).copied()
    }

    /// Resolves a handle to its entry. Returns `None` for a handle whose
    /// entry has since been removed.
    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.slots.get(id.0)?.as_ref()
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    /// Rewrites an entry's heap back-pointer. Called by the expiry heap
    /// for every cell move; a stale handle is a no-op.
    pub fn set_heap_slot(&mut self, id: EntryId, slot: Option<usize>) {
        if let Some(entry) = self.slots.get_mut(id.0).and_then(Option::as_mut) {
            entry.heap_slot = slot;
        }
    }

    /// Inserts or replaces the entry for `key`. The new entry starts
    /// without a heap slot; a replaced entry is returned so the caller
    /// can evict its heap cell and dispose of its value.
    pub fn insert(&mut self, key: Bytes, value: Value) -> (EntryId, Option<Entry>) {
        if let Some(&id) = self.index.get(key.as_ref()) {
            let slot = &mut self.slots[id.0];
            let replaced = slot.replace(Entry::new(key, value));
            return (id, replaced);
        }

        let entry = Entry::new(key.clone(), value);
        let id = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(entry);
                EntryId(idx)
            }
            None => {
                self.slots.push(Some(entry));
                EntryId(self.slots.len() - 1)
            }
        };
        self.index.insert(key, id);
        (id, None)
    }

    /// Removes the entry for `key`, returning it with its handle.
    pub fn remove(&mut self, key: &[u8]) -> Option<(EntryId, Entry)> {
        let id = self.index.remove(key)?;
        let entry = self.slots[id.0].take()?;
        self.free.push(id.0);
        Some((id, entry))
    }

    /// Removes an entry by handle, e.g. when the expiry sweep pops its
    /// heap cell.
    pub fn remove_by_id(&mut self, id: EntryId) -> Option<Entry> {
        let entry = self.slots.get_mut(id.0)?.take()?;
        self.index.remove(entry.key.as_ref());
        self.free.push(id.0);
        Some(entry)
    }

    /// Empties the table, returning the drained entries.
    pub fn clear(&mut self) -> Vec<Entry> {
        self.index.clear();
        self.free.clear();
        let drained = self.slots.drain(..).flatten().collect();
        drained
    }

    /// Iterates live entries with their handles.
    pub fn entries(&self) -> impl Iterator<Item = (EntryId, &Entry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|e| (EntryId(idx), e)))
    }
}
