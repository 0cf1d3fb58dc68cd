//! The keyspace: entry table and expiry heap under one mutation
//! discipline.
//!
//! Every operation that can move an entry in or out of the heap goes
//! through this facade, which maintains the invariant that an entry has
//! `heap_slot = Some(i)` iff the heap cell at index `i` references it.
//! All mutation happens on the reactor thread; the only work that leaves
//! it is destructor work handed to the [`DropHandle`].
//!
//! Expiry is sweep-driven: reads observe an entry until
//! [`Keyspace::sweep_expired`] pops its deadline, there is no
//! delete-on-access path.

use bytes::Bytes;

use crate::dropper::DropHandle;
use crate::error::WrongType;
use crate::expiry::ExpiryHeap;
use crate::table::EntryTable;
use crate::time::{deadline_from_ttl_ms, now_us};
use crate::types::{SortedSet, Value};

/// Cap on expirations per sweep so a mass expiry cannot stall the
/// reactor loop.
const MAX_SWEEP_PER_CYCLE: usize = 2000;

/// Result of a TTL query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    /// Key has a TTL with this many milliseconds left.
    Remaining(i64),
    /// Key exists without a TTL, or its deadline has already passed and
    /// the sweep simply hasn't collected it yet.
    NoExpiry,
    /// Key does not exist.
    Missing,
}

/// The process-local keyspace.
pub struct Keyspace {
    table: EntryTable,
    heap: ExpiryHeap,
    dropper: DropHandle,
}

impl Keyspace {
    /// A keyspace that drops values inline. The server wires in a
    /// worker pool via [`Keyspace::with_dropper`].
    pub fn new() -> Self {
        Self::with_dropper(DropHandle::inline())
    }

    pub fn with_dropper(dropper: DropHandle) -> Self {
        Self {
            table: EntryTable::new(),
            heap: ExpiryHeap::new(),
            dropper,
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Reads the raw value for a key.
    pub fn value(&self, key: &[u8]) -> Option<&Value> {
        let id = self.table.find(key)?;
        self.table.get(id).map(|e| &e.value)
    }

    /// Reads a string value. A key of another type is a type error.
    pub fn get_string(&self, key: &[u8]) -> Result<Option<&Bytes>, WrongType> {
        match self.value(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(WrongType),
        }
    }

    /// Creates or replaces `key` with a string value. A replaced entry
    /// loses any TTL it had.
    pub fn set_string(&mut self, key: Bytes, value: Bytes) {
        self.create(key, Value::String(value));
    }

    /// Adds `member` to the sorted set at `key`, creating the set if the
    /// key is absent. Returns `true` if the member was newly added.
    pub fn zadd(&mut self, key: &Bytes, member: Bytes, score: f64) -> Result<bool, WrongType> {
        if let Some(id) = self.table.find(key) {
            if let Some(entry) = self.table.get_mut(id) {
                return match &mut entry.value {
                    Value::SortedSet(zset) => Ok(zset.add(member, score)),
                    _ => Err(WrongType),
                };
            }
        }

        let mut zset = SortedSet::new();
        zset.add(member, score);
        self.create(key.clone(), Value::SortedSet(zset));
        Ok(true)
    }

    /// Removes `member` from the sorted set at `key`. A missing key
    /// counts as "not removed", not an error.
    pub fn zrem(&mut self, key: &[u8], member: &[u8]) -> Result<bool, WrongType> {
        let Some(id) = self.table.find(key) else {
            return Ok(false);
        };
        let Some(entry) = self.table.get_mut(id) else {
            return Ok(false);
        };
        match &mut entry.value {
            Value::SortedSet(zset) => Ok(zset.remove(member)),
            _ => Err(WrongType),
        }
    }

    /// Returns `true` if the key exists.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.table.find(key).is_some()
    }

    /// Deletes a key, evicting its heap cell if it had a TTL.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        let Some((_, entry)) = self.table.remove(key) else {
            return false;
        };
        if let Some(slot) = entry.heap_slot {
            self.heap.remove(slot, &mut self.table);
        }
        self.dropper.defer(entry.value);
        true
    }

    /// Empties the table and the heap.
    pub fn clear_all(&mut self) {
        self.heap.clear();
        let drained = self.table.clear();
        self.dropper.defer_entries(drained);
    }

    /// Applies a TTL to an existing key. A non-positive TTL deletes the
    /// key outright. Returns `false` iff the key is missing.
    pub fn pexpire(&mut self, key: &[u8], ttl_ms: i64) -> bool {
        let Some(id) = self.table.find(key) else {
            return false;
        };
        if ttl_ms <= 0 {
            return self.delete(key);
        }

        let deadline = deadline_from_ttl_ms(ttl_ms);
        let slot = self.table.get(id).and_then(|e| e.heap_slot);
        match slot {
            Some(slot) => self.heap.update(slot, deadline, &mut self.table),
            None => self.heap.push(deadline, id, &mut self.table),
        }
        true
    }

    /// Remaining TTL for a key, per the PTTL sentinel policy.
    pub fn ttl(&self, key: &[u8]) -> TtlStatus {
        let Some(id) = self.table.find(key) else {
            return TtlStatus::Missing;
        };
        let Some(entry) = self.table.get(id) else {
            return TtlStatus::Missing;
        };
        let Some(slot) = entry.heap_slot else {
            return TtlStatus::NoExpiry;
        };
        let Some(cell) = self.heap.cell(slot) else {
            return TtlStatus::NoExpiry;
        };

        let remaining_ms = (cell.deadline_us.saturating_sub(now_us()) / 1000) as i64;
        if remaining_ms > 0 {
            TtlStatus::Remaining(remaining_ms)
        } else {
            TtlStatus::NoExpiry
        }
    }

    /// Deletes every entry whose deadline is at or before `now_us`,
    /// up to the per-cycle work cap. Returns the number deleted.
    pub fn sweep_expired(&mut self, now_us: u64) -> usize {
        let mut swept = 0;
        while swept < MAX_SWEEP_PER_CYCLE {
            match self.heap.top() {
                Some(cell) if cell.deadline_us <= now_us => {}
                _ => break,
            }
            let Some(cell) = self.heap.pop(&mut self.table) else {
                break;
            };
            if let Some(entry) = self.table.remove_by_id(cell.entry) {
                tracing::debug!(key = ?entry.key, "expired");
                self.dropper.defer(entry.value);
            }
            swept += 1;
        }
        swept
    }

    /// Earliest expiry deadline, for deriving the reactor poll timeout.
    pub fn next_deadline_us(&self) -> Option<u64> {
        self.heap.top().map(|cell| cell.deadline_us)
    }

    fn create(&mut self, key: Bytes, value: Value) {
        let (_, replaced) = self.table.insert(key, value);
        if let Some(old) = replaced {
            if let Some(slot) = old.heap_slot {
                self.heap.remove(slot, &mut self.table);
            }
            self.dropper.defer(old.value);
        }
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    /// Heap/table back-pointers are mutually consistent, and the set of
    /// heap cells equals the set of entries that carry a TTL.
    fn assert_consistent(ks: &Keyspace) {
        let mut with_ttl = 0;
        for (id, entry) in ks.table.entries() {
            if let Some(slot) = entry.heap_slot {
                with_ttl += 1;
                let cell = ks.heap.cell(slot).expect("heap_slot in bounds");
                assert_eq!(cell.entry, id, "cell must point back at its entry");
            }
        }
        assert_eq!(with_ttl, ks.heap.len(), "every heap cell owns a live entry");
    }

    #[test]
    fn set_get_del_lifecycle() {
        let mut ks = Keyspace::new();
        ks.set_string(b("foo"), b("bar"));
        assert_eq!(ks.get_string(b"foo").unwrap().unwrap().as_ref(), b"bar");
        assert!(ks.delete(b"foo"));
        assert_eq!(ks.get_string(b"foo").unwrap(), None);
        assert!(!ks.delete(b"foo"));
    }

    #[test]
    fn set_replaces_value_and_clears_ttl() {
        let mut ks = Keyspace::new();
        ks.set_string(b("k"), b("v1"));
        assert!(ks.pexpire(b"k", 60_000));
        assert_eq!(ks.heap.len(), 1);

        ks.set_string(b("k"), b("v2"));
        assert_eq!(ks.ttl(b"k"), TtlStatus::NoExpiry);
        assert_eq!(ks.heap.len(), 0);
        assert_consistent(&ks);
    }

    #[test]
    fn get_on_zset_key_is_type_error() {
        let mut ks = Keyspace::new();
        ks.zadd(&b("lb"), b("alice"), 1.0).unwrap();
        assert_eq!(ks.get_string(b"lb"), Err(WrongType));
    }

    #[test]
    fn zadd_creates_then_updates() {
        let mut ks = Keyspace::new();
        assert!(ks.zadd(&b("lb"), b("alice"), 10.0).unwrap());
        assert!(!ks.zadd(&b("lb"), b("alice"), 20.0).unwrap());
        assert!(ks.zadd(&b("lb"), b("bob"), 5.0).unwrap());
        assert_eq!(ks.len(), 1);
    }

    #[test]
    fn zadd_on_string_key_is_type_error() {
        let mut ks = Keyspace::new();
        ks.set_string(b("k"), b("v"));
        assert_eq!(ks.zadd(&b("k"), b("m"), 1.0), Err(WrongType));
    }

    #[test]
    fn zrem_semantics() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.zrem(b"missing", b"m"), Ok(false));

        ks.zadd(&b("lb"), b("alice"), 1.0).unwrap();
        assert_eq!(ks.zrem(b"lb", b"alice"), Ok(true));
        assert_eq!(ks.zrem(b"lb", b"alice"), Ok(false));

        ks.set_string(b("s"), b("v"));
        assert_eq!(ks.zrem(b"s", b"m"), Err(WrongType));
    }

    #[test]
    fn pexpire_missing_key_is_false() {
        let mut ks = Keyspace::new();
        assert!(!ks.pexpire(b"nope", 1000));
    }

    #[test]
    fn pexpire_zero_deletes_the_key() {
        let mut ks = Keyspace::new();
        ks.set_string(b("k"), b("v"));
        assert!(ks.pexpire(b"k", 0));
        assert!(!ks.exists(b"k"));
        assert_consistent(&ks);
    }

    #[test]
    fn pexpire_twice_updates_in_place() {
        let mut ks = Keyspace::new();
        ks.set_string(b("k"), b("v"));
        assert!(ks.pexpire(b"k", 50_000));
        assert!(ks.pexpire(b"k", 500_000));
        assert_eq!(ks.heap.len(), 1);

        match ks.ttl(b"k") {
            TtlStatus::Remaining(ms) => assert!(ms > 60_000, "ttl was extended, got {ms}"),
            other => panic!("expected Remaining, got {other:?}"),
        }
        assert_consistent(&ks);
    }

    #[test]
    fn ttl_sentinels() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.ttl(b"missing"), TtlStatus::Missing);

        ks.set_string(b("plain"), b("v"));
        assert_eq!(ks.ttl(b"plain"), TtlStatus::NoExpiry);

        ks.set_string(b("timed"), b("v"));
        ks.pexpire(b"timed", 60_000);
        match ks.ttl(b"timed") {
            TtlStatus::Remaining(ms) => assert!(ms > 0 && ms <= 60_000),
            other => panic!("expected Remaining, got {other:?}"),
        }
    }

    #[test]
    fn sweep_removes_due_entries_only() {
        let mut ks = Keyspace::new();
        ks.set_string(b("soon"), b("v"));
        ks.set_string(b("later"), b("v"));
        ks.set_string(b("never"), b("v"));
        ks.pexpire(b"soon", 10);
        ks.pexpire(b"later", 60_000);

        let removed = ks.sweep_expired(now_us() + 1_000_000);
        assert_eq!(removed, 1);
        assert!(!ks.exists(b"soon"));
        assert!(ks.exists(b"later"));
        assert!(ks.exists(b"never"));
        assert_consistent(&ks);

        assert_eq!(ks.ttl(b"soon"), TtlStatus::Missing);
    }

    #[test]
    fn flushall_is_idempotent() {
        let mut ks = Keyspace::new();
        ks.set_string(b("a"), b("1"));
        ks.pexpire(b"a", 60_000);
        ks.zadd(&b("z"), b("m"), 1.0).unwrap();

        ks.clear_all();
        assert!(ks.is_empty());
        assert_eq!(ks.heap.len(), 0);

        ks.clear_all();
        assert!(ks.is_empty());
    }

    #[test]
    fn next_deadline_tracks_heap_root() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.next_deadline_us(), None);

        ks.set_string(b("a"), b("v"));
        ks.set_string(b("b"), b("v"));
        ks.pexpire(b"a", 60_000);
        ks.pexpire(b"b", 1_000);

        let deadline = ks.next_deadline_us().unwrap();
        assert!(deadline <= now_us() + 1_500_000);
    }

    proptest! {
        // after any sequence of SET/DEL/PEXPIRE/FLUSHALL (plus sweeps),
        // the heap and the TTL-carrying entries are the same set,
        // linked by correct back-pointers
        #[test]
        fn mutation_sequences_keep_heap_consistent(ops in prop::collection::vec(
            (0u8..5, 0u8..8, 1i64..10_000),
            1..96,
        )) {
            let mut ks = Keyspace::new();
            for (op, key, ttl) in ops {
                let key = Bytes::copy_from_slice(format!("k{key}").as_bytes());
                match op {
                    0 => ks.set_string(key, Bytes::from_static(b"v")),
                    1 => { ks.delete(&key); }
                    2 => { ks.pexpire(&key, ttl); }
                    3 => { ks.sweep_expired(now_us()); }
                    _ => {
                        if ttl % 7 == 0 {
                            ks.clear_all();
                        } else {
                            let _ = ks.zadd(&key, Bytes::from_static(b"m"), ttl as f64);
                        }
                    }
                }
                assert_consistent(&ks);
            }
        }
    }
}
