//! Background value dropper.
//!
//! Destroying a large sorted set frees one allocation per member, which
//! is too much work to do on the reactor thread mid-command. DEL,
//! FLUSHALL, and TTL sweeps hand large values to a small pool of worker
//! threads whose only job is to let destructors run.
//!
//! Workers are plain `std::thread`s: dropping data structures is
//! CPU-bound work with no reason to touch the reactor. Only the value is
//! handed over; every keyspace mutation itself stays on the reactor
//! thread.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};

use crate::table::Entry;
use crate::types::Value;

/// Bounded channel capacity. Large enough to absorb bursts without
/// meaningful memory overhead.
const DROP_CHANNEL_CAPACITY: usize = 4096;

/// Sorted sets above this member count are worth the channel hop.
const LARGE_SET_THRESHOLD: usize = 1000;

/// Items sent to the drop pool. The fields are never read; the workers
/// receive them and let their destructors run.
#[allow(dead_code)]
enum Droppable {
    /// A single value removed from the keyspace (DEL, replace, sweep).
    Value(Value),
    /// All entries drained by FLUSHALL, dropped in bulk.
    Entries(Vec<Entry>),
}

/// A cloneable handle for deferring expensive drops to the pool.
///
/// When all handles are gone the channel closes and the workers exit.
#[derive(Debug, Clone)]
pub struct DropHandle {
    tx: Option<SyncSender<Droppable>>,
}

impl DropHandle {
    /// Spawns `workers` drop threads and returns a handle.
    ///
    /// A failed thread spawn is logged and tolerated: with no receivers
    /// alive the channel disconnects and everything drops inline.
    pub fn spawn(workers: usize) -> Self {
        let (tx, rx) = mpsc::sync_channel::<Droppable>(DROP_CHANNEL_CAPACITY);
        let rx = Arc::new(Mutex::new(rx));

        for i in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            if let Err(e) = std::thread::Builder::new()
                .name(format!("cinder-drop-{i}"))
                .spawn(move || drain(&rx))
            {
                tracing::warn!("failed to spawn drop worker {i}: {e}");
            }
        }

        Self { tx: Some(tx) }
    }

    /// A handle that drops everything inline, for tests and tools that
    /// don't want background threads.
    pub fn inline() -> Self {
        Self { tx: None }
    }

    /// Defers dropping a value if it's large enough to be worth the
    /// channel overhead; small values drop inline. Never blocks: a full
    /// or disconnected channel falls back to an inline drop.
    pub fn defer(&self, value: Value) {
        if !is_large(&value) {
            return;
        }
        self.send(Droppable::Value(value));
    }

    /// Defers dropping the entries drained by a flush. Always deferred,
    /// a full keyspace is always worth offloading.
    pub(crate) fn defer_entries(&self, entries: Vec<Entry>) {
        if entries.is_empty() {
            return;
        }
        self.send(Droppable::Entries(entries));
    }

    fn send(&self, item: Droppable) {
        let Some(tx) = &self.tx else {
            return; // inline handle, item drops here
        };
        match tx.try_send(item) {
            Ok(()) => {}
            Err(TrySendError::Full(item)) | Err(TrySendError::Disconnected(item)) => {
                // pool unavailable or behind, drop inline
                drop(item);
            }
        }
    }
}

/// Worker loop: receive and drop until the channel closes.
fn drain(rx: &Mutex<Receiver<Droppable>>) {
    loop {
        let item = {
            let Ok(guard) = rx.lock() else {
                return;
            };
            guard.recv()
        };
        match item {
            Ok(item) => drop(item),
            Err(_) => return,
        }
    }
}

fn is_large(value: &Value) -> bool {
    match value {
        Value::String(_) => false,
        Value::SortedSet(zset) => zset.len() > LARGE_SET_THRESHOLD,
    }
}
