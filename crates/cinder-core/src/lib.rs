//! cinder-core: the storage engine.
//!
//! Owns the entry table, the expiry heap, the sorted-set type, and the
//! keyspace facade that keeps table and heap consistent. Designed for a
//! single owning thread: the reactor performs every mutation, and only
//! destructor work for large values leaves it (see [`dropper`]).

pub mod dropper;
pub mod error;
pub mod expiry;
pub mod keyspace;
pub mod table;
pub mod time;
pub mod types;

pub use dropper::DropHandle;
pub use error::WrongType;
pub use expiry::{ExpiryHeap, HeapCell};
pub use keyspace::{Keyspace, TtlStatus};
pub use table::{Entry, EntryId, EntryTable};
pub use types::{SortedSet, Value};
