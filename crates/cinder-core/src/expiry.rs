//! Expiry heap: a binary min-heap of entry deadlines.
//!
//! Each cell carries `(deadline_us, EntryId)`. The entry on the other
//! side of the handle stores its current heap index in `heap_slot`, and
//! every cell move (push, pop, swap, sift) rewrites that field through
//! [`EntryTable::set_heap_slot`] so the back-pointers never go stale.
//!
//! `update` re-sifts a single cell whose deadline changed, choosing
//! direction by comparing against the parent. `remove` extracts an
//! arbitrary index by swapping it with the last cell and re-sifting,
//! rather than popping the root.

use crate::table::{EntryId, EntryTable};

/// One heap cell: an absolute monotonic deadline plus the handle of the
/// entry it expires.
#[derive(Debug, Clone, Copy)]
pub struct HeapCell {
    pub deadline_us: u64,
    pub entry: EntryId,
}

/// Min-heap over [`HeapCell`] by deadline.
#[derive(Debug, Default)]
pub struct ExpiryHeap {
    cells: Vec<HeapCell>,
}

impl ExpiryHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The cell with the earliest deadline, if any.
    pub fn top(&self) -> Option<&HeapCell> {
        self.cells.first()
    }

    /// Reads the cell at heap index `i`.
    pub fn cell(&self, i: usize) -> Option<&HeapCell> {
        self.cells.get(i)
    }

    /// Inserts a cell for `entry` and records its slot in the table.
    pub fn push(&mut self, deadline_us: u64, entry: EntryId, table: &mut EntryTable) {
        self.cells.push(HeapCell { deadline_us, entry });
        let last = self.cells.len() - 1;
        table.set_heap_slot(entry, Some(last));
        self.sift_up(last, table);
    }

    /// Removes and returns the root cell. The popped entry's heap slot
    /// is cleared; the cell moved into the root is re-sifted.
    pub fn pop(&mut self, table: &mut EntryTable) -> Option<HeapCell> {
        if self.cells.is_empty() {
            return None;
        }
        table.set_heap_slot(self.cells[0].entry, None);
        let cell = self.cells.swap_remove(0);
        if !self.cells.is_empty() {
            table.set_heap_slot(self.cells[0].entry, Some(0));
            self.sift_down(0, table);
        }
        Some(cell)
    }

    /// Removes the cell at index `i`, swapping the last cell into its
    /// place and re-sifting in whichever direction restores order.
    pub fn remove(&mut self, i: usize, table: &mut EntryTable) -> Option<HeapCell> {
        if i >= self.cells.len() {
            return None;
        }
        table.set_heap_slot(self.cells[i].entry, None);
        let cell = self.cells.swap_remove(i);
        if i < self.cells.len() {
            table.set_heap_slot(self.cells[i].entry, Some(i));
            self.resift(i, table);
        }
        Some(cell)
    }

    /// Rewrites the deadline of the cell at index `i` and re-sifts it.
    pub fn update(&mut self, i: usize, deadline_us: u64, table: &mut EntryTable) {
        if let Some(cell) = self.cells.get_mut(i) {
            cell.deadline_us = deadline_us;
            self.resift(i, table);
        }
    }

    /// Swaps the cells at `i` and `j`, updating both back-pointers.
    pub fn swap(&mut self, i: usize, j: usize, table: &mut EntryTable) {
        self.cells.swap(i, j);
        table.set_heap_slot(self.cells[i].entry, Some(i));
        table.set_heap_slot(self.cells[j].entry, Some(j));
    }

    /// Drops all cells. The caller is responsible for the corresponding
    /// entries (FLUSHALL drains the whole table anyway).
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Re-sifts position `i`, assuming only it may violate heap order.
    fn resift(&mut self, i: usize, table: &mut EntryTable) {
        if i > 0 && self.cells[i].deadline_us < self.cells[parent(i)].deadline_us {
            self.sift_up(i, table);
        } else {
            self.sift_down(i, table);
        }
    }

    fn sift_up(&mut self, mut i: usize, table: &mut EntryTable) {
        while i > 0 {
            let p = parent(i);
            if self.cells[i].deadline_us >= self.cells[p].deadline_us {
                break;
            }
            self.swap(i, p, table);
            i = p;
        }
    }

    fn sift_down(&mut self, mut i: usize, table: &mut EntryTable) {
        let len = self.cells.len();
        loop {
            let left = i * 2 + 1;
            let right = i * 2 + 2;
            let mut smallest = i;

            if left < len && self.cells[left].deadline_us < self.cells[smallest].deadline_us {
                smallest = left;
            }
            if right < len && self.cells[right].deadline_us < self.cells[smallest].deadline_us {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.swap(i, smallest, table);
            i = smallest;
        }
    }
}

fn parent(i: usize) -> usize {
    (i - 1) / 2
}
