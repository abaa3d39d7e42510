//! Frame-keyed history stores backing rollback.
//!
//! Three parallel stores, each keyed by frame number:
//!
//! - **confirmed inputs** — per (frame, slot): the authoritative input,
//!   present once received from its owner or produced locally. Monotonic;
//!   never retroactively changed.
//! - **used inputs** — per frame: the full input map actually fed to the
//!   simulator when that frame was stepped, possibly containing
//!   predictions. Compared against late-arriving confirmed inputs to detect
//!   mispredictions, and overwritten during rollback re-simulation.
//! - **state snapshots** — per frame: the opaque snapshot captured *before*
//!   stepping that frame.
//!
//! All three are backed by a power-of-two ring buffer indexed by
//! `frame mod capacity` with a frame-tag occupancy sentinel, so lookups are
//! O(1), pruning is a bounded sweep and the steady-state path performs no
//! allocation.

use smallvec::SmallVec;

use crate::{Config, Frame, InputVec};

/// One occupied ring cell: the frame it belongs to plus the payload.
#[derive(Debug, Clone)]
struct Cell<V> {
    frame: Frame,
    value: V,
}

/// A fixed-capacity ring buffer keyed by frame number.
///
/// A cell is addressed by `frame mod capacity` and considered occupied only
/// if its stored frame tag matches the requested frame; inserting a frame
/// whose cell is occupied by another frame evicts the older entry. Capacity
/// is rounded up to a power of two at construction.
#[derive(Debug, Clone)]
pub struct FrameRing<V> {
    cells: Vec<Option<Cell<V>>>,
}

impl<V> FrameRing<V> {
    /// Creates a ring with at least `min_capacity` cells.
    #[must_use]
    pub fn new(min_capacity: usize) -> Self {
        let capacity = min_capacity.max(2).next_power_of_two();
        let mut cells = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            cells.push(None);
        }
        Self { cells }
    }

    /// Returns the ring capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Returns the number of occupied cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Returns `true` if no cell is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn index(&self, frame: Frame) -> Option<usize> {
        frame.buffer_index(self.cells.len())
    }

    /// Inserts a value for `frame`, evicting whatever occupied its cell.
    /// Negative frames are ignored.
    pub fn insert(&mut self, frame: Frame, value: V) {
        if let Some(idx) = self.index(frame) {
            self.cells[idx] = Some(Cell { frame, value });
        }
    }

    /// Returns the value stored for exactly `frame`, if present.
    #[must_use]
    pub fn get(&self, frame: Frame) -> Option<&V> {
        let idx = self.index(frame)?;
        match &self.cells[idx] {
            Some(cell) if cell.frame == frame => Some(&cell.value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the value stored for exactly `frame`.
    #[must_use]
    pub fn get_mut(&mut self, frame: Frame) -> Option<&mut V> {
        let idx = self.index(frame)?;
        match &mut self.cells[idx] {
            Some(cell) if cell.frame == frame => Some(&mut cell.value),
            _ => None,
        }
    }

    /// Returns `true` if a value is stored for exactly `frame`.
    #[must_use]
    pub fn contains(&self, frame: Frame) -> bool {
        self.get(frame).is_some()
    }

    /// Removes every entry with a frame strictly below `threshold`.
    pub fn prune_below(&mut self, threshold: Frame) {
        for cell in &mut self.cells {
            if matches!(cell, Some(c) if c.frame < threshold) {
                *cell = None;
            }
        }
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = None;
        }
    }
}

/// Per-frame confirmed inputs: one optional input per controller slot.
type ConfirmedRow<I> = SmallVec<[Option<I>; 4]>;

/// The combined frame history for one match.
///
/// Owns the three parallel stores exclusively; snapshots are handed out by
/// reference only (the simulator copies internally if it needs to retain).
pub struct FrameHistory<T>
where
    T: Config,
{
    num_slots: usize,
    confirmed: FrameRing<ConfirmedRow<T::Input>>,
    used: FrameRing<InputVec<T::Input>>,
    snapshots: FrameRing<T::State>,
}

impl<T: Config> FrameHistory<T> {
    /// Creates history stores for a match with `num_slots` controller
    /// slots.
    ///
    /// The requested capacity covers the retained window (`max_rollback +
    /// input_delay + 2` frames) with headroom for peers running ahead of
    /// the local clock; the ring rounds it up to a power of two.
    #[must_use]
    pub fn new(num_slots: usize, max_rollback: usize, input_delay: usize) -> Self {
        let min_capacity = 2 * max_rollback + input_delay + 2;
        Self {
            num_slots,
            confirmed: FrameRing::new(min_capacity),
            used: FrameRing::new(min_capacity),
            snapshots: FrameRing::new(min_capacity),
        }
    }

    /// Returns the number of controller slots.
    #[must_use]
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Returns the ring capacity shared by the three stores.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.confirmed.capacity()
    }

    // --- confirmed inputs ---

    /// Records the authoritative input for `(frame, slot)`.
    ///
    /// The caller is responsible for duplicate/conflict policy; this store
    /// is mechanical and overwrites.
    pub fn insert_confirmed(&mut self, frame: Frame, slot: usize, input: T::Input) {
        match self.confirmed.get_mut(frame) {
            Some(row) => row[slot] = Some(input),
            None => {
                let mut row: ConfirmedRow<T::Input> = SmallVec::with_capacity(self.num_slots);
                row.resize(self.num_slots, None);
                row[slot] = Some(input);
                self.confirmed.insert(frame, row);
            },
        }
    }

    /// Returns the confirmed input for `(frame, slot)`, if known.
    #[must_use]
    pub fn confirmed_input(&self, frame: Frame, slot: usize) -> Option<T::Input> {
        self.confirmed.get(frame).and_then(|row| row[slot])
    }

    /// Returns the most recent confirmed input for `slot` at any frame
    /// strictly before `frame`, searching backward at most `window` frames.
    #[must_use]
    pub fn last_confirmed_before(
        &self,
        frame: Frame,
        slot: usize,
        window: usize,
    ) -> Option<T::Input> {
        let mut candidate = frame - 1;
        for _ in 0..window {
            if !candidate.is_valid() {
                return None;
            }
            if let Some(input) = self.confirmed_input(candidate, slot) {
                return Some(input);
            }
            candidate -= 1;
        }
        None
    }

    // --- used inputs ---

    /// Records the input map actually fed to the simulator for `frame`.
    pub fn insert_used(&mut self, frame: Frame, inputs: InputVec<T::Input>) {
        self.used.insert(frame, inputs);
    }

    /// Returns the input map used when `frame` was stepped, if retained.
    #[must_use]
    pub fn used_inputs(&self, frame: Frame) -> Option<&InputVec<T::Input>> {
        self.used.get(frame)
    }

    /// Returns the single input used for `(frame, slot)`, if retained.
    #[must_use]
    pub fn used_input(&self, frame: Frame, slot: usize) -> Option<T::Input> {
        self.used.get(frame).map(|inputs| inputs[slot].0)
    }

    // --- state snapshots ---

    /// Stores the pre-step snapshot for `frame`, overwriting any stale one.
    pub fn insert_snapshot(&mut self, frame: Frame, state: T::State) {
        self.snapshots.insert(frame, state);
    }

    /// Returns the snapshot for `frame`, if retained.
    #[must_use]
    pub fn snapshot(&self, frame: Frame) -> Option<&T::State> {
        self.snapshots.get(frame)
    }

    /// Returns `true` if a snapshot is retained for `frame`.
    #[must_use]
    pub fn has_snapshot(&self, frame: Frame) -> bool {
        self.snapshots.contains(frame)
    }

    // --- pruning & accounting ---

    /// Removes every entry below `threshold` from all three stores.
    pub fn prune_below(&mut self, threshold: Frame) {
        self.confirmed.prune_below(threshold);
        self.used.prune_below(threshold);
        self.snapshots.prune_below(threshold);
    }

    /// Drops all history (used when a match is torn down for a rematch).
    pub fn clear(&mut self) {
        self.confirmed.clear();
        self.used.clear();
        self.snapshots.clear();
    }

    /// Number of frames with at least one confirmed input retained.
    #[must_use]
    pub fn confirmed_len(&self) -> usize {
        self.confirmed.len()
    }

    /// Number of frames with a used-input map retained.
    #[must_use]
    pub fn used_len(&self) -> usize {
        self.used.len()
    }

    /// Number of frames with a snapshot retained.
    #[must_use]
    pub fn snapshot_len(&self) -> usize {
        self.snapshots.len()
    }
}

// #########
// # TESTS #
// #########
