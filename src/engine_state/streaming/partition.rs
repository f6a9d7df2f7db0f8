//! Swap-partitioned slot array.
//!
//! A fixed number of slots is kept partitioned in place into four contiguous
//! ranges, one per lifecycle state:
//!
//! ```text
//! [0, rendered)       Rendered  finished, output bound
//! [rendered, active)  InFlight  pipeline running
//! [active, data)      Passive   assigned, waiting to be scheduled
//! [data, capacity)    free
//! ```
//!
//! Every transition is a constant number of swaps. A coordinate to index side
//! table is updated on each swap and is the only way to find a chunk's slot.

use std::{collections::HashMap, fmt::Write};

use log::error;

use crate::{engine_state::voxels::chunk::ChunkCoord, error::PoolError};

/// Lifecycle state of an occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// Output is complete and bound
    Rendered,
    /// A pipeline owns the slot's buffers
    InFlight,
    /// Assigned to a chunk but not scheduled
    Passive,
}

/// One entry of the slot array.
#[derive(Debug)]
struct Slot<T> {
    coord: Option<ChunkCoord>,
    item: T,
}

/// A fixed-capacity slot array partitioned by [`SlotState`].
#[derive(Debug)]
pub struct PartitionedPool<T> {
    slots: Vec<Slot<T>>,
    index_of: HashMap<ChunkCoord, usize>,
    rendered: usize,
    active: usize,
    data: usize,
}

impl<T: Default> PartitionedPool<T> {
    /// Creates a pool with `capacity` free slots.
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                coord: None,
                item: T::default(),
            })
            .collect();

        PartitionedPool {
            slots,
            index_of: HashMap::with_capacity(capacity),
            rendered: 0,
            active: 0,
            data: 0,
        }
    }
}

impl<T> PartitionedPool<T> {
    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.data
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.data == 0
    }

    /// Number of slots in each state: `(rendered, in_flight, passive, free)`.
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.rendered,
            self.active - self.rendered,
            self.data - self.active,
            self.slots.len() - self.data,
        )
    }

    /// The state of a chunk's slot, if it has one.
    pub fn state(&self, coord: ChunkCoord) -> Option<SlotState> {
        self.index_of.get(&coord).map(|&index| self.state_at(index))
    }

    fn state_at(&self, index: usize) -> SlotState {
        if index < self.rendered {
            SlotState::Rendered
        } else if index < self.active {
            SlotState::InFlight
        } else {
            SlotState::Passive
        }
    }

    /// The item of a chunk's slot.
    pub fn get(&self, coord: ChunkCoord) -> Option<&T> {
        self.index_of.get(&coord).map(|&index| &self.slots[index].item)
    }

    /// Mutable access to the item of a chunk's slot.
    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut T> {
        match self.index_of.get(&coord) {
            Some(&index) => Some(&mut self.slots[index].item),
            None => None,
        }
    }

    /// Coordinates of every slot in the given state.
    pub fn coords_in(&self, state: SlotState) -> impl Iterator<Item = ChunkCoord> + '_ {
        let range = match state {
            SlotState::Rendered => 0..self.rendered,
            SlotState::InFlight => self.rendered..self.active,
            SlotState::Passive => self.active..self.data,
        };
        self.slots[range].iter().filter_map(|slot| slot.coord)
    }

    /// Swaps two slots and keeps the side table in sync.
    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.slots.swap(a, b);
        for index in [a, b] {
            if let Some(coord) = self.slots[index].coord {
                self.index_of.insert(coord, index);
            }
        }
    }

    /// Gives `coord` a passive slot.
    ///
    /// A chunk without a slot takes the first free one. A rendered chunk is
    /// moved back to the passive range, keeping its item. A passive chunk stays
    /// where it is. A chunk whose pipeline is running cannot be acquired.
    ///
    /// Returns the item of the slot.
    pub fn acquire(&mut self, coord: ChunkCoord) -> Result<&mut T, PoolError> {
        let index = match self.index_of.get(&coord).copied() {
            None => {
                if self.data == self.slots.len() {
                    return Err(PoolError::Exhausted {
                        capacity: self.slots.len(),
                    });
                }
                let index = self.data;
                self.slots[index].coord = Some(coord);
                self.index_of.insert(coord, index);
                self.data += 1;
                index
            }
            Some(index) => match self.state_at(index) {
                SlotState::Passive => index,
                SlotState::InFlight => return Err(PoolError::InFlight(coord)),
                SlotState::Rendered => {
                    // Rendered -> tail of in-flight -> head of passive.
                    self.swap(index, self.rendered - 1);
                    self.rendered -= 1;
                    self.swap(self.rendered, self.active - 1);
                    self.active -= 1;
                    self.active
                }
            },
        };
        Ok(&mut self.slots[index].item)
    }

    /// Moves a passive slot to the tail of the in-flight range.
    pub fn activate(&mut self, coord: ChunkCoord) -> Result<&mut T, PoolError> {
        let state = self.state(coord);
        let Some(SlotState::Passive) = state else {
            return Err(PoolError::NotPassive { coord, state });
        };
        let index = self.index_of[&coord];
        self.swap(index, self.active);
        self.active += 1;
        Ok(&mut self.slots[self.active - 1].item)
    }

    /// Scans the in-flight range and promotes every slot for which `ready`
    /// returns `true` to the rendered range.
    ///
    /// Slots may finish in any order. Returns the number of promoted slots.
    pub fn sweep(&mut self, mut ready: impl FnMut(ChunkCoord, &mut T) -> bool) -> usize {
        let mut promoted = 0;
        for index in self.rendered..self.active {
            let slot = &mut self.slots[index];
            let Some(coord) = slot.coord else {
                continue;
            };
            if ready(coord, &mut slot.item) {
                self.swap(index, self.rendered);
                self.rendered += 1;
                promoted += 1;
            }
        }
        promoted
    }

    /// Frees the slot of a rendered chunk.
    ///
    /// The slot is swapped through the in-flight and passive ranges to the
    /// tail of the occupied range, then cleared. Its item is kept for reuse and
    /// returned. Any other state is refused with a logged dump and leaves the
    /// partitions untouched.
    pub fn release(&mut self, coord: ChunkCoord) -> Result<&mut T, PoolError> {
        let state = self.state(coord);
        if state != Some(SlotState::Rendered) {
            error!(
                "Refusing to release chunk {} in state {:?}\n{}",
                coord,
                state,
                self.dump()
            );
            return Err(PoolError::NotRendered { coord, state });
        }

        let index = self.index_of[&coord];
        self.swap(index, self.rendered - 1);
        self.rendered -= 1;
        self.swap(self.rendered, self.active - 1);
        self.active -= 1;
        self.swap(self.active, self.data - 1);
        self.data -= 1;

        self.slots[self.data].coord = None;
        self.index_of.remove(&coord);
        Ok(&mut self.slots[self.data].item)
    }

    /// Verifies partition order and side table consistency.
    pub fn check_invariants(&self) -> Result<(), PoolError> {
        if !(self.rendered <= self.active
            && self.active <= self.data
            && self.data <= self.slots.len())
        {
            return Err(PoolError::SideTableMismatch(format!(
                "partition bounds out of order: {} <= {} <= {} <= {}",
                self.rendered,
                self.active,
                self.data,
                self.slots.len()
            )));
        }
        if self.index_of.len() != self.data {
            return Err(PoolError::SideTableMismatch(format!(
                "{} side table entries for {} occupied slots",
                self.index_of.len(),
                self.data
            )));
        }
        for (index, slot) in self.slots.iter().enumerate() {
            match slot.coord {
                Some(coord) if index < self.data => {
                    if self.index_of.get(&coord) != Some(&index) {
                        return Err(PoolError::SideTableMismatch(format!(
                            "slot {index} holds {coord} but the side table says {:?}",
                            self.index_of.get(&coord)
                        )));
                    }
                }
                None if index >= self.data => {}
                Some(coord) => {
                    return Err(PoolError::SideTableMismatch(format!(
                        "free slot {index} still holds {coord}"
                    )))
                }
                None => {
                    return Err(PoolError::SideTableMismatch(format!(
                        "occupied slot {index} has no coordinate"
                    )))
                }
            }
        }
        Ok(())
    }

    /// Human-readable state of every occupied slot.
    pub fn dump(&self) -> String {
        let mut out = format!(
            "pool: rendered={} active={} data={} capacity={}\n",
            self.rendered,
            self.active,
            self.data,
            self.slots.len()
        );
        for (index, slot) in self.slots[..self.data].iter().enumerate() {
            let coord = slot
                .coord
                .map_or_else(|| "-".to_string(), |coord| coord.to_string());
            let _ = writeln!(out, "  [{index:>4}] {:?} {coord}", self.state_at(index));
        }
        out
    }
}
