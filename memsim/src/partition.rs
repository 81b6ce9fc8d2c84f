use crate::helpe::*;
use crate::algo::placement::find_slot;
use crate::analyze::partition_is_valid;

/// A snapshot of an allocator's figures, for reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartitionStats {
    pub total:          Units,
    pub used:           Units,
    pub free:           Units,
    pub largest_free:   Units,
    pub free_blocks:    usize,
    pub allocations:    usize,
    pub usage:          f64,
    pub fragmentation:  f64,
}

impl fmt::Display for PartitionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
            "Total:\t\t{} units\nUsed:\t\t{} units ({} partitions)\nFree:\t\t{} units ({} extents, largest {})\nUsage:\t\t{:.2}%\nFragmentation:\t{:.2}%",
            self.total,
            self.used,
            self.allocations,
            self.free,
            self.free_blocks,
            self.largest_free,
            self.usage,
            self.fragmentation,
        )
    }
}

impl PartitionAllocator {
    /// Creates an allocator over `[0, total_size)`, all of it free.
    pub fn new(total_size: Units) -> Result<Self, PartitionError> {
        if total_size == 0 {
            return Err(PartitionError::ZeroTotalSize);
        }

        Ok(Self {
            total_size,
            free:       FreeList::new(total_size),
            allocated:  BTreeMap::new(),
            next_id:    1,
            history:    History::new(),
        })
    }

    /// Starts over with a single free extent of `total_size` units.
    /// Allocations and history are forgotten.
    pub fn initialize(&mut self, total_size: Units) -> Result<(), PartitionError> {
        *self = Self::new(total_size)?;
        info!(total_size, "Address space initialized");

        Ok(())
    }

    /// Places `size` units for process `id`, using `strategy` to pick
    /// among the free extents that are large enough.
    ///
    /// The chosen extent is consumed from its start; whatever remains
    /// stays free at the same position.
    pub fn allocate(&mut self, id: ProcId, size: Units, strategy: Strategy) -> Result<Extent, PartitionError> {
        if let Some(extent) = self.allocated.get(&id) {
            let err = PartitionError::DuplicateId { id, extent: *extent };
            warn!(%err, "Allocation rejected");
            return Err(err);
        }
        if size == 0 {
            let err = PartitionError::ZeroSize { id };
            warn!(%err, "Allocation rejected");
            return Err(err);
        }
        let Some(idx) = find_slot(self.free.as_slice(), size, strategy) else {
            let err = PartitionError::NoFit { size, largest: self.free.largest() };
            warn!(%err, %strategy, "Allocation rejected");
            return Err(err);
        };

        let before = self.capture();
        let extent = self.free.carve(idx, size);
        self.allocated.insert(id, extent);
        self.next_id = self.next_id.max(id.saturating_add(1));
        self.history.record(before);
        debug!(id, size, %strategy, %extent, "Allocated");
        self.debug_check();

        Ok(extent)
    }

    /// Like [allocate](PartitionAllocator::allocate), but the id is
    /// handed out by the allocator itself.
    pub fn allocate_next(&mut self, size: Units, strategy: Strategy) -> Result<(ProcId, Extent), PartitionError> {
        let id = self.next_id;
        let extent = self.allocate(id, size, strategy)?;

        Ok((id, extent))
    }

    /// Frees the partition of process `id`, merging it with any free
    /// neighbours. Returns the extent the process held.
    pub fn deallocate(&mut self, id: ProcId) -> Result<Extent, PartitionError> {
        let Some(&extent) = self.allocated.get(&id) else {
            let err = PartitionError::UnknownId { id };
            warn!(%err, "Deallocation rejected");
            return Err(err);
        };

        let before = self.capture();
        self.allocated.remove(&id);
        let merged = self.free.release(extent);
        self.history.record(before);
        debug!(id, %extent, %merged, "Deallocated");
        self.debug_check();

        Ok(extent)
    }

    /// Steps back to the state before the last successful mutation.
    /// Returns `false` if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let current = self.capture();
        match self.history.undo(current) {
            Some(prev)  => {
                self.restore(prev);
                info!(depth = ?self.history.depth(), "Undo");
                true
            },
            None        => false,
        }
    }

    /// Re-applies the last undone mutation. Returns `false` if there
    /// is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let current = self.capture();
        match self.history.redo(current) {
            Some(next)  => {
                self.restore(next);
                info!(depth = ?self.history.depth(), "Redo");
                true
            },
            None        => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Applies a scripted operation. `Ok(false)` means an undo/redo
    /// had nothing to act upon.
    pub fn apply(&mut self, op: &PartitionOp) -> Result<bool, PartitionError> {
        match *op {
            PartitionOp::Alloc { id: Some(id), size, strategy } => self.allocate(id, size, strategy).map(|_| true),
            PartitionOp::Alloc { id: None, size, strategy }     => self.allocate_next(size, strategy).map(|_| true),
            PartitionOp::Free { id }                            => self.deallocate(id).map(|_| true),
            PartitionOp::Undo                                   => Ok(self.undo()),
            PartitionOp::Redo                                   => Ok(self.redo()),
        }
    }

    pub fn total_size(&self) -> Units {
        self.total_size
    }

    /// The id [allocate_next](PartitionAllocator::allocate_next) would use.
    pub fn next_id(&self) -> ProcId {
        self.next_id
    }

    pub fn used_total(&self) -> Units {
        self.allocated.values().map(|e| e.size).sum()
    }

    pub fn free_total(&self) -> Units {
        self.free.total()
    }

    pub fn largest_free(&self) -> Units {
        self.free.largest()
    }

    pub fn allocation(&self, id: ProcId) -> Option<Extent> {
        self.allocated.get(&id).copied()
    }

    /// Percentage of the address space currently allocated.
    pub fn usage(&self) -> f64 {
        self.used_total() as f64 / self.total_size as f64 * 100.0
    }

    /// Percentage of free space lying *outside* the largest free
    /// extent: 0 when all free space is in one piece (or there is
    /// none), approaching 100 as it scatters.
    pub fn fragmentation(&self) -> f64 {
        let total_free = self.free.total();
        if total_free == 0 { return 0.0; }

        (total_free - self.free.largest()) as f64 / total_free as f64 * 100.0
    }

    pub fn stats(&self) -> PartitionStats {
        PartitionStats {
            total:          self.total_size,
            used:           self.used_total(),
            free:           self.free_total(),
            largest_free:   self.largest_free(),
            free_blocks:    self.free.len(),
            allocations:    self.allocated.len(),
            usage:          self.usage(),
            fragmentation:  self.fragmentation(),
        }
    }

    /// A copy of the free list, in address order.
    pub fn snapshot_free_blocks(&self) -> Vec<Extent> {
        self.free.as_slice().to_vec()
    }

    /// A copy of every allocation, ordered by process id.
    pub fn snapshot_allocations(&self) -> BTreeMap<ProcId, Extent> {
        self.allocated.clone()
    }

    pub fn free_list(&self) -> &FreeList {
        &self.free
    }

    /// Verifies that free and allocated extents tile the address
    /// space exactly, with no unmerged free neighbours.
    pub fn check_invariants(&self) -> Result<(), PartitionError> {
        partition_is_valid(self.total_size, &self.free, &self.allocated)
            .map_err(PartitionError::Invariant)
    }

    #[inline(always)]
    fn debug_check(&self) {
        if cfg!(debug_assertions) {
            if let Err(e) = self.check_invariants() {
                error!(%e, "Allocator corrupted");
                panic!("{e}");
            }
        }
    }

    fn capture(&self) -> HistorySnapshot {
        HistorySnapshot {
            free:       self.free.clone(),
            allocated:  self.allocated.clone(),
            next_id:    self.next_id,
        }
    }

    fn restore(&mut self, snapshot: HistorySnapshot) {
        self.free = snapshot.free;
        self.allocated = snapshot.allocated;
        self.next_id = snapshot.next_id;
        self.debug_check();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sizes_are_rejected() {
        assert_eq!(PartitionAllocator::new(0).unwrap_err(), PartitionError::ZeroTotalSize);
        let mut a = PartitionAllocator::new(10).unwrap();
        assert_eq!(a.allocate(1, 0, Strategy::FirstFit), Err(PartitionError::ZeroSize { id: 1 }));
        assert!(!a.can_undo());
    }

    #[test]
    fn whole_space_in_one_go() {
        let mut a = PartitionAllocator::new(64).unwrap();
        assert_eq!(a.allocate(1, 64, Strategy::WorstFit), Ok(Extent::new(0, 64)));
        assert!(a.snapshot_free_blocks().is_empty());
        assert_eq!(a.usage(), 100.0);
        assert_eq!(a.fragmentation(), 0.0);
        let err = a.allocate(2, 1, Strategy::FirstFit).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    }

    #[test]
    fn duplicate_and_unknown_ids() {
        let mut a = PartitionAllocator::new(50).unwrap();
        a.allocate(7, 5, Strategy::FirstFit).unwrap();
        assert_eq!(
            a.allocate(7, 5, Strategy::FirstFit),
            Err(PartitionError::DuplicateId { id: 7, extent: Extent::new(0, 5) })
        );
        assert_eq!(a.deallocate(8), Err(PartitionError::UnknownId { id: 8 }));
        // Failures leave no history behind.
        assert_eq!(a.history.depth(), (1, 0));
    }

    #[test]
    fn next_id_follows_explicit_ids() {
        let mut a = PartitionAllocator::new(50).unwrap();
        assert_eq!(a.allocate_next(5, Strategy::FirstFit), Ok((1, Extent::new(0, 5))));
        a.allocate(10, 5, Strategy::FirstFit).unwrap();
        assert_eq!(a.next_id(), 11);
        assert_eq!(a.allocate_next(5, Strategy::FirstFit).unwrap().0, 11);
        assert!(a.undo());
        assert_eq!(a.next_id(), 11);
        assert!(a.undo());
        assert_eq!(a.next_id(), 2);
    }

    #[test]
    fn fragmentation_formula() {
        let mut a = PartitionAllocator::new(100).unwrap();
        for id in 1..=4 {
            a.allocate(id, 25, Strategy::FirstFit).unwrap();
        }
        a.deallocate(1).unwrap();
        a.deallocate(3).unwrap();
        // Two free extents of 25: half of the free space is outside the largest.
        assert_eq!(a.fragmentation(), 50.0);
        assert_eq!(a.usage(), 50.0);
        a.deallocate(2).unwrap();
        assert_eq!(a.snapshot_free_blocks(), vec![Extent::new(0, 75)]);
        assert_eq!(a.fragmentation(), 0.0);
    }

    #[test]
    fn initialize_forgets_everything() {
        let mut a = PartitionAllocator::new(30).unwrap();
        a.allocate(4, 10, Strategy::BestFit).unwrap();
        a.initialize(40).unwrap();
        assert_eq!(a.total_size(), 40);
        assert_eq!(a.snapshot_free_blocks(), vec![Extent::new(0, 40)]);
        assert!(a.snapshot_allocations().is_empty());
        assert!(!a.undo());
        assert_eq!(a.next_id(), 1);
        assert!(a.initialize(0).is_err());
    }

    #[test]
    fn apply_reports_noops() {
        let mut a = PartitionAllocator::new(30).unwrap();
        assert_eq!(a.apply(&PartitionOp::Undo), Ok(false));
        assert_eq!(a.apply(&PartitionOp::Alloc { id: None, size: 3, strategy: Strategy::BestFit }), Ok(true));
        assert_eq!(a.apply(&PartitionOp::Free { id: 1 }), Ok(true));
        assert_eq!(a.apply(&PartitionOp::Undo), Ok(true));
        assert_eq!(a.apply(&PartitionOp::Redo), Ok(true));
        assert_eq!(a.apply(&PartitionOp::Redo), Ok(false));
    }

    #[test]
    fn stats_display() {
        let mut a = PartitionAllocator::new(100).unwrap();
        a.allocate(1, 40, Strategy::FirstFit).unwrap();
        let s = a.stats();
        assert_eq!((s.used, s.free, s.free_blocks, s.allocations), (40, 60, 1, 1));
        assert!(s.to_string().contains("Usage:\t\t40.00%"));
    }
}
