//! Welcome to `memsim`!
//!
//! Two small, deterministic memory-management engines live here:
//!
//! - [`PartitionAllocator`] carves variable-sized partitions out of a
//!   single contiguous address space, the way a dynamic-partition OS
//!   would. It supports first/best/worst-fit placement and linear
//!   undo/redo.
//! - [`PagingEngine`] runs demand paging for any number of jobs, each
//!   with its own page table and its own fixed set of physical frames.
//!   Replacement is FIFO and strictly *local* to the faulting job.
//!
//! Neither engine knows about the other, and neither does any I/O.

mod extent;
mod partition;
mod job;
mod engine;
mod analyze;

pub mod algo;
pub mod address;
pub mod history;
pub mod program;
pub mod helpe;

pub use crate::helpe::*;

/// A contiguous, half-open range of units: `[start, start + size)`.
///
/// Extents are plain values. Handing one out never lends out
/// the allocator's own bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Extent {
    pub start:  Units,
    pub size:   Units,
}

/// The free extents of an address space, sorted by increasing start.
///
/// After any completed mutation no two entries touch: whoever gives
/// space back is responsible for merging it with its neighbours.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeList {
    blocks: Vec<Extent>,
}

/// The dynamic-partition engine. Owns one address space of
/// `total_size` units; every unit is either free or owned by exactly
/// one process.
///
/// > ***ATTENTION:*** history is recorded *before* each successful
/// > mutation. [`undo`](PartitionAllocator::undo) therefore brings back
/// > the state right before the last successful `allocate`/`deallocate`,
/// > and failed requests leave no trace at all.
#[derive(Debug, Clone)]
pub struct PartitionAllocator {
    total_size: Units,
    free:       FreeList,
    // Ordered by id, so that snapshots come out in a stable order.
    allocated:  BTreeMap<ProcId, Extent>,
    next_id:    ProcId,
    history:    History<HistorySnapshot>,
}

/// A paged job: its page table plus the bookkeeping needed for
/// FIFO replacement within its own frames.
///
/// `allocated_frames` is fixed at creation. Its order matters: when
/// a fault finds spare capacity, the earliest-listed frame not in use
/// is the one handed out.
#[derive(Debug, Clone)]
pub struct Job {
    pub(crate) id:                  JobId,
    pub(crate) allocated_frames:    Vec<FrameId>,
    pub(crate) page_table:          Vec<PageTableEntry>,
    // Resident pages, longest-resident first.
    pub(crate) fifo_queue:          VecDeque<PageNo>,
    pub(crate) used_frames:         BTreeSet<FrameId>,
    pub(crate) stats:               JobStats,
    pub(crate) write_backs:         Vec<WriteBack>,
    pub(crate) log:                 Vec<String>,
}

/// The demand-paging engine. Physical memory is described by an
/// [`AddressLayout`]; jobs are kept in creation order.
#[derive(Debug, Clone)]
pub struct PagingEngine {
    layout: AddressLayout,
    jobs:   IndexMap<JobId, Job>,
}
