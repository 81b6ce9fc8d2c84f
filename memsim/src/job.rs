use crate::helpe::*;
use crate::algo::replacement::{choose_frame, FrameChoice};

/// One row of a job's page table.
///
/// `frame` is `Some` if and only if the page is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageTableEntry {
    pub page:       PageNo,
    pub present:    bool,
    pub frame:      Option<FrameId>,
    pub modified:   bool,
}

impl PageTableEntry {
    #[inline(always)]
    pub fn absent(page: PageNo) -> Self {
        Self {
            page,
            present:    false,
            frame:      None,
            modified:   false,
        }
    }

    /// The page's slot in the (simulated) backing store.
    pub fn disk_location(&self) -> String {
        format!("D{:03}", self.page)
    }
}

/// What a single access did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessResult {
    pub physical_address:   Units,
    pub frame:              FrameId,
    pub fault_occurred:     bool,
    pub evicted_page:       Option<PageNo>,
    /// `true` if the evicted page was modified and had to be
    /// written back before its frame could be reused.
    pub write_back:         bool,
    /// Human-readable account of the access, also kept in the job's log.
    pub message:            String,
}

/// A write-back of a modified page, as recorded in the disk ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBack {
    /// 1-based number of the access that caused it.
    pub access:         u64,
    pub page:           PageNo,
    pub frame:          FrameId,
    pub disk_location:  String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    pub accesses:   u64,
    pub hits:       u64,
    pub faults:     u64,
    pub evictions:  u64,
    pub write_backs:u64,
}

impl JobStats {
    /// Percentage of accesses that faulted, 0 before the first access.
    pub fn fault_rate(&self) -> f64 {
        if self.accesses == 0 { 0.0 }
        else { self.faults as f64 / self.accesses as f64 * 100.0 }
    }
}

impl Job {
    /// Creates a job with every page absent. No checks are done here;
    /// [PagingEngine::create_job] is the gatekeeper.
    pub(crate) fn new(id: JobId, page_count: usize, allocated_frames: Vec<FrameId>) -> Self {
        Self {
            id,
            allocated_frames,
            page_table:     (0..page_count).map(PageTableEntry::absent).collect(),
            fifo_queue:     VecDeque::new(),
            used_frames:    BTreeSet::new(),
            stats:          JobStats::default(),
            write_backs:    vec![],
            log:            vec![],
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn page_count(&self) -> usize {
        self.page_table.len()
    }

    pub fn allocated_frames(&self) -> &[FrameId] {
        &self.allocated_frames
    }

    pub fn page_table(&self) -> &[PageTableEntry] {
        &self.page_table
    }

    /// Resident pages, longest-resident first.
    pub fn fifo_queue(&self) -> impl Iterator<Item = PageNo> + '_ {
        self.fifo_queue.iter().copied()
    }

    pub fn used_frames(&self) -> &BTreeSet<FrameId> {
        &self.used_frames
    }

    pub fn resident_count(&self) -> usize {
        self.fifo_queue.len()
    }

    pub fn stats(&self) -> JobStats {
        self.stats
    }

    pub fn write_backs(&self) -> &[WriteBack] {
        &self.write_backs
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Back to the post-creation state. The frame allocation survives.
    pub(crate) fn reset(&mut self) {
        let frames = std::mem::take(&mut self.allocated_frames);
        *self = Self::new(self.id, self.page_table.len(), frames);
    }

    pub(crate) fn note(&mut self, line: String) {
        self.log.push(line);
    }

    /// Performs one already-validated access.
    ///
    /// Frame selection happens before anything is touched, so an
    /// error leaves the job exactly as it was.
    pub(crate) fn touch(
        &mut self,
        op:         Op,
        page:       PageNo,
        offset:     Units,
        page_size:  Units,
    ) -> Result<AccessResult, PagingError> {
        debug_assert!(page < self.page_table.len() && offset < page_size, "Unvalidated access");
        let access_no = self.stats.accesses + 1;

        let entry = self.page_table[page];
        if entry.present {
            let frame = entry.frame
                .ok_or_else(|| PagingError::Invariant(format!(
                    "job {}: present page {page} has no frame",
                    self.id,
                )))?;
            if op.is_write() {
                self.page_table[page].modified = true;
            }
            self.stats.accesses = access_no;
            self.stats.hits += 1;
            let physical_address = frame * page_size + offset;
            let mut message = format!("#{access_no} {op} page {page} -> hit, physical address {physical_address}");
            if self.page_table[page].modified {
                message.push_str(&format!(", page {page} modified"));
            }

            return Ok(AccessResult {
                physical_address,
                frame,
                fault_occurred: false,
                evicted_page:   None,
                write_back:     false,
                message,
            });
        }

        let choice = choose_frame(self)?;
        let mut message = format!("#{access_no} {op} page {page} -> page fault, ");
        let (frame, evicted_page, write_back) = match choice {
            FrameChoice::Free(frame)            => {
                message.push_str(&format!("free frame {frame}, "));
                (frame, None, false)
            },
            FrameChoice::Evict { page: victim, frame } => {
                self.fifo_queue.pop_front();
                self.used_frames.remove(&frame);
                let old = std::mem::replace(&mut self.page_table[victim], PageTableEntry::absent(victim));
                self.stats.evictions += 1;
                message.push_str(&format!("evicted page {victim} from frame {frame}, "));
                if old.modified {
                    self.stats.write_backs += 1;
                    message.push_str(&format!("wrote page {victim} back to {}, ", old.disk_location()));
                    self.write_backs.push(WriteBack {
                        access:         access_no,
                        page:           victim,
                        frame,
                        disk_location:  old.disk_location(),
                    });
                }
                (frame, Some(victim), old.modified)
            }
        };

        self.page_table[page] = PageTableEntry {
            page,
            present:    true,
            frame:      Some(frame),
            modified:   op.is_write(),
        };
        self.fifo_queue.push_back(page);
        self.used_frames.insert(frame);
        self.stats.accesses = access_no;
        self.stats.faults += 1;

        let physical_address = frame * page_size + offset;
        message.push_str(&format!("loaded page {page}, physical address {physical_address}"));
        if op.is_write() {
            message.push_str(&format!(", page {page} modified"));
        }

        Ok(AccessResult {
            physical_address,
            frame,
            fault_occurred: true,
            evicted_page,
            write_back,
            message,
        })
    }
}
