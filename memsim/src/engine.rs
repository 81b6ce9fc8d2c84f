use crate::helpe::*;
use crate::analyze::job_is_valid;

impl Default for PagingEngine {
    fn default() -> Self {
        Self::new(AddressLayout::default())
    }
}

impl PagingEngine {
    pub fn new(layout: AddressLayout) -> Self {
        Self {
            layout,
            jobs: IndexMap::new(),
        }
    }

    /// Validates `config` and builds an engine on top of it.
    pub fn with_config(config: PagingConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.validate()?))
    }

    pub fn layout(&self) -> AddressLayout {
        self.layout
    }

    /// Registers a job with every page absent. `allocated_frames` is
    /// the job's private frame pool, in the order free frames will be
    /// handed out.
    ///
    /// Returns `Ok(false)`, changing nothing, if `job_id` is taken.
    pub fn create_job(
        &mut self,
        job_id:             JobId,
        page_count:         usize,
        allocated_frames:   &[FrameId],
    ) -> Result<bool, PagingError> {
        if self.jobs.contains_key(&job_id) {
            debug!(job_id, "Job already exists");
            return Ok(false);
        }
        if page_count == 0 {
            return Err(PagingError::NoPages);
        }
        if page_count > self.layout.max_pages() {
            return Err(PagingError::TooManyPages { requested: page_count, max: self.layout.max_pages() });
        }
        if allocated_frames.is_empty() {
            return Err(PagingError::NoFrames);
        }
        let max_frames = self.layout.max_frames();
        if let Some(&frame) = allocated_frames.iter().find(|f| **f >= max_frames) {
            return Err(PagingError::FrameOutOfRange { frame, last: max_frames - 1 });
        }
        if let Some(frame) = allocated_frames.iter().duplicates().next() {
            return Err(PagingError::DuplicateFrame(*frame));
        }

        let mut job = Job::new(job_id, page_count, allocated_frames.to_vec());
        let line = format!(
            "job {job_id} created: {page_count} pages, frames {}",
            allocated_frames.iter().join(","),
        );
        info!(job_id, page_count, frames = ?allocated_frames, "Job created");
        job.note(line);
        self.jobs.insert(job_id, job);

        Ok(true)
    }

    /// Accesses `offset` within `page_no` of job `job_id`, faulting the
    /// page in if needed.
    ///
    /// Out-of-range pages and offsets are rejected before anything is
    /// touched.
    pub fn access(
        &mut self,
        job_id:     JobId,
        op:         Op,
        page_no:    PageNo,
        offset:     Units,
    ) -> Result<AccessResult, PagingError> {
        let page_size = self.layout.page_size();
        let job = self.jobs
            .get_mut(&job_id)
            .ok_or(PagingError::UnknownJob(job_id))?;
        if page_no >= job.page_count() {
            let err = PagingError::PageOutOfRange { page: page_no, last: job.page_count() - 1 };
            warn!(job_id, %err, "Access rejected");
            return Err(err);
        }
        if offset >= page_size {
            let err = PagingError::OffsetOutOfRange { offset, last: page_size - 1 };
            warn!(job_id, %err, "Access rejected");
            return Err(err);
        }

        let res = match job.touch(op, page_no, offset, page_size) {
            Ok(r)   => r,
            Err(e)  => {
                error!(job_id, %e, "Paging state corrupted");
                return Err(e);
            }
        };
        if res.fault_occurred {
            info!(
                job_id,
                page = page_no,
                frame = res.frame,
                evicted = ?res.evicted_page,
                write_back = res.write_back,
                "Page fault",
            );
        } else {
            debug!(job_id, page = page_no, frame = res.frame, "Hit");
        }
        job.note(res.message.clone());
        if cfg!(debug_assertions) {
            if let Err(e) = job_is_valid(job) {
                error!(job_id, %e, "Paging state corrupted");
                panic!("{e}");
            }
        }

        Ok(res)
    }

    /// Decodes `logical` with the engine's layout, then accesses it.
    pub fn access_logical(&mut self, job_id: JobId, op: Op, logical: Units) -> Result<AccessResult, PagingError> {
        let la = self.layout.decode(logical)?;
        self.access(job_id, op, la.page, la.offset)
    }

    /// Brings job `job_id` back to its post-creation state, keeping
    /// its frame allocation.
    pub fn reset(&mut self, job_id: JobId) -> Result<(), PagingError> {
        let job = self.jobs
            .get_mut(&job_id)
            .ok_or(PagingError::UnknownJob(job_id))?;
        job.reset();
        job.note(format!("job {job_id} reset"));
        info!(job_id, "Job reset");

        Ok(())
    }

    pub fn job(&self, job_id: JobId) -> Option<&Job> {
        self.jobs.get(&job_id)
    }

    /// Job ids, in creation order.
    pub fn job_ids(&self) -> impl Iterator<Item = JobId> + '_ {
        self.jobs.keys().copied()
    }

    /// A copy of the job's page table, indexed by page number.
    pub fn snapshot_page_table(&self, job_id: JobId) -> Result<Vec<PageTableEntry>, PagingError> {
        Ok(self.get(job_id)?.page_table.clone())
    }

    /// Resident pages of the job, longest-resident first.
    pub fn snapshot_fifo(&self, job_id: JobId) -> Result<Vec<PageNo>, PagingError> {
        Ok(self.get(job_id)?.fifo_queue().collect())
    }

    pub fn stats(&self, job_id: JobId) -> Result<JobStats, PagingError> {
        Ok(self.get(job_id)?.stats())
    }

    pub fn log(&self, job_id: JobId) -> Result<&[String], PagingError> {
        Ok(self.get(job_id)?.log())
    }

    pub fn write_backs(&self, job_id: JobId) -> Result<&[WriteBack], PagingError> {
        Ok(self.get(job_id)?.write_backs())
    }

    pub fn check_invariants(&self, job_id: JobId) -> Result<(), PagingError> {
        job_is_valid(self.get(job_id)?).map_err(PagingError::Invariant)
    }

    fn get(&self, job_id: JobId) -> Result<&Job, PagingError> {
        self.jobs
            .get(&job_id)
            .ok_or(PagingError::UnknownJob(job_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_job_checks() {
        let mut e = PagingEngine::default();
        assert_eq!(e.create_job(1, 0, &[1]), Err(PagingError::NoPages));
        assert_eq!(e.create_job(1, 65, &[1]), Err(PagingError::TooManyPages { requested: 65, max: 64 }));
        assert_eq!(e.create_job(1, 4, &[]), Err(PagingError::NoFrames));
        assert_eq!(e.create_job(1, 4, &[3, 64]), Err(PagingError::FrameOutOfRange { frame: 64, last: 63 }));
        assert_eq!(e.create_job(1, 4, &[3, 9, 3]), Err(PagingError::DuplicateFrame(3)));
        assert!(e.job(1).is_none());
        assert_eq!(e.create_job(1, 4, &[3, 9]), Ok(true));
    }

    #[test]
    fn create_job_is_idempotent() {
        let mut e = PagingEngine::default();
        e.create_job(1, 4, &[5, 8]).unwrap();
        e.access(1, Op::Add, 0, 0).unwrap();
        assert_eq!(e.create_job(1, 10, &[1]), Ok(false));
        let job = e.job(1).unwrap();
        assert_eq!(job.page_count(), 4);
        assert_eq!(job.allocated_frames(), &[5, 8]);
        assert_eq!(job.resident_count(), 1);
    }

    #[test]
    fn unknown_job() {
        let mut e = PagingEngine::default();
        assert_eq!(e.access(9, Op::Add, 0, 0), Err(PagingError::UnknownJob(9)));
        assert_eq!(e.reset(9), Err(PagingError::UnknownJob(9)));
        assert!(e.snapshot_page_table(9).is_err());
    }

    #[test]
    fn bad_offset_is_rejected() {
        let mut e = PagingEngine::default();
        e.create_job(1, 2, &[0]).unwrap();
        let err = e.access(1, Op::Save, 0, 1024).unwrap_err();
        assert_eq!(err, PagingError::OffsetOutOfRange { offset: 1024, last: 1023 });
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(e.stats(1).unwrap().accesses, 0);
    }

    #[test]
    fn logical_addresses() {
        let mut e = PagingEngine::with_config(PagingConfig { offset_bits: 4, page_bits: 3, frame_bits: 4 }).unwrap();
        e.create_job(1, 8, &[12]).unwrap();
        let res = e.access_logical(1, Op::Load, (5 << 4) | 9).unwrap();
        assert_eq!(res.physical_address, 12 * 16 + 9);
        assert_eq!(e.snapshot_fifo(1).unwrap(), vec![5]);
        assert!(matches!(
            e.access_logical(1, Op::Load, 1 << 7),
            Err(PagingError::AddressOutOfRange { bits: 7, .. })
        ));
    }

    #[test]
    fn log_lines() {
        let mut e = PagingEngine::default();
        e.create_job(2, 3, &[5, 8]).unwrap();
        e.access(2, Op::Save, 1, 10).unwrap();
        e.access(2, Op::Add, 1, 11).unwrap();
        let log = e.log(2).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0], "job 2 created: 3 pages, frames 5,8");
        assert_eq!(log[1], "#1 save page 1 -> page fault, free frame 5, loaded page 1, physical address 5130, page 1 modified");
        assert_eq!(log[2], "#2 + page 1 -> hit, physical address 5131, page 1 modified");
        e.reset(2).unwrap();
        assert_eq!(e.log(2).unwrap(), &[String::from("job 2 reset")]);
    }

    #[test]
    fn jobs_keep_creation_order() {
        let mut e = PagingEngine::default();
        for id in [4, 1, 3] {
            e.create_job(id, 1, &[id as FrameId]).unwrap();
        }
        assert_eq!(e.job_ids().collect::<Vec<_>>(), vec![4, 1, 3]);
    }
}
