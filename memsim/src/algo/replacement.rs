use crate::helpe::*;

/// Where a faulting page is going to live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameChoice {
    /// The job still owns a frame nobody uses.
    Free(FrameId),
    /// All of the job's frames are taken: `page`, the longest-resident
    /// page of *this* job, gives up `frame`.
    Evict { page: PageNo, frame: FrameId },
}

/// FIFO with local scope: only frames in `job`'s own allocation are
/// ever considered, and only `job`'s own pages are ever evicted.
///
/// Does not touch the job. Any error returned here means that the
/// job's bookkeeping has already been corrupted.
pub fn choose_frame(job: &Job) -> Result<FrameChoice, PagingError> {
    if job.used_frames.len() < job.allocated_frames.len() {
        job.allocated_frames
            .iter()
            .find(|f| !job.used_frames.contains(*f))
            .map(|f| FrameChoice::Free(*f))
            .ok_or_else(|| PagingError::Invariant(format!(
                "job {} reports {} of {} frames in use, yet none is free",
                job.id,
                job.used_frames.len(),
                job.allocated_frames.len(),
            )))
    } else {
        let victim = *job.fifo_queue
            .front()
            .ok_or_else(|| PagingError::Invariant(format!(
                "job {} has all frames in use but no resident page",
                job.id,
            )))?;
        let frame = job.page_table[victim]
            .frame
            .ok_or_else(|| PagingError::Invariant(format!(
                "job {}: queued page {victim} has no frame",
                job.id,
            )))?;

        Ok(FrameChoice::Evict { page: victim, frame })
    }
}
