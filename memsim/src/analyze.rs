use crate::helpe::*;

/// Checks that `free` and `allocated` tile `[0, total)` exactly:
/// - free extents are non-empty, sorted, and never touch each other,
/// - allocated extents are non-empty,
/// - no two extents of any kind overlap,
/// - together they cover every unit.
///
/// Returns a description of the first problem found.
pub fn partition_is_valid(
    total:      Units,
    free:       &FreeList,
    allocated:  &BTreeMap<ProcId, Extent>,
) -> Result<(), String> {
    for (a, b) in free.iter().tuple_windows() {
        if a.start >= b.start {
            return Err(format!("free list out of order: {a} before {b}"));
        }
        if a.touches(b) {
            return Err(format!("adjacent free extents {a} and {b} were not merged"));
        }
    }

    // Lay all extents side by side in address order; then coverage
    // means each one starts exactly where the previous one ended.
    let tiles = free.iter()
        .map(|e| (*e, None))
        .chain(allocated.iter().map(|(id, e)| (*e, Some(*id))))
        .sorted_unstable_by_key(|(e, _)| e.start);
    let mut expected = 0;
    for (e, owner) in tiles {
        let who = match owner {
            Some(id)    => format!("process {id}"),
            None        => String::from("free space"),
        };
        if e.size == 0 {
            return Err(format!("empty extent at {} ({who})", e.start));
        }
        if e.start < expected {
            return Err(format!("{e} ({who}) overlaps with what precedes it"));
        }
        if e.start > expected {
            return Err(format!("units [{expected}, {}) belong to nobody", e.start));
        }
        expected = e.end();
    }
    if expected != total {
        return Err(format!("extents end at {expected}, address space at {total}"));
    }

    Ok(())
}

/// Checks a job's page table against its FIFO queue and frame set.
pub fn job_is_valid(job: &Job) -> Result<(), String> {
    let present = job.page_table.iter().filter(|e| e.present).count();
    if job.fifo_queue.len() != present || job.used_frames.len() != present {
        return Err(format!(
            "{} queued pages, {} used frames, {present} present entries",
            job.fifo_queue.len(),
            job.used_frames.len(),
        ));
    }
    if present > job.allocated_frames.len() {
        return Err(format!("{present} resident pages in {} frames", job.allocated_frames.len()));
    }
    if !job.fifo_queue.iter().all_unique() {
        return Err(String::from("a page is queued twice"));
    }
    for (page, e) in job.page_table.iter().enumerate() {
        if e.page != page {
            return Err(format!("row {page} describes page {}", e.page));
        }
        match (e.present, e.frame) {
            (true, Some(f))     => {
                if !job.allocated_frames.contains(&f) {
                    return Err(format!("page {page} sits in foreign frame {f}"));
                }
                if !job.used_frames.contains(&f) {
                    return Err(format!("page {page} sits in frame {f}, which is marked unused"));
                }
                if !job.fifo_queue.contains(&page) {
                    return Err(format!("present page {page} is not queued"));
                }
            },
            (true, None)        => { return Err(format!("present page {page} has no frame")); },
            (false, Some(f))    => { return Err(format!("absent page {page} still holds frame {f}")); },
            (false, None)       => {
                if e.modified {
                    return Err(format!("absent page {page} is marked modified"));
                }
            },
        }
    }
    // Distinct frames per present page.
    let frames: Vec<FrameId> = job.page_table.iter().filter_map(|e| e.frame).collect();
    if !frames.iter().all_unique() {
        return Err(String::from("two pages share a frame"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_gap_and_overlap() {
        let free = FreeList::from_vec(vec![Extent::new(0, 10)]);
        let mut allocated = BTreeMap::new();
        allocated.insert(1, Extent::new(12, 8));
        assert!(partition_is_valid(20, &free, &allocated).unwrap_err().contains("nobody"));
        allocated.insert(1, Extent::new(8, 12));
        assert!(partition_is_valid(20, &free, &allocated).unwrap_err().contains("overlaps"));
        allocated.insert(1, Extent::new(10, 10));
        assert_eq!(partition_is_valid(20, &free, &allocated), Ok(()));
        assert!(partition_is_valid(25, &free, &allocated).is_err());
    }

    #[test]
    fn detects_unmerged_free() {
        let free = FreeList::from_vec(vec![Extent::new(0, 10), Extent::new(10, 10)]);
        assert!(partition_is_valid(20, &free, &BTreeMap::new()).unwrap_err().contains("adjacent"));
    }

    #[test]
    fn detects_foreign_frame() {
        let mut job = Job::new(1, 2, vec![3]);
        job.page_table[0].present = true;
        job.page_table[0].frame = Some(4);
        job.fifo_queue.push_back(0);
        job.used_frames.insert(4);
        assert!(job_is_valid(&job).unwrap_err().contains("foreign"));
    }
}
