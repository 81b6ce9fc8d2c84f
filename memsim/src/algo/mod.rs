pub mod placement;
pub mod replacement;

use crate::helpe::*;

/// How one placement strategy fared over a workload.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyReport {
    pub strategy:   Strategy,
    /// Operations the allocator turned down.
    pub rejected:   usize,
    /// Rejections due to lack of a large enough free extent.
    pub no_fit:     usize,
    pub stats:      PartitionStats,
}

/// Replays `workload` on a fresh allocator of `total_size` units once
/// per placement strategy, overriding each allocation's own strategy.
///
/// Every run owns its allocator, so the runs go in parallel. Reports
/// come back in [Strategy] declaration order.
pub fn compare_strategies(
    total_size: Units,
    workload:   &[PartitionOp],
) -> Result<Vec<StrategyReport>, PartitionError> {
    Strategy::value_variants()
        .par_iter()
        .map(|&strategy| {
            let mut alloc = PartitionAllocator::new(total_size)?;
            let (mut rejected, mut no_fit) = (0, 0);
            for op in workload {
                match alloc.apply(&op.with_strategy(strategy)) {
                    Ok(_)                               => {},
                    Err(PartitionError::NoFit { .. })   => {
                        rejected += 1;
                        no_fit += 1;
                    },
                    Err(e) if e.kind() == ErrorKind::InvariantViolation => { return Err(e); },
                    Err(_)                              => { rejected += 1; },
                }
            }

            Ok(StrategyReport {
                strategy,
                rejected,
                no_fit,
                stats: alloc.stats(),
            })
        })
        .collect()
}

/// Generates `len` allocate/free operations over an address space of
/// `total_size` units. Allocations get explicit, increasing ids so that
/// the same workload means the same thing under every strategy.
///
/// Same seed, same workload.
pub fn random_workload(len: usize, total_size: Units, seed: u64) -> Vec<PartitionOp> {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    let max_request = (total_size / 8).max(1);
    let mut live: Vec<ProcId> = vec![];
    let mut next_id: ProcId = 1;
    let mut res = Vec::with_capacity(len);
    while res.len() < len {
        // Lean towards allocating, so that memory actually fills up.
        if live.is_empty() || rng.gen_bool(0.6) {
            res.push(PartitionOp::Alloc {
                id:         Some(next_id),
                size:       rng.gen_range(1..=max_request),
                strategy:   Strategy::FirstFit,
            });
            live.push(next_id);
            next_id += 1;
        } else {
            let victim = live.swap_remove(rng.gen_range(0..live.len()));
            res.push(PartitionOp::Free { id: victim });
        }
    }

    res
}
