use crate::helpe::*;

/// Picks the free extent that should host a request of `size` units.
/// Returns its index within `free`, or `None` if nothing fits.
///
/// `free` is expected in increasing start order; every tie is broken
/// in favour of the lowest address, i.e., the first one met.
#[inline(always)]
pub fn find_slot(free: &[Extent], size: Units, strategy: Strategy) -> Option<usize> {
    let mut fits = free.iter()
        .enumerate()
        .filter(|(_, e)| e.size >= size);
    let (idx, _) = match strategy {
        Strategy::FirstFit  => fits.next(),
        // `min_by_key` keeps the first of several equal minima,
        // which is exactly the tie-break we want for both.
        Strategy::BestFit   => fits.min_by_key(|(_, e)| e.size),
        Strategy::WorstFit  => fits.min_by_key(|(_, e)| std::cmp::Reverse(e.size)),
    }?;

    Some(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(raw: &[(Units, Units)]) -> Vec<Extent> {
        raw.iter().map(|&(s, z)| Extent::new(s, z)).collect()
    }

    #[test]
    fn first_fit_takes_lowest_address() {
        let free = blocks(&[(0, 5), (10, 20), (40, 8)]);
        assert_eq!(find_slot(&free, 6, Strategy::FirstFit), Some(1));
        assert_eq!(find_slot(&free, 5, Strategy::FirstFit), Some(0));
    }

    #[test]
    fn best_fit_takes_smallest() {
        let free = blocks(&[(0, 20), (30, 8), (50, 12), (70, 8)]);
        assert_eq!(find_slot(&free, 7, Strategy::BestFit), Some(1));
        assert_eq!(find_slot(&free, 9, Strategy::BestFit), Some(2));
    }

    #[test]
    fn worst_fit_takes_largest_lowest_on_ties() {
        let free = blocks(&[(0, 10), (20, 30), (60, 30)]);
        assert_eq!(find_slot(&free, 5, Strategy::WorstFit), Some(1));
    }

    #[test]
    fn nothing_fits() {
        let free = blocks(&[(0, 4), (10, 4)]);
        for s in Strategy::value_variants() {
            assert_eq!(find_slot(&free, 5, *s), None);
        }
        assert_eq!(find_slot(&[], 1, Strategy::BestFit), None);
    }
}
