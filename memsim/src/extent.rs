use crate::helpe::*;

impl Extent {
    #[inline(always)]
    pub fn new(start: Units, size: Units) -> Self {
        Self { start, size }
    }

    /// First unit *past* the extent.
    #[inline(always)]
    pub fn end(&self) -> Units {
        self.start + self.size
    }

    /// Returns `true` if `other` begins exactly where `self` ends.
    #[inline(always)]
    pub fn touches(&self, other: &Self) -> bool {
        self.end() == other.start
    }

    #[inline(always)]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    #[inline(always)]
    pub fn contains(&self, addr: Units) -> bool {
        self.start <= addr && addr < self.end()
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

impl FreeList {
    /// A free list spanning the whole of `[0, total_size)`.
    pub fn new(total_size: Units) -> Self {
        let blocks = if total_size > 0 { vec![Extent::new(0, total_size)] } else { vec![] };
        Self { blocks }
    }

    pub fn as_slice(&self) -> &[Extent] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Extent> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn total(&self) -> Units {
        self.blocks.iter().map(|e| e.size).sum()
    }

    /// Size of the single largest free extent, 0 if there is none.
    pub fn largest(&self) -> Units {
        self.blocks.iter()
            .map(|e| e.size)
            .max()
            .unwrap_or(0)
    }

    /// Consumes `size` units from the start of the free extent at
    /// `idx` and returns them. A non-empty remainder stays at `idx`,
    /// so ordering is preserved without re-sorting.
    ///
    /// The caller guarantees that `idx` is valid and that the extent
    /// there is large enough.
    pub(crate) fn carve(&mut self, idx: usize, size: Units) -> Extent {
        let block = self.blocks[idx];
        debug_assert!(block.size >= size, "Carving beyond a free extent");
        let taken = Extent::new(block.start, size);
        let rest = block.size - size;
        if rest > 0 {
            self.blocks[idx] = Extent::new(block.start + size, rest);
        } else {
            self.blocks.remove(idx);
        }

        taken
    }

    /// Gives `extent` back and merges it with whatever it touches.
    /// Returns the (possibly grown) free extent that now contains it.
    pub(crate) fn release(&mut self, extent: Extent) -> Extent {
        // Index of the first free extent starting after ours.
        let mut idx = self.blocks.partition_point(|e| e.start < extent.start);
        self.blocks.insert(idx, extent);

        // Merge with the left neighbour...
        if idx > 0 && self.blocks[idx - 1].touches(&self.blocks[idx]) {
            self.blocks[idx - 1].size += self.blocks[idx].size;
            self.blocks.remove(idx);
            idx -= 1;
        }
        // ...and then with the right one. A released extent sits
        // between two free extents at most, so this is transitive.
        if idx + 1 < self.blocks.len() && self.blocks[idx].touches(&self.blocks[idx + 1]) {
            self.blocks[idx].size += self.blocks[idx + 1].size;
            self.blocks.remove(idx + 1);
        }

        self.blocks[idx]
    }

    #[cfg(test)]
    pub(crate) fn from_vec(blocks: Vec<Extent>) -> Self {
        Self { blocks }
    }
}

impl<'a> IntoIterator for &'a FreeList {
    type Item = &'a Extent;
    type IntoIter = std::slice::Iter<'a, Extent>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_geometry() {
        let a = Extent::new(10, 5);
        let b = Extent::new(15, 3);
        assert_eq!(a.end(), 15);
        assert!(a.touches(&b));
        assert!(!b.touches(&a));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&Extent::new(14, 10)));
        assert!(a.contains(10) && a.contains(14) && !a.contains(15));
        assert_eq!(a.to_string(), "[10, 15)");
    }

    #[test]
    fn carve_keeps_remainder_in_place() {
        let mut free = FreeList::from_vec(vec![Extent::new(0, 10), Extent::new(20, 30)]);
        assert_eq!(free.carve(1, 5), Extent::new(20, 5));
        assert_eq!(free.as_slice(), &[Extent::new(0, 10), Extent::new(25, 25)]);
        assert_eq!(free.carve(0, 10), Extent::new(0, 10));
        assert_eq!(free.as_slice(), &[Extent::new(25, 25)]);
    }

    #[test]
    fn release_merges_both_sides() {
        let mut free = FreeList::from_vec(vec![Extent::new(0, 10), Extent::new(20, 5)]);
        assert_eq!(free.release(Extent::new(10, 10)), Extent::new(0, 25));
        assert_eq!(free.as_slice(), &[Extent::new(0, 25)]);
    }

    #[test]
    fn release_without_neighbours() {
        let mut free = FreeList::from_vec(vec![Extent::new(50, 50)]);
        free.release(Extent::new(0, 30));
        assert_eq!(free.as_slice(), &[Extent::new(0, 30), Extent::new(50, 50)]);
        assert_eq!(free.total(), 80);
        assert_eq!(free.largest(), 50);
    }
}
