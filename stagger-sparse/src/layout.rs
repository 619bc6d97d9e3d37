use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Ownership of a global index range split into one contiguous block per rank.
///
/// Rank `r` owns `offsets[r] .. offsets[r + 1]`. Blocks may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layout {
    offsets: Vec<usize>,
}

impl Layout {
    pub fn from_local_sizes(local_sizes: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(local_sizes.len() + 1);
        offsets.push(0);
        let mut offset = 0;
        for size in local_sizes {
            offset += size;
            offsets.push(offset);
        }
        Self { offsets }
    }

    /// A layout in which a single rank owns everything.
    pub fn serial(size: usize) -> Self {
        Self::from_local_sizes(&[size])
    }

    pub fn num_ranks(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn global_size(&self) -> usize {
        *self
            .offsets
            .last()
            .expect("Offsets always contain at least one element")
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// # Panics
    ///
    /// Panics if `rank` is not in `0 .. self.num_ranks()`.
    pub fn local_range(&self, rank: usize) -> Range<usize> {
        assert!(rank < self.num_ranks(), "Rank out of bounds");
        self.offsets[rank]..self.offsets[rank + 1]
    }

    pub fn local_size(&self, rank: usize) -> usize {
        self.local_range(rank).len()
    }

    /// The rank owning the given global index, or `None` if the index is out of bounds.
    pub fn owner(&self, index: usize) -> Option<usize> {
        if index >= self.global_size() {
            return None;
        }
        // The first offset strictly greater than `index` ends the owning block. Empty blocks
        // produce repeated offsets and are skipped over correctly.
        Some(self.offsets.partition_point(|&offset| offset <= index) - 1)
    }

    pub fn is_owned_by(&self, index: usize, rank: usize) -> bool {
        self.local_range(rank).contains(&index)
    }
}
