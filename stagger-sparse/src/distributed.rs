use crate::comm::Communicator;
use crate::error::{Block, MatrixError};
use crate::layout::Layout;
use log::{debug, warn};
use nalgebra_sparse::{CooMatrix, CsrMatrix, SparseFormatError};
use serde::{Deserialize, Serialize};
use stagger_traits::Real;
use std::cmp::max;
use std::iter::repeat;
use std::mem::take;
use std::ops::Range;

/// How a value is combined with an entry that already exists at the same location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertMode {
    /// Overwrite the existing value.
    Insert,
    /// Add to the existing value.
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixOptions {
    /// Retain the nonzero locations (with zeroed values) when the matrix is reopened.
    pub keep_nonzero_pattern: bool,
    /// Do not create a new location for a value that is exactly zero.
    ///
    /// A zero inserted at an existing location still overwrites (or is added to) it.
    pub ignore_zero_entries: bool,
    /// Fail when a row needs more entries than preallocated, instead of reallocating.
    pub new_nonzero_allocation_err: bool,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            keep_nonzero_pattern: false,
            ignore_zero_entries: false,
            new_nonzero_allocation_err: true,
        }
    }
}

/// Number of entries each locally owned row may hold, split by storage block.
///
/// Counts are clamped to the number of columns that can actually appear in the block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preallocation {
    Uniform { diagonal: usize, off_diagonal: usize },
    PerRow { diagonal: Vec<usize>, off_diagonal: Vec<usize> },
}

impl Preallocation {
    pub fn uniform(diagonal: usize, off_diagonal: usize) -> Self {
        Self::Uniform { diagonal, off_diagonal }
    }

    fn row_capacities(
        &self,
        local_rows: usize,
        local_cols: usize,
        remote_cols: usize,
    ) -> Result<(Vec<usize>, Vec<usize>), MatrixError> {
        match self {
            Self::Uniform { diagonal, off_diagonal } => Ok((
                vec![(*diagonal).min(local_cols); local_rows],
                vec![(*off_diagonal).min(remote_cols); local_rows],
            )),
            Self::PerRow { diagonal, off_diagonal } => {
                for counts in [diagonal, off_diagonal] {
                    if counts.len() != local_rows {
                        return Err(MatrixError::PreallocationLength {
                            expected: local_rows,
                            actual: counts.len(),
                        });
                    }
                }
                Ok((
                    diagonal.iter().map(|&n| n.min(local_cols)).collect(),
                    off_diagonal.iter().map(|&n| n.min(remote_cols)).collect(),
                ))
            }
        }
    }
}

/// Row-wise storage with a fixed capacity per row.
///
/// Row `r` keeps its entries sorted by column in `columns[starts[r] .. starts[r] + lengths[r]]`
/// and may grow up to `starts[r + 1]` without moving any other row.
#[derive(Debug, Clone)]
struct RowBlock<T> {
    starts: Vec<usize>,
    lengths: Vec<usize>,
    columns: Vec<usize>,
    values: Vec<T>,
    reallocations: usize,
}

impl<T: Real> RowBlock<T> {
    fn with_capacities(capacities: &[usize]) -> Self {
        let mut starts = Vec::with_capacity(capacities.len() + 1);
        starts.push(0);
        let mut total = 0;
        for capacity in capacities {
            total += capacity;
            starts.push(total);
        }
        Self {
            starts,
            lengths: vec![0; capacities.len()],
            columns: vec![usize::MAX; total],
            values: vec![T::zero(); total],
            reallocations: 0,
        }
    }

    /// Storage holding the locations of `csr`, all with zero values.
    fn with_pattern(capacities: &[usize], csr: &CsrMatrix<T>) -> Self {
        let capacities: Vec<usize> = capacities
            .iter()
            .enumerate()
            .map(|(r, &capacity)| max(capacity, csr.row(r).nnz()))
            .collect();
        let mut block = Self::with_capacities(&capacities);
        for r in 0..csr.nrows() {
            let row = csr.row(r);
            let begin = block.starts[r];
            block.columns[begin..begin + row.nnz()].copy_from_slice(row.col_indices());
            block.lengths[r] = row.nnz();
        }
        block
    }

    fn capacity(&self, row: usize) -> usize {
        self.starts[row + 1] - self.starts[row]
    }

    fn nnz(&self) -> usize {
        self.lengths.iter().sum()
    }

    /// Sets or accumulates an entry. Returns the row capacity if the row is full and growing
    /// is not allowed.
    fn set(
        &mut self,
        row: usize,
        col: usize,
        value: T,
        mode: InsertMode,
        options: &MatrixOptions,
    ) -> Result<(), usize> {
        let begin = self.starts[row];
        let len = self.lengths[row];
        match self.columns[begin..begin + len].binary_search(&col) {
            Ok(pos) => {
                let existing = &mut self.values[begin + pos];
                match mode {
                    InsertMode::Insert => *existing = value,
                    InsertMode::Add => *existing += value,
                }
            }
            Err(pos) => {
                if options.ignore_zero_entries && value == T::zero() {
                    return Ok(());
                }
                if len == self.capacity(row) {
                    if options.new_nonzero_allocation_err {
                        return Err(self.capacity(row));
                    }
                    self.grow(row);
                }
                let at = begin + pos;
                self.columns.copy_within(at..begin + len, at + 1);
                self.values.copy_within(at..begin + len, at + 1);
                self.columns[at] = col;
                self.values[at] = value;
                self.lengths[row] += 1;
            }
        }
        Ok(())
    }

    fn grow(&mut self, row: usize) {
        let extra = max(self.capacity(row), 2);
        let end = self.starts[row + 1];
        self.columns.splice(end..end, repeat(usize::MAX).take(extra));
        self.values.splice(end..end, repeat(T::zero()).take(extra));
        for start in &mut self.starts[row + 1..] {
            *start += extra;
        }
        self.reallocations += 1;
        debug!("grew storage of local row {} by {} entries", row, extra);
    }

    fn into_csr(self, ncols: usize) -> Result<CsrMatrix<T>, SparseFormatError> {
        let nrows = self.lengths.len();
        let nnz = self.nnz();
        let mut offsets = Vec::with_capacity(nrows + 1);
        let mut columns = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        offsets.push(0);
        for r in 0..nrows {
            let range = self.starts[r]..self.starts[r] + self.lengths[r];
            columns.extend_from_slice(&self.columns[range.clone()]);
            values.extend_from_slice(&self.values[range]);
            offsets.push(columns.len());
        }
        CsrMatrix::try_from_csr_data(nrows, ncols, offsets, columns, values)
    }
}

#[derive(Debug, Clone, Copy)]
struct StashEntry<T> {
    row: usize,
    col: usize,
    value: T,
    mode: InsertMode,
}

/// A distributed matrix under construction on one rank.
///
/// Entries of locally owned rows go straight into preallocated storage. Entries of rows owned
/// by other ranks are stashed and delivered to their owner by [`assemble`](Self::assemble),
/// which is a collective call: every rank of the communicator must call it.
#[derive(Debug, Clone)]
pub struct DistributedMatrixBuilder<T> {
    rank: usize,
    row_layout: Layout,
    col_layout: Layout,
    options: MatrixOptions,
    preallocation: Preallocation,
    diagonal: RowBlock<T>,
    off_diagonal: RowBlock<T>,
    stash: Vec<Vec<StashEntry<T>>>,
}

impl<T: Real> DistributedMatrixBuilder<T> {
    /// Creates an empty matrix for `rank`, without any preallocated capacity.
    pub fn new(row_layout: Layout, col_layout: Layout, rank: usize) -> Result<Self, MatrixError> {
        if row_layout.num_ranks() != col_layout.num_ranks() {
            return Err(MatrixError::LayoutRankCount {
                rows: row_layout.num_ranks(),
                cols: col_layout.num_ranks(),
            });
        }
        if rank >= row_layout.num_ranks() {
            return Err(MatrixError::RankOutOfRange {
                rank,
                num_ranks: row_layout.num_ranks(),
            });
        }
        let num_ranks = row_layout.num_ranks();
        let local_rows = row_layout.local_size(rank);
        Ok(Self {
            rank,
            row_layout,
            col_layout,
            options: MatrixOptions::default(),
            preallocation: Preallocation::uniform(0, 0),
            diagonal: RowBlock::with_capacities(&vec![0; local_rows]),
            off_diagonal: RowBlock::with_capacities(&vec![0; local_rows]),
            stash: vec![Vec::new(); num_ranks],
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn row_layout(&self) -> &Layout {
        &self.row_layout
    }

    pub fn col_layout(&self) -> &Layout {
        &self.col_layout
    }

    pub fn options(&self) -> &MatrixOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: MatrixOptions) {
        self.options = options;
    }

    /// Allocates storage for the locally owned rows, discarding any local entries.
    pub fn preallocate(&mut self, preallocation: Preallocation) -> Result<(), MatrixError> {
        let local_rows = self.row_layout.local_size(self.rank);
        let local_cols = self.col_layout.local_size(self.rank);
        let remote_cols = self.col_layout.global_size() - local_cols;
        let (diagonal, off_diagonal) = preallocation.row_capacities(local_rows, local_cols, remote_cols)?;
        self.diagonal = RowBlock::with_capacities(&diagonal);
        self.off_diagonal = RowBlock::with_capacities(&off_diagonal);
        self.preallocation = preallocation;
        Ok(())
    }

    /// Sets the entry at global position `(row, col)`.
    ///
    /// The row does not need to be owned by this rank.
    pub fn set_value(&mut self, row: usize, col: usize, value: T, mode: InsertMode) -> Result<(), MatrixError> {
        let nrows = self.row_layout.global_size();
        let ncols = self.col_layout.global_size();
        if row >= nrows {
            return Err(MatrixError::RowOutOfBounds { row, nrows });
        }
        if col >= ncols {
            return Err(MatrixError::ColumnOutOfBounds { col, ncols });
        }

        if self.row_layout.is_owned_by(row, self.rank) {
            self.set_local(row, col, value, mode)
        } else {
            let owner = self
                .row_layout
                .owner(row)
                .expect("Row is in bounds, so it must have an owner");
            self.stash[owner].push(StashEntry { row, col, value, mode });
            Ok(())
        }
    }

    fn set_local(&mut self, row: usize, col: usize, value: T, mode: InsertMode) -> Result<(), MatrixError> {
        let local_row = row - self.row_layout.local_range(self.rank).start;
        let local_cols = self.col_layout.local_range(self.rank);
        let (block, storage, stored_col) = if local_cols.contains(&col) {
            (Block::Diagonal, &mut self.diagonal, col - local_cols.start)
        } else {
            (Block::OffDiagonal, &mut self.off_diagonal, col)
        };
        storage
            .set(local_row, stored_col, value, mode, &self.options)
            .map_err(|capacity| MatrixError::PreallocationExceeded {
                row,
                col,
                block,
                capacity,
            })
    }

    /// Finalizes the matrix.
    ///
    /// Collective: exchanges stashed entries between all ranks of `comm` and verifies that all
    /// ranks agree on the row and column layouts.
    pub fn assemble<C: Communicator>(mut self, comm: &C) -> Result<DistributedCsrMatrix<T>, MatrixError> {
        if comm.size() != self.row_layout.num_ranks() {
            return Err(MatrixError::CommunicatorSize {
                layout: self.row_layout.num_ranks(),
                comm: comm.size(),
            });
        }
        if comm.rank() != self.rank {
            return Err(MatrixError::CommunicatorRank {
                expected: self.rank,
                actual: comm.rank(),
            });
        }

        let layouts = comm.all_gather((self.row_layout.clone(), self.col_layout.clone()))?;
        if layouts
            .iter()
            .any(|(rows, cols)| rows != &self.row_layout || cols != &self.col_layout)
        {
            let shapes = layouts
                .iter()
                .map(|(rows, cols)| (rows.global_size(), cols.global_size()))
                .collect();
            return Err(MatrixError::LayoutMismatch { shapes });
        }

        let sent: usize = self.stash.iter().map(Vec::len).sum();
        let received = comm.all_to_all(take(&mut self.stash))?;
        let mut num_received = 0;
        for entries in received {
            num_received += entries.len();
            for entry in entries {
                self.set_local(entry.row, entry.col, entry.value, entry.mode)?;
            }
        }

        let reallocations = self.diagonal.reallocations + self.off_diagonal.reallocations;
        if reallocations > 0 {
            warn!(
                "rank {}: {} row reallocations during assembly, preallocation was insufficient",
                self.rank, reallocations
            );
        }

        let local_cols = self.col_layout.local_size(self.rank);
        let ncols = self.col_layout.global_size();
        let diagonal = self.diagonal.into_csr(local_cols)?;
        let off_diagonal = self.off_diagonal.into_csr(ncols)?;
        debug!(
            "rank {}: assembled {}x{} matrix with {} local rows and {} local nonzeros ({} entries sent, {} received)",
            self.rank,
            self.row_layout.global_size(),
            ncols,
            diagonal.nrows(),
            diagonal.nnz() + off_diagonal.nnz(),
            sent,
            num_received
        );

        Ok(DistributedCsrMatrix {
            rank: self.rank,
            row_layout: self.row_layout,
            col_layout: self.col_layout,
            options: self.options,
            preallocation: self.preallocation,
            diagonal,
            off_diagonal,
        })
    }
}

/// A finalized distributed matrix, as seen from one rank.
///
/// The diagonal block uses column indices relative to the start of the locally owned column
/// range, the off-diagonal block uses global column indices.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributedCsrMatrix<T> {
    rank: usize,
    row_layout: Layout,
    col_layout: Layout,
    options: MatrixOptions,
    preallocation: Preallocation,
    diagonal: CsrMatrix<T>,
    off_diagonal: CsrMatrix<T>,
}

impl<T: Real> DistributedCsrMatrix<T> {
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Global number of rows.
    pub fn nrows(&self) -> usize {
        self.row_layout.global_size()
    }

    /// Global number of columns.
    pub fn ncols(&self) -> usize {
        self.col_layout.global_size()
    }

    pub fn row_layout(&self) -> &Layout {
        &self.row_layout
    }

    pub fn col_layout(&self) -> &Layout {
        &self.col_layout
    }

    pub fn options(&self) -> &MatrixOptions {
        &self.options
    }

    pub fn local_row_range(&self) -> Range<usize> {
        self.row_layout.local_range(self.rank)
    }

    pub fn local_col_range(&self) -> Range<usize> {
        self.col_layout.local_range(self.rank)
    }

    pub fn diagonal_block(&self) -> &CsrMatrix<T> {
        &self.diagonal
    }

    pub fn off_diagonal_block(&self) -> &CsrMatrix<T> {
        &self.off_diagonal
    }

    pub fn local_nnz(&self) -> usize {
        self.diagonal.nnz() + self.off_diagonal.nnz()
    }

    /// The entries of a locally owned row as `(global column, value)` pairs sorted by column.
    ///
    /// Returns `None` if the row is not owned by this rank.
    pub fn row(&self, row: usize) -> Option<Vec<(usize, T)>> {
        let local_rows = self.local_row_range();
        if !local_rows.contains(&row) {
            return None;
        }
        let local_row = row - local_rows.start;
        let col_offset = self.local_col_range().start;
        let diagonal = self.diagonal.row(local_row);
        let off_diagonal = self.off_diagonal.row(local_row);
        let mut entries: Vec<_> = diagonal
            .col_indices()
            .iter()
            .map(|&j| j + col_offset)
            .zip(diagonal.values().iter().copied())
            .chain(
                off_diagonal
                    .col_indices()
                    .iter()
                    .copied()
                    .zip(off_diagonal.values().iter().copied()),
            )
            .collect();
        entries.sort_unstable_by_key(|&(j, _)| j);
        Some(entries)
    }

    /// All locally stored entries as `(global row, global column, value)` triplets.
    pub fn triplets(&self) -> Vec<(usize, usize, T)> {
        let row_offset = self.local_row_range().start;
        let col_offset = self.local_col_range().start;
        let diagonal = self
            .diagonal
            .triplet_iter()
            .map(|(i, j, &v)| (i + row_offset, j + col_offset, v));
        let off_diagonal = self
            .off_diagonal
            .triplet_iter()
            .map(|(i, j, &v)| (i + row_offset, j, v));
        diagonal.chain(off_diagonal).collect()
    }

    /// The locally owned rows as a standalone CSR matrix with global column indices.
    pub fn local_rows(&self) -> CsrMatrix<T> {
        let row_offset = self.local_row_range().start;
        let mut coo = CooMatrix::new(self.diagonal.nrows(), self.ncols());
        for (i, j, v) in self.triplets() {
            coo.push(i - row_offset, j, v);
        }
        CsrMatrix::from(&coo)
    }

    /// Gathers the complete matrix on every rank.
    ///
    /// Collective. Intended for verification and small problems only.
    pub fn gather<C: Communicator>(&self, comm: &C) -> Result<CsrMatrix<T>, MatrixError> {
        let contributions = comm.all_gather(self.triplets())?;
        let mut coo = CooMatrix::new(self.nrows(), self.ncols());
        for (i, j, v) in contributions.into_iter().flatten() {
            coo.push(i, j, v);
        }
        Ok(CsrMatrix::from(&coo))
    }

    /// Turns the matrix back into a builder for another assembly with the same layouts.
    ///
    /// With [`MatrixOptions::keep_nonzero_pattern`] the current locations are retained with zero
    /// values; otherwise the builder starts empty with the original preallocation.
    pub fn reopen(self) -> DistributedMatrixBuilder<T> {
        let local_rows = self.row_layout.local_size(self.rank);
        let local_cols = self.col_layout.local_size(self.rank);
        let remote_cols = self.col_layout.global_size() - local_cols;
        let (diagonal_capacities, off_diagonal_capacities) = self
            .preallocation
            .row_capacities(local_rows, local_cols, remote_cols)
            .expect("Preallocation was validated when the matrix was built");

        let (diagonal, off_diagonal) = if self.options.keep_nonzero_pattern {
            (
                RowBlock::with_pattern(&diagonal_capacities, &self.diagonal),
                RowBlock::with_pattern(&off_diagonal_capacities, &self.off_diagonal),
            )
        } else {
            (
                RowBlock::with_capacities(&diagonal_capacities),
                RowBlock::with_capacities(&off_diagonal_capacities),
            )
        };

        let num_ranks = self.row_layout.num_ranks();
        DistributedMatrixBuilder {
            rank: self.rank,
            row_layout: self.row_layout,
            col_layout: self.col_layout,
            options: self.options,
            preallocation: self.preallocation,
            diagonal,
            off_diagonal,
            stash: vec![Vec::new(); num_ranks],
        }
    }
}
