//! Assembly of distributed operator matrices from stencil operators.
use crate::error::AssemblyError;
use crate::grid::{Direction, Field, GridIndex};
use crate::mesh::StaggeredGrid;
use crate::stencil::{Scaling, StencilOperator};
use itertools::izip;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use stagger_sparse::{Communicator, DistributedCsrMatrix, DistributedMatrixBuilder, MatrixOptions, Preallocation};
use stagger_traits::Real;
use std::marker::PhantomData;

/// How storage for the local rows is sized before insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreallocationPolicy {
    /// Count the distinct columns of every row, split into the diagonal and off-diagonal blocks,
    /// in a separate sweep over the stencils.
    Exact,
    /// Reserve the stencil size times the number of passes writing to the row, in both blocks.
    Uniform,
}

impl Default for PreallocationPolicy {
    fn default() -> Self {
        PreallocationPolicy::Exact
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorOptions {
    pub scaling: Scaling,
    pub preallocation: PreallocationPolicy,
    pub matrix: MatrixOptions,
}

impl Default for OperatorOptions {
    fn default() -> Self {
        Self {
            scaling: Scaling::Physical,
            preallocation: PreallocationPolicy::Exact,
            matrix: MatrixOptions {
                ignore_zero_entries: true,
                ..MatrixOptions::default()
            },
        }
    }
}

impl OperatorOptions {
    pub fn with_scaling(self, scaling: Scaling) -> Self {
        Self { scaling, ..self }
    }

    pub fn with_preallocation(self, preallocation: PreallocationPolicy) -> Self {
        Self { preallocation, ..self }
    }

    pub fn with_matrix_options(self, matrix: MatrixOptions) -> Self {
        Self { matrix, ..self }
    }
}

/// Assembles stencil operators on the mesh owned by one rank.
///
/// Assembly is collective: every rank of the mesh must assemble the same operator with a
/// communicator over the same group, or the other ranks block.
#[derive(Debug)]
pub struct OperatorAssembler<'a, T, G> {
    grid: &'a G,
    options: OperatorOptions,
    marker: PhantomData<T>,
}

impl<'a, T, G> OperatorAssembler<'a, T, G>
where
    T: Real,
    G: StaggeredGrid<T>,
{
    pub fn new(grid: &'a G, options: &OperatorOptions) -> Self {
        Self {
            grid,
            options: *options,
            marker: PhantomData,
        }
    }

    pub fn options(&self) -> &OperatorOptions {
        &self.options
    }

    /// Assembles the operator into a finalized distributed matrix.
    ///
    /// All fields and directions of the operator are checked against the mesh before any
    /// storage is allocated.
    pub fn assemble<S, C, const N: usize>(
        &self,
        operator: &S,
        comm: &C,
    ) -> Result<DistributedCsrMatrix<T>, AssemblyError>
    where
        S: StencilOperator<T, N>,
        C: Communicator,
    {
        let passes = self.validate(operator, comm)?;
        let packing = self.grid.packing();
        let rank = self.grid.rank();
        let row_layout = packing.layout(operator.row_space()).clone();
        let col_layout = packing.layout(operator.column_space()).clone();
        debug!(
            "rank {}: assembling {} ({}x{}, {}-point stencil, {} passes)",
            rank,
            operator.name(),
            row_layout.global_size(),
            col_layout.global_size(),
            N,
            passes.len()
        );

        let mut builder = DistributedMatrixBuilder::new(row_layout, col_layout, rank)?;
        builder.set_options(self.options.matrix);
        let preallocation = match self.options.preallocation {
            PreallocationPolicy::Exact => self.count_entries(operator, &passes, &builder)?,
            PreallocationPolicy::Uniform => {
                let max_passes_per_field = Field::ALL
                    .iter()
                    .map(|&field| {
                        passes
                            .iter()
                            .filter(|&&pass| operator.row_field(pass) == field)
                            .count()
                    })
                    .max()
                    .unwrap_or(0);
                let per_row = N * max_passes_per_field;
                Preallocation::uniform(per_row, per_row)
            }
        };
        builder.preallocate(preallocation)?;

        let mode = operator.insert_mode();
        for &pass in &passes {
            let column_field = operator.column_field(pass);
            let mut num_rows = 0;
            self.for_each_row(operator, pass, |row, index, columns| {
                let values = operator.coefficients(self.grid, pass, index);
                for (column, value) in izip!(columns, values) {
                    if let Some(column) = column {
                        builder.set_value(row, column, value, mode)?;
                    }
                }
                num_rows += 1;
                Ok(())
            })?;
            trace!(
                "rank {}: {} pass {}: {} rows of {} to columns of {}",
                rank,
                operator.name(),
                pass,
                num_rows,
                operator.row_field(pass),
                column_field
            );
        }

        let matrix = builder.assemble(comm)?;
        debug!(
            "rank {}: finished {} with {} local nonzeros",
            rank,
            operator.name(),
            matrix.local_nnz()
        );
        Ok(matrix)
    }

    /// Checks the operator against the mesh and the communicator, returning its passes.
    fn validate<S, C, const N: usize>(&self, operator: &S, comm: &C) -> Result<Vec<Direction>, AssemblyError>
    where
        S: StencilOperator<T, N>,
        C: Communicator,
    {
        let dimension = self.grid.dimension();
        if !operator.supports_dimension(dimension) {
            return Err(AssemblyError::UnsupportedStencil {
                operator: operator.name(),
                points: N,
                dimension,
            });
        }
        let passes = operator.passes(dimension);
        for &pass in &passes {
            for field in [operator.row_field(pass), operator.column_field(pass)] {
                if !dimension.contains(pass) || !field.exists_in(dimension) {
                    return Err(AssemblyError::UnsupportedDimension {
                        operator: operator.name(),
                        field,
                        dimension,
                    });
                }
            }
        }
        if comm.size() != self.grid.num_ranks() {
            return Err(AssemblyError::CommunicatorSize {
                mesh: self.grid.num_ranks(),
                comm: comm.size(),
            });
        }
        if comm.rank() != self.grid.rank() {
            return Err(AssemblyError::RankMismatch {
                mesh: self.grid.rank(),
                comm: comm.rank(),
            });
        }
        Ok(passes)
    }

    /// Visits every owned row of the row field of `pass` with the packed indices of its stencil.
    ///
    /// Neighbors on a non-periodic ghost layer have no column.
    fn for_each_row<S, F, const N: usize>(&self, operator: &S, pass: Direction, mut f: F) -> Result<(), AssemblyError>
    where
        S: StencilOperator<T, N>,
        F: FnMut(usize, GridIndex, [Option<usize>; N]) -> Result<(), AssemblyError>,
    {
        let row_field = operator.row_field(pass);
        let column_field = operator.column_field(pass);
        for index in self.grid.local_box(row_field)?.iter() {
            let row = self
                .grid
                .packed_index(row_field, index)?
                .ok_or(AssemblyError::IndexOutOfDomain { field: row_field, index })?;
            let mut columns = [None; N];
            for (column, neighbor) in columns.iter_mut().zip(operator.neighbors(pass, index)) {
                *column = self.grid.packed_index(column_field, neighbor)?;
            }
            f(row, index, columns)?;
        }
        Ok(())
    }

    /// Counts the distinct columns of each local row in the diagonal and off-diagonal blocks.
    fn count_entries<S, const N: usize>(
        &self,
        operator: &S,
        passes: &[Direction],
        builder: &DistributedMatrixBuilder<T>,
    ) -> Result<Preallocation, AssemblyError>
    where
        S: StencilOperator<T, N>,
    {
        let rank = self.grid.rank();
        let local_rows = builder.row_layout().local_range(rank);
        let mut row_columns: Vec<Vec<usize>> = vec![Vec::new(); local_rows.len()];
        for &pass in passes {
            self.for_each_row(operator, pass, |row, _, columns| {
                row_columns[row - local_rows.start].extend(columns.iter().flatten());
                Ok(())
            })?;
        }

        let col_layout = builder.col_layout();
        let mut diagonal = Vec::with_capacity(row_columns.len());
        let mut off_diagonal = Vec::with_capacity(row_columns.len());
        for mut columns in row_columns {
            columns.sort_unstable();
            columns.dedup();
            let owned = columns
                .iter()
                .filter(|&&col| col_layout.is_owned_by(col, rank))
                .count();
            diagonal.push(owned);
            off_diagonal.push(columns.len() - owned);
        }
        trace!(
            "rank {}: exact preallocation of {} diagonal and {} off-diagonal entries",
            rank,
            diagonal.iter().sum::<usize>(),
            off_diagonal.iter().sum::<usize>()
        );
        Ok(Preallocation::PerRow { diagonal, off_diagonal })
    }
}
