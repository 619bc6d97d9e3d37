//! Stencils and the kernels that weight them.
//!
//! A differential operator on a staggered grid is assembled in *passes*, one per direction.
//! In each pass, every owned point of the row field contributes one matrix row whose columns
//! are given by a fixed-size stencil of neighboring points of the column field, and whose
//! values are given by the kernel coefficients in the same order.
use crate::grid::{Dimension, Direction, Field, GridIndex, IndexSpace};
use crate::mesh::StaggeredGrid;
use serde::{Deserialize, Serialize};
use stagger_sparse::InsertMode;
use stagger_traits::Real;
use std::array;

/// Whether kernel coefficients account for the grid spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scaling {
    /// Coefficients are the unit stencil weights, independent of the geometry.
    Normalized,
    /// Coefficients are divided by the relevant grid spacings.
    Physical,
}

impl Default for Scaling {
    fn default() -> Self {
        Scaling::Physical
    }
}

/// The point itself and its successor along `direction`.
pub fn forward_pair(direction: Direction, index: GridIndex) -> [GridIndex; 2] {
    [index, index.shifted(direction, 1)]
}

/// The predecessor of the point along `direction` and the point itself.
pub fn backward_pair(direction: Direction, index: GridIndex) -> [GridIndex; 2] {
    [index.shifted(direction, -1), index]
}

/// The point followed by its predecessor and successor along each of the first `(N - 1) / 2`
/// axes.
///
/// # Panics
///
/// Panics unless `N` is 3, 5 or 7.
pub fn star<const N: usize>(index: GridIndex) -> [GridIndex; N] {
    assert!(
        N % 2 == 1 && (3..=7).contains(&N),
        "A star stencil has 3, 5 or 7 points, not {}",
        N
    );
    array::from_fn(|n| {
        if n == 0 {
            index
        } else {
            let direction = Direction::ALL[(n - 1) / 2];
            let offset = if n % 2 == 1 { -1 } else { 1 };
            index.shifted(direction, offset)
        }
    })
}

/// Number of points of the star stencil on a mesh of the given dimension.
pub fn star_size(dimension: Dimension) -> usize {
    1 + 2 * dimension.value()
}

/// A differential operator given by a stencil with `N` points and its kernel.
///
/// The row field and column field may differ per pass, but must always belong to
/// [`row_space`](Self::row_space) and [`column_space`](Self::column_space).
pub trait StencilOperator<T: Real, const N: usize> {
    /// A short name used in log messages and errors.
    fn name(&self) -> &'static str;

    fn row_space(&self) -> IndexSpace;

    fn column_space(&self) -> IndexSpace;

    /// The passes needed on a mesh of the given dimension.
    ///
    /// The result may contain directions the mesh does not have; assembly rejects those before
    /// allocating anything.
    fn passes(&self, dimension: Dimension) -> Vec<Direction> {
        dimension.directions().to_vec()
    }

    /// Whether the `N`-point stencil fits a mesh of the given dimension.
    fn supports_dimension(&self, _dimension: Dimension) -> bool {
        true
    }

    fn row_field(&self, pass: Direction) -> Field;

    fn column_field(&self, pass: Direction) -> Field;

    fn insert_mode(&self) -> InsertMode {
        InsertMode::Insert
    }

    /// Neighbors of the row point `index` in the column field.
    fn neighbors(&self, pass: Direction, index: GridIndex) -> [GridIndex; N];

    /// Coefficients for the neighbors returned by [`neighbors`](Self::neighbors), in the same
    /// order.
    fn coefficients<G>(&self, grid: &G, pass: Direction, index: GridIndex) -> [T; N]
    where
        G: StaggeredGrid<T>;
}
