//! Splitting the cells of a structured grid over a Cartesian grid of processes.
//!
//! Ranks are numbered with the process coordinate in x running fastest,
//! `rank = px + Px * (py + Py * pz)`.
use crate::error::AssemblyError;
use crate::grid::{Dimension, Direction};
use itertools::iproduct;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Number of cells owned by each process, per axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decomposition {
    /// `ownership[d][p]` is the number of cells along axis `d` owned by process coordinate `p`.
    ownership: Vec<Vec<usize>>,
}

/// Splits `cells` into `parts` contiguous chunks whose sizes differ by at most one, larger chunks
/// first.
fn balanced_split(cells: usize, parts: usize) -> Vec<usize> {
    (0..parts)
        .map(|p| cells / parts + usize::from(p < cells % parts))
        .collect()
}

impl Decomposition {
    /// Builds a decomposition from explicit per-axis cell counts.
    ///
    /// Every process must own at least one cell along every axis.
    pub fn from_ownership(ownership: Vec<Vec<usize>>) -> Result<Self, AssemblyError> {
        if Dimension::from_value(ownership.len()).is_none() {
            return Err(AssemblyError::InvalidDecomposition(format!(
                "expected ownership for 2 or 3 axes, got {}",
                ownership.len()
            )));
        }
        for (d, counts) in ownership.iter().enumerate() {
            if counts.is_empty() {
                return Err(AssemblyError::InvalidDecomposition(format!(
                    "no processes along axis {}",
                    d
                )));
            }
            if let Some(p) = counts.iter().position(|&n| n == 0) {
                return Err(AssemblyError::InvalidDecomposition(format!(
                    "process {} along axis {} owns no cells",
                    p, d
                )));
            }
        }
        Ok(Self { ownership })
    }

    /// Splits `cells[d]` cells along each axis as evenly as possible over `processes[d]` processes.
    pub fn uniform(cells: &[usize], processes: &[usize]) -> Result<Self, AssemblyError> {
        if cells.len() != processes.len() {
            return Err(AssemblyError::InvalidDecomposition(format!(
                "{} cell counts but {} process counts",
                cells.len(),
                processes.len()
            )));
        }
        for (d, (&n, &p)) in cells.iter().zip(processes).enumerate() {
            if p == 0 || p > n {
                return Err(AssemblyError::InvalidDecomposition(format!(
                    "cannot split {} cells over {} processes along axis {}",
                    n, p, d
                )));
            }
        }
        let ownership = cells
            .iter()
            .zip(processes)
            .map(|(&n, &p)| balanced_split(n, p))
            .collect();
        Self::from_ownership(ownership)
    }

    /// The single-process decomposition.
    pub fn serial(cells: &[usize]) -> Result<Self, AssemblyError> {
        Self::uniform(cells, &vec![1; cells.len()])
    }

    /// Chooses a process grid for `num_ranks` ranks and splits the cells uniformly over it.
    ///
    /// Among all factorizations of `num_ranks` that give every process at least one cell, the one
    /// with the smallest total interface area between processes is selected. Ties go to the grid
    /// with more processes along the earlier axes.
    pub fn automatic(cells: &[usize], num_ranks: usize) -> Result<Self, AssemblyError> {
        let dim = Dimension::from_value(cells.len()).ok_or_else(|| {
            AssemblyError::InvalidDecomposition(format!("expected 2 or 3 axes, got {}", cells.len()))
        })?;
        if num_ranks == 0 {
            return Err(AssemblyError::InvalidDecomposition("no ranks".to_string()));
        }

        let max_z = if dim == Dimension::Three { num_ranks } else { 1 };
        let candidates = iproduct!(1..=num_ranks, 1..=num_ranks, 1..=max_z)
            .filter(|&(px, py, pz)| px * py * pz == num_ranks)
            .map(|(px, py, pz)| [px, py, pz])
            .filter(|grid| cells.iter().zip(grid.iter()).all(|(&n, &p)| p <= n));

        let interface_area = |grid: &[usize; 3]| -> f64 {
            // Cut surfaces orthogonal to axis d: (p_d - 1) cuts of the cross-section area
            (0..cells.len())
                .map(|d| {
                    let cross_section: f64 = (0..cells.len())
                        .filter(|&e| e != d)
                        .map(|e| cells[e] as f64)
                        .product();
                    (grid[d] - 1) as f64 * cross_section
                })
                .sum()
        };

        let mut best: Option<([usize; 3], f64)> = None;
        for grid in candidates {
            let area = interface_area(&grid);
            let better = match &best {
                None => true,
                Some((best_grid, best_area)) => area < *best_area || (area == *best_area && grid > *best_grid),
            };
            if better {
                best = Some((grid, area));
            }
        }

        let (grid, _) = best.ok_or_else(|| {
            AssemblyError::InvalidDecomposition(format!(
                "cannot distribute {:?} cells over {} ranks",
                cells, num_ranks
            ))
        })?;
        Self::uniform(cells, &grid[..cells.len()])
    }

    pub fn dimension(&self) -> Dimension {
        Dimension::from_value(self.ownership.len()).expect("Validated on construction")
    }

    /// Number of processes along each axis. Missing axes of 2-D problems count as one process.
    pub fn process_grid(&self) -> [usize; 3] {
        let mut grid = [1; 3];
        for (g, counts) in grid.iter_mut().zip(&self.ownership) {
            *g = counts.len();
        }
        grid
    }

    pub fn num_ranks(&self) -> usize {
        self.process_grid().iter().product()
    }

    /// # Panics
    ///
    /// Panics if the coordinates are outside the process grid.
    pub fn rank_of(&self, coords: [usize; 3]) -> usize {
        let [px, py, pz] = self.process_grid();
        assert!(
            coords[0] < px && coords[1] < py && coords[2] < pz,
            "Process coordinates out of bounds"
        );
        coords[0] + px * (coords[1] + py * coords[2])
    }

    /// # Panics
    ///
    /// Panics if `rank` is not in `0 .. self.num_ranks()`.
    pub fn coords_of(&self, rank: usize) -> [usize; 3] {
        assert!(rank < self.num_ranks(), "Rank out of bounds");
        let [px, py, _] = self.process_grid();
        [rank % px, (rank / px) % py, rank / (px * py)]
    }

    /// Cells owned by each process along `direction`.
    ///
    /// # Panics
    ///
    /// Panics if `direction` is not an axis of the decomposition.
    pub fn cell_counts(&self, direction: Direction) -> &[usize] {
        &self.ownership[direction.index()]
    }

    /// Total number of cells along each axis.
    pub fn total_cells(&self) -> Vec<usize> {
        self.ownership.iter().map(|counts| counts.iter().sum()).collect()
    }

    /// The range of cells along `direction` owned by process coordinate `p`.
    ///
    /// In 2-D the z direction is the single cell range `0..1`.
    pub fn cell_range(&self, direction: Direction, p: usize) -> Range<usize> {
        match self.ownership.get(direction.index()) {
            Some(counts) => {
                let start: usize = counts[..p].iter().sum();
                start..start + counts[p]
            }
            None => {
                assert_eq!(p, 0, "Process coordinate out of bounds");
                0..1
            }
        }
    }

    /// The process coordinate along `direction` owning cell `cell`, if the cell is in range.
    pub fn owner_along(&self, direction: Direction, cell: usize) -> Option<usize> {
        let counts = match self.ownership.get(direction.index()) {
            Some(counts) => counts,
            None => return (cell == 0).then_some(0),
        };
        let mut end = 0;
        for (p, n) in counts.iter().enumerate() {
            end += n;
            if cell < end {
                return Some(p);
            }
        }
        None
    }
}
