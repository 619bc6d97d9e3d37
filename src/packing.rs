//! Packing of staggered field indices into global linear-algebra indices.
//!
//! All fields of an [`IndexSpace`] share one contiguous global index range. A
//! [`PackedIndexing`] maps each `(field, grid index)` pair of the space to its position in that
//! range, and tells which rank owns which positions.
use crate::decomposition::Decomposition;
use crate::error::AssemblyError;
use crate::grid::{Dimension, Direction, Field, GridIndex, IndexBox, IndexSpace};
use log::debug;
use stagger_sparse::Layout;
use std::fmt::Debug;

/// Number of points of `field` along `direction` on an axis with `cells` cells.
///
/// Velocity components along their own axis live on the interior faces, plus the wrapped face
/// on periodic axes. Everything else is cell centred.
pub fn field_points(field: Field, direction: Direction, cells: usize, periodic: bool) -> usize {
    if field.staggered_direction() == Some(direction) && !periodic {
        cells - 1
    } else {
        cells
    }
}

/// Maps grid indices of staggered fields to packed global indices.
///
/// Implementations must be deterministic and identical on all ranks: the index of a point
/// computed on one rank is the column another rank uses to refer to the same point.
pub trait PackedIndexing: Debug + Send + Sync {
    fn dimension(&self) -> Dimension;

    fn num_ranks(&self) -> usize;

    /// Global number of points of `field` along each axis. The z entry is 1 in 2-D.
    fn global_shape(&self, field: Field) -> Result<[usize; 3], AssemblyError>;

    /// Ownership of the packed indices of `space`.
    fn layout(&self, space: IndexSpace) -> &Layout;

    /// The grid indices of `field` owned by `rank`.
    fn owned_box(&self, field: Field, rank: usize) -> Result<IndexBox, AssemblyError>;

    /// The packed index of `field` at `index`.
    ///
    /// Indices up to one point outside the field along each axis are accepted. On periodic axes
    /// they wrap around; on other axes they are ghost points without a packed index, and
    /// `Ok(None)` is returned. Anything further out, or a field the mesh does not have, is an
    /// error.
    fn packed_index(&self, field: Field, index: GridIndex) -> Result<Option<usize>, AssemblyError>;
}

/// Packing in which every rank owns one contiguous block per index space.
///
/// Inside the block of a rank the fields follow each other in the order `U, V, W` (velocity)
/// or consist of `P` alone (pressure), and the points of a field are ordered lexicographically
/// with `i` running fastest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankBlockPacking {
    dimension: Dimension,
    decomposition: Decomposition,
    periodic: [bool; 3],
    /// Global number of points of each field along each axis, indexed by `Field::index`.
    shapes: [[usize; 3]; 4],
    /// `field_offsets[rank][field]` is the first packed index of the field block of `rank`.
    field_offsets: Vec<[usize; 4]>,
    layouts: [Layout; 2],
}

impl RankBlockPacking {
    /// `periodic` has one entry per axis of the decomposition.
    pub fn new(decomposition: Decomposition, periodic: &[bool]) -> Result<Self, AssemblyError> {
        let dimension = decomposition.dimension();
        if periodic.len() != dimension.value() {
            return Err(AssemblyError::InvalidMesh(format!(
                "{} periodicity flags for a {} decomposition",
                periodic.len(),
                dimension
            )));
        }
        let cells = decomposition.total_cells();
        let mut periodic_flags = [false; 3];
        periodic_flags[..periodic.len()].copy_from_slice(periodic);

        let mut shapes = [[1; 3]; 4];
        for field in Field::ALL {
            for &d in dimension.directions() {
                let n = cells[d.index()];
                if n < 2 {
                    return Err(AssemblyError::InvalidMesh(format!(
                        "axis {} has {} cells, at least 2 are required",
                        d, n
                    )));
                }
                shapes[field.index()][d.index()] = field_points(field, d, n, periodic_flags[d.index()]);
            }
        }

        let mut packing = Self {
            dimension,
            decomposition,
            periodic: periodic_flags,
            shapes,
            field_offsets: Vec::new(),
            layouts: [Layout::serial(0), Layout::serial(0)],
        };

        let num_ranks = packing.decomposition.num_ranks();
        let mut field_offsets = vec![[usize::MAX; 4]; num_ranks];
        let mut local_sizes = [vec![0; num_ranks], vec![0; num_ranks]];
        let mut offset = [0, 0];
        for rank in 0..num_ranks {
            for space in [IndexSpace::Velocity, IndexSpace::Pressure] {
                for &field in space.fields(dimension) {
                    let points = packing.owned_box_unchecked(field, rank).num_points();
                    field_offsets[rank][field.index()] = offset[space.index()];
                    offset[space.index()] += points;
                    local_sizes[space.index()][rank] += points;
                }
            }
        }
        packing.field_offsets = field_offsets;
        packing.layouts = local_sizes.map(|sizes| Layout::from_local_sizes(&sizes));

        debug!(
            "packed {} velocity and {} pressure unknowns over {} ranks (process grid {:?})",
            packing.layouts[0].global_size(),
            packing.layouts[1].global_size(),
            num_ranks,
            packing.decomposition.process_grid()
        );
        Ok(packing)
    }

    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }

    pub fn is_periodic(&self, direction: Direction) -> bool {
        self.periodic[direction.index()]
    }

    fn check_field(&self, field: Field) -> Result<(), AssemblyError> {
        if field.exists_in(self.dimension) {
            Ok(())
        } else {
            Err(AssemblyError::FieldNotInMesh {
                field,
                dimension: self.dimension,
            })
        }
    }

    /// Owned range of `field`, which must exist in the mesh.
    ///
    /// The owned range of a velocity component along its own non-periodic axis is that of the
    /// cells, except that the last process along the axis owns one point less.
    fn owned_box_unchecked(&self, field: Field, rank: usize) -> IndexBox {
        let coords = self.decomposition.coords_of(rank);
        let grid = self.decomposition.process_grid();
        let mut begin = GridIndex::default();
        let mut end = GridIndex::default();
        for d in Direction::ALL {
            let p = coords[d.index()];
            let cells = self.decomposition.cell_range(d, p);
            let mut stop = cells.end;
            let staggered = field.staggered_direction() == Some(d);
            if staggered && !self.periodic[d.index()] && p + 1 == grid[d.index()] {
                stop -= 1;
            }
            *begin.component_mut(d) = cells.start as isize;
            *end.component_mut(d) = stop as isize;
        }
        IndexBox::new(begin, end)
    }
}

impl PackedIndexing for RankBlockPacking {
    fn dimension(&self) -> Dimension {
        self.dimension
    }

    fn num_ranks(&self) -> usize {
        self.decomposition.num_ranks()
    }

    fn global_shape(&self, field: Field) -> Result<[usize; 3], AssemblyError> {
        self.check_field(field)?;
        Ok(self.shapes[field.index()])
    }

    fn layout(&self, space: IndexSpace) -> &Layout {
        &self.layouts[space.index()]
    }

    fn owned_box(&self, field: Field, rank: usize) -> Result<IndexBox, AssemblyError> {
        self.check_field(field)?;
        if rank >= self.num_ranks() {
            return Err(AssemblyError::InvalidDecomposition(format!(
                "rank {} out of bounds for {} ranks",
                rank,
                self.num_ranks()
            )));
        }
        Ok(self.owned_box_unchecked(field, rank))
    }

    fn packed_index(&self, field: Field, index: GridIndex) -> Result<Option<usize>, AssemblyError> {
        self.check_field(field)?;
        let out_of_domain = AssemblyError::IndexOutOfDomain { field, index };
        if self.dimension == Dimension::Two && index.k != 0 {
            return Err(out_of_domain);
        }

        let shape = self.shapes[field.index()];
        let mut wrapped = index;
        let mut ghost = false;
        for &d in self.dimension.directions() {
            let n = shape[d.index()] as isize;
            let c = wrapped.component_mut(d);
            if *c < -1 || *c > n {
                return Err(out_of_domain);
            }
            if *c == -1 || *c == n {
                if self.periodic[d.index()] {
                    *c = (*c + n) % n;
                } else {
                    ghost = true;
                }
            }
        }
        if ghost {
            return Ok(None);
        }

        let mut coords = [0; 3];
        for d in Direction::ALL {
            coords[d.index()] = self
                .decomposition
                .owner_along(d, wrapped.component(d) as usize)
                .ok_or(AssemblyError::IndexOutOfDomain { field, index })?;
        }
        let rank = self.decomposition.rank_of(coords);
        let owned = self.owned_box_unchecked(field, rank);
        let offset = owned
            .linear_offset(&wrapped)
            .ok_or(AssemblyError::IndexOutOfDomain { field, index })?;
        Ok(Some(self.field_offsets[rank][field.index()] + offset))
    }
}
