//! Staggered Cartesian meshes.
//!
//! A mesh is described by the cell widths along each axis. Pressure points sit at the cell
//! centres, and the velocity component along an axis sits on the cell faces normal to that axis.
//! Each rank owns a box of every field, determined by a [`Decomposition`], and global indices
//! are assigned by a [`PackedIndexing`].
use crate::decomposition::Decomposition;
use crate::error::AssemblyError;
use crate::grid::{Dimension, Direction, Field, GridIndex, IndexBox, IndexSpace};
use crate::packing::{PackedIndexing, RankBlockPacking};
use log::debug;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use stagger_traits::Real;
use std::sync::Arc;

/// Cells along one axis of a mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis<T> {
    /// Coordinate of the first cell face.
    pub start: T,
    /// Widths of the cells, in order.
    pub widths: Vec<T>,
    #[serde(default)]
    pub periodic: bool,
}

impl<T: Real> Axis<T> {
    pub fn new(start: T, widths: Vec<T>, periodic: bool) -> Self {
        Self {
            start,
            widths,
            periodic,
        }
    }

    /// `cells` cells of equal width spanning `[start, end]`.
    pub fn uniform(start: T, end: T, cells: usize, periodic: bool) -> Self {
        let width = (end - start) / T::from_usize(cells).expect("Cell count must be representable");
        Self::new(start, vec![width; cells], periodic)
    }

    pub fn num_cells(&self) -> usize {
        self.widths.len()
    }

    pub fn length(&self) -> T {
        self.widths.iter().fold(T::zero(), |sum, &w| sum + w)
    }

    /// Coordinates of all cell faces, from `start` to `start + length`.
    pub fn faces(&self) -> Vec<T> {
        let mut faces = Vec::with_capacity(self.widths.len() + 1);
        let mut x = self.start;
        faces.push(x);
        for &w in &self.widths {
            x += w;
            faces.push(x);
        }
        faces
    }
}

/// Geometry of a staggered mesh, shared by all ranks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDescription<T> {
    /// Two or three axes, in the order x, y, z.
    pub axes: Vec<Axis<T>>,
}

impl<T: Real> MeshDescription<T> {
    pub fn new(axes: Vec<Axis<T>>) -> Self {
        Self { axes }
    }

    /// A mesh with uniform cells spanning `[0, lengths[d]]` along each axis.
    ///
    /// # Panics
    ///
    /// Panics if `cells`, `lengths` and `periodic` differ in length.
    pub fn uniform(cells: &[usize], lengths: &[T], periodic: &[bool]) -> Self {
        assert!(
            cells.len() == lengths.len() && cells.len() == periodic.len(),
            "Expected one cell count, length and periodicity flag per axis, got {}, {} and {}",
            cells.len(),
            lengths.len(),
            periodic.len()
        );
        let axes = cells
            .iter()
            .zip(lengths)
            .zip(periodic)
            .map(|((&n, &length), &periodic)| Axis::uniform(T::zero(), length, n, periodic))
            .collect();
        Self { axes }
    }

    pub fn cells(&self) -> Vec<usize> {
        self.axes.iter().map(Axis::num_cells).collect()
    }

    pub fn periodic(&self) -> Vec<bool> {
        self.axes.iter().map(|axis| axis.periodic).collect()
    }

    pub fn validate(&self) -> Result<Dimension, AssemblyError> {
        let dimension = Dimension::from_value(self.axes.len()).ok_or_else(|| {
            AssemblyError::InvalidMesh(format!("expected 2 or 3 axes, got {}", self.axes.len()))
        })?;
        for (d, axis) in self.axes.iter().enumerate() {
            if axis.num_cells() < 2 {
                return Err(AssemblyError::InvalidMesh(format!(
                    "axis {} has {} cells, at least 2 are required",
                    d,
                    axis.num_cells()
                )));
            }
            if !axis.start.is_finite() {
                return Err(AssemblyError::InvalidMesh(format!("axis {} has a non-finite start", d)));
            }
            if let Some(i) = axis.widths.iter().position(|w| !(w.is_finite() && *w > T::zero())) {
                return Err(AssemblyError::InvalidMesh(format!(
                    "cell {} of axis {} has width {}, widths must be positive and finite",
                    i, d, axis.widths[i]
                )));
            }
        }
        Ok(dimension)
    }
}

/// Read access to a staggered mesh as seen from one rank.
///
/// This is everything operator assembly needs to know about a mesh: the owned boxes of the
/// fields, their geometry and the packed global indices.
pub trait StaggeredGrid<T: Real> {
    fn dimension(&self) -> Dimension;

    fn rank(&self) -> usize;

    fn num_ranks(&self) -> usize;

    fn is_periodic(&self, direction: Direction) -> bool;

    /// Global number of points of `field` along each axis. The z entry is 1 in 2-D.
    fn global_shape(&self, field: Field) -> Result<[usize; 3], AssemblyError>;

    /// The grid indices of `field` owned by this rank.
    fn local_box(&self, field: Field) -> Result<IndexBox, AssemblyError>;

    /// Width of the control volume of point `index` of `field` along `direction`.
    ///
    /// Accepts the ghost layer `-1` and `n`. Ghost points on non-periodic axes mirror the
    /// adjacent interior point.
    ///
    /// # Panics
    ///
    /// Panics if the index is further outside the field, or if the field or direction does not
    /// exist in the mesh.
    fn spacing(&self, field: Field, direction: Direction, index: isize) -> T;

    /// Coordinate of point `index` of `field` along `direction`.
    ///
    /// Ghost points wrap around (shifted by the axis length) on periodic axes and lie on the
    /// boundary face on other axes.
    ///
    /// # Panics
    ///
    /// Same conditions as [`spacing`](Self::spacing).
    fn coordinate(&self, field: Field, direction: Direction, index: isize) -> T;

    fn packing(&self) -> &dyn PackedIndexing;

    fn packed_index(&self, field: Field, index: GridIndex) -> Result<Option<usize>, AssemblyError> {
        self.packing().packed_index(field, index)
    }
}

/// Coordinates and spacings of the points of one field along one axis, without ghosts.
#[derive(Debug, Clone, PartialEq)]
struct AxisPoints<T> {
    coordinates: Vec<T>,
    spacings: Vec<T>,
    /// Coordinates of the two boundary faces.
    bounds: (T, T),
    periodic: bool,
}

impl<T: Real> AxisPoints<T> {
    fn cell_centred(axis: &Axis<T>) -> Self {
        let faces = axis.faces();
        let coordinates = faces
            .windows(2)
            .map(|pair| (pair[0] + pair[1]) * T::from_f64(0.5).expect("0.5 is representable"))
            .collect();
        Self {
            coordinates,
            spacings: axis.widths.clone(),
            bounds: (faces[0], faces[faces.len() - 1]),
            periodic: axis.periodic,
        }
    }

    /// Points on the cell faces. The spacing of a face is the distance between the centres of
    /// the two cells sharing it.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn face_centred(axis: &Axis<T>) -> Self {
        let faces = axis.faces();
        let w = &axis.widths;
        let n = w.len();
        let num_points = if axis.periodic { n } else { n - 1 };
        let coordinates = faces[1..=num_points].to_vec();
        let spacings = (0..num_points)
            .map(|i| (w[i] + w[(i + 1) % n]) * 0.5)
            .collect();
        Self {
            coordinates,
            spacings,
            bounds: (faces[0], faces[n]),
            periodic: axis.periodic,
        }
    }

    fn len(&self) -> usize {
        self.coordinates.len()
    }

    fn check(&self, index: isize) {
        let n = self.len() as isize;
        assert!(
            (-1..=n).contains(&index),
            "Index {} is outside the field and its ghost layer (0 .. {})",
            index,
            n
        );
    }

    fn coordinate(&self, index: isize) -> T {
        self.check(index);
        let n = self.len() as isize;
        let (lower, upper) = self.bounds;
        match (index, self.periodic) {
            (-1, true) => self.coordinates[(n - 1) as usize] - (upper - lower),
            (-1, false) => lower,
            (i, true) if i == n => self.coordinates[0] + (upper - lower),
            (i, false) if i == n => upper,
            (i, _) => self.coordinates[i as usize],
        }
    }

    fn spacing(&self, index: isize) -> T {
        self.check(index);
        let n = self.len() as isize;
        match (index, self.periodic) {
            (-1, true) => self.spacings[(n - 1) as usize],
            (-1, false) => self.spacings[0],
            (i, true) if i == n => self.spacings[0],
            (i, false) if i == n => self.spacings[(n - 1) as usize],
            (i, _) => self.spacings[i as usize],
        }
    }
}

/// The reference [`StaggeredGrid`]: a rectilinear mesh given by cell widths.
#[derive(Debug, Clone)]
pub struct StaggeredMesh<T> {
    description: MeshDescription<T>,
    dimension: Dimension,
    rank: usize,
    /// `points[field][axis]`, for the fields and axes present in the mesh.
    points: Vec<Vec<AxisPoints<T>>>,
    packing: Arc<dyn PackedIndexing>,
}

impl<T: Real> StaggeredMesh<T> {
    /// Creates the view of `rank` on a mesh distributed according to `decomposition`.
    pub fn new(
        description: MeshDescription<T>,
        decomposition: Decomposition,
        rank: usize,
    ) -> Result<Self, AssemblyError> {
        description.validate()?;
        if decomposition.total_cells() != description.cells() {
            return Err(AssemblyError::InvalidDecomposition(format!(
                "decomposition covers {:?} cells, mesh has {:?}",
                decomposition.total_cells(),
                description.cells()
            )));
        }
        let packing = RankBlockPacking::new(decomposition, &description.periodic())?;
        Self::with_packing(description, Arc::new(packing), rank)
    }

    /// The whole mesh on a single rank.
    pub fn serial(description: MeshDescription<T>) -> Result<Self, AssemblyError> {
        let decomposition = Decomposition::serial(&description.cells())?;
        Self::new(description, decomposition, 0)
    }

    /// The view of `rank` on a mesh whose packed indices are given by `packing`.
    pub fn with_packing(
        description: MeshDescription<T>,
        packing: Arc<dyn PackedIndexing>,
        rank: usize,
    ) -> Result<Self, AssemblyError> {
        let dimension = description.validate()?;
        if packing.dimension() != dimension {
            return Err(AssemblyError::InvalidMesh(format!(
                "packing is {}, mesh description is {}",
                packing.dimension(),
                dimension
            )));
        }
        if rank >= packing.num_ranks() {
            return Err(AssemblyError::InvalidDecomposition(format!(
                "rank {} out of bounds for {} ranks",
                rank,
                packing.num_ranks()
            )));
        }

        let points = Field::ALL
            .iter()
            .map(|field| {
                description
                    .axes
                    .iter()
                    .zip(Direction::ALL)
                    .map(|(axis, d)| {
                        if field.staggered_direction() == Some(d) {
                            AxisPoints::face_centred(axis)
                        } else {
                            AxisPoints::cell_centred(axis)
                        }
                    })
                    .collect()
            })
            .collect();

        let mesh = Self {
            description,
            dimension,
            rank,
            points,
            packing,
        };
        for &field in Field::ALL.iter().filter(|field| field.exists_in(dimension)) {
            let expected = mesh.global_shape(field)?;
            let packed = mesh.packing.global_shape(field)?;
            if packed != expected {
                return Err(AssemblyError::InvalidMesh(format!(
                    "packing has {:?} points of field {}, mesh description has {:?}",
                    packed, field, expected
                )));
            }
        }

        debug!(
            "rank {} of {}: {} staggered mesh with {:?} cells",
            rank,
            mesh.packing.num_ranks(),
            dimension,
            mesh.description.cells()
        );
        Ok(mesh)
    }

    pub fn description(&self) -> &MeshDescription<T> {
        &self.description
    }

    /// Total number of unknowns in an index space.
    pub fn space_size(&self, space: IndexSpace) -> usize {
        self.packing.layout(space).global_size()
    }

    fn axis_points(&self, field: Field, direction: Direction) -> &AxisPoints<T> {
        assert!(
            field.exists_in(self.dimension) && self.dimension.contains(direction),
            "Field {} along {} does not exist on a {} mesh",
            field,
            direction,
            self.dimension
        );
        &self.points[field.index()][direction.index()]
    }
}

impl<T: Real> StaggeredGrid<T> for StaggeredMesh<T> {
    fn dimension(&self) -> Dimension {
        self.dimension
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn num_ranks(&self) -> usize {
        self.packing.num_ranks()
    }

    fn is_periodic(&self, direction: Direction) -> bool {
        self.description
            .axes
            .get(direction.index())
            .map_or(false, |axis| axis.periodic)
    }

    fn global_shape(&self, field: Field) -> Result<[usize; 3], AssemblyError> {
        if !field.exists_in(self.dimension) {
            return Err(AssemblyError::FieldNotInMesh {
                field,
                dimension: self.dimension,
            });
        }
        let mut shape = [1; 3];
        for &d in self.dimension.directions() {
            shape[d.index()] = self.axis_points(field, d).len();
        }
        Ok(shape)
    }

    fn local_box(&self, field: Field) -> Result<IndexBox, AssemblyError> {
        self.packing.owned_box(field, self.rank)
    }

    fn spacing(&self, field: Field, direction: Direction, index: isize) -> T {
        self.axis_points(field, direction).spacing(index)
    }

    fn coordinate(&self, field: Field, direction: Direction, index: isize) -> T {
        self.axis_points(field, direction).coordinate(index)
    }

    fn packing(&self) -> &dyn PackedIndexing {
        self.packing.as_ref()
    }
}
