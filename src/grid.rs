//! Vocabulary of staggered Cartesian grids: directions, fields and grid indices.
use itertools::iproduct;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A spatial direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    X,
    Y,
    Z,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::X, Direction::Y, Direction::Z];

    pub fn index(self) -> usize {
        match self {
            Direction::X => 0,
            Direction::Y => 1,
            Direction::Z => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::X => write!(f, "x"),
            Direction::Y => write!(f, "y"),
            Direction::Z => write!(f, "z"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Two,
    Three,
}

impl Dimension {
    pub fn from_value(dim: usize) -> Option<Self> {
        match dim {
            2 => Some(Dimension::Two),
            3 => Some(Dimension::Three),
            _ => None,
        }
    }

    pub fn value(self) -> usize {
        match self {
            Dimension::Two => 2,
            Dimension::Three => 3,
        }
    }

    /// The directions spanned by a mesh of this dimension.
    pub fn directions(self) -> &'static [Direction] {
        &Direction::ALL[..self.value()]
    }

    pub fn contains(self, direction: Direction) -> bool {
        direction.index() < self.value()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-D", self.value())
    }
}

/// A staggered field.
///
/// Velocity components live on the cell faces normal to their own direction, pressure lives at
/// cell centres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    U,
    V,
    W,
    P,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::U, Field::V, Field::W, Field::P];

    /// The velocity component along `direction`.
    pub fn velocity(direction: Direction) -> Self {
        match direction {
            Direction::X => Field::U,
            Direction::Y => Field::V,
            Direction::Z => Field::W,
        }
    }

    /// Dense index of the field, usable for per-field tables.
    pub fn index(self) -> usize {
        match self {
            Field::U => 0,
            Field::V => 1,
            Field::W => 2,
            Field::P => 3,
        }
    }

    /// The direction in which the field is staggered by half a cell, if any.
    pub fn staggered_direction(self) -> Option<Direction> {
        match self {
            Field::U => Some(Direction::X),
            Field::V => Some(Direction::Y),
            Field::W => Some(Direction::Z),
            Field::P => None,
        }
    }

    pub fn space(self) -> IndexSpace {
        match self {
            Field::P => IndexSpace::Pressure,
            _ => IndexSpace::Velocity,
        }
    }

    pub fn exists_in(self, dimension: Dimension) -> bool {
        match self.staggered_direction() {
            Some(direction) => dimension.contains(direction),
            None => true,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::U => "u",
            Field::V => "v",
            Field::W => "w",
            Field::P => "p",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A group of fields sharing one packed index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexSpace {
    Velocity,
    Pressure,
}

impl IndexSpace {
    /// The fields of the space, in packing order.
    pub fn fields(self, dimension: Dimension) -> &'static [Field] {
        match (self, dimension) {
            (IndexSpace::Velocity, Dimension::Two) => &[Field::U, Field::V],
            (IndexSpace::Velocity, Dimension::Three) => &[Field::U, Field::V, Field::W],
            (IndexSpace::Pressure, _) => &[Field::P],
        }
    }

    pub fn index(self) -> usize {
        match self {
            IndexSpace::Velocity => 0,
            IndexSpace::Pressure => 1,
        }
    }
}

/// A grid coordinate `(i, j, k)`.
///
/// Components are signed, since stencils reach one point past the boundary of a field. In 2-D
/// problems `k` is always zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridIndex {
    pub i: isize,
    pub j: isize,
    pub k: isize,
}

impl GridIndex {
    pub const fn new(i: isize, j: isize, k: isize) -> Self {
        Self { i, j, k }
    }

    pub fn component(&self, direction: Direction) -> isize {
        match direction {
            Direction::X => self.i,
            Direction::Y => self.j,
            Direction::Z => self.k,
        }
    }

    pub fn component_mut(&mut self, direction: Direction) -> &mut isize {
        match direction {
            Direction::X => &mut self.i,
            Direction::Y => &mut self.j,
            Direction::Z => &mut self.k,
        }
    }

    /// Returns the index moved by `offset` points along `direction`.
    pub fn shifted(mut self, direction: Direction, offset: isize) -> Self {
        *self.component_mut(direction) += offset;
        self
    }

    pub fn to_array(self) -> [isize; 3] {
        [self.i, self.j, self.k]
    }
}

impl From<[isize; 3]> for GridIndex {
    fn from([i, j, k]: [isize; 3]) -> Self {
        Self { i, j, k }
    }
}

impl fmt::Display for GridIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.i, self.j, self.k)
    }
}

/// A half-open box of grid indices, `begin` inclusive and `end` exclusive in every direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexBox {
    pub begin: GridIndex,
    pub end: GridIndex,
}

impl IndexBox {
    pub fn new(begin: GridIndex, end: GridIndex) -> Self {
        Self { begin, end }
    }

    /// The box `[0, shape[0]) x [0, shape[1]) x [0, shape[2])`.
    pub fn from_shape(shape: [usize; 3]) -> Self {
        Self {
            begin: GridIndex::default(),
            end: GridIndex::new(shape[0] as isize, shape[1] as isize, shape[2] as isize),
        }
    }

    pub fn extent(&self, direction: Direction) -> usize {
        let extent = self.end.component(direction) - self.begin.component(direction);
        extent.max(0) as usize
    }

    pub fn shape(&self) -> [usize; 3] {
        Direction::ALL.map(|d| self.extent(d))
    }

    pub fn num_points(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.num_points() == 0
    }

    pub fn contains(&self, index: &GridIndex) -> bool {
        Direction::ALL.iter().all(|&d| {
            let c = index.component(d);
            self.begin.component(d) <= c && c < self.end.component(d)
        })
    }

    /// Lexicographic position of `index` inside the box, with `i` running fastest.
    pub fn linear_offset(&self, index: &GridIndex) -> Option<usize> {
        if !self.contains(index) {
            return None;
        }
        let [nx, ny, _] = self.shape();
        let local = |d: Direction| (index.component(d) - self.begin.component(d)) as usize;
        Some(local(Direction::X) + nx * (local(Direction::Y) + ny * local(Direction::Z)))
    }

    /// Iterates over all indices in the box, with `i` running fastest and `k` slowest.
    pub fn iter(&self) -> impl Iterator<Item = GridIndex> {
        let (begin, end) = (self.begin, self.end);
        iproduct!(begin.k..end.k, begin.j..end.j, begin.i..end.i).map(|(k, j, i)| GridIndex::new(i, j, k))
    }
}
