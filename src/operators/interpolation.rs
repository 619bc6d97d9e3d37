use crate::assembly::{OperatorAssembler, OperatorOptions};
use crate::error::AssemblyError;
use crate::grid::{Direction, Field, GridIndex, IndexSpace};
use crate::mesh::StaggeredGrid;
use crate::stencil::{forward_pair, Scaling, StencilOperator};
use numeric_literals::replace_float_literals;
use stagger_sparse::{Communicator, DistributedCsrMatrix};
use stagger_traits::Real;

/// Linear interpolation of the pressure to the velocity points.
///
/// The velocity point `u_d(i)` lies on the face between the cells of `p(i)` and `p(i + 1)`.
/// With `w0` and `w1` the widths of those two cells, the weights are
/// `(w1, w0) / (w0 + w1)`, which is exact for fields that are linear along `d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interpolation {
    scaling: Scaling,
}

impl Interpolation {
    pub fn new(scaling: Scaling) -> Self {
        Self { scaling }
    }
}

impl<T: Real> StencilOperator<T, 2> for Interpolation {
    fn name(&self) -> &'static str {
        "interpolation"
    }

    fn row_space(&self) -> IndexSpace {
        IndexSpace::Velocity
    }

    fn column_space(&self) -> IndexSpace {
        IndexSpace::Pressure
    }

    fn row_field(&self, pass: Direction) -> Field {
        Field::velocity(pass)
    }

    fn column_field(&self, _pass: Direction) -> Field {
        Field::P
    }

    fn neighbors(&self, pass: Direction, index: GridIndex) -> [GridIndex; 2] {
        forward_pair(pass, index)
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn coefficients<G>(&self, grid: &G, pass: Direction, index: GridIndex) -> [T; 2]
    where
        G: StaggeredGrid<T>,
    {
        match self.scaling {
            Scaling::Normalized => [0.5, 0.5],
            Scaling::Physical => {
                let i = index.component(pass);
                let w0 = grid.spacing(Field::P, pass, i);
                let w1 = grid.spacing(Field::P, pass, i + 1);
                [w1 / (w0 + w1), w0 / (w0 + w1)]
            }
        }
    }
}

/// Assembles the interpolation from pressure to velocity points.
///
/// Collective over `comm`.
pub fn create_interpolation<T, G, C>(
    grid: &G,
    comm: &C,
    options: &OperatorOptions,
) -> Result<DistributedCsrMatrix<T>, AssemblyError>
where
    T: Real,
    G: StaggeredGrid<T>,
    C: Communicator,
{
    OperatorAssembler::new(grid, options).assemble(&Interpolation::new(options.scaling), comm)
}
