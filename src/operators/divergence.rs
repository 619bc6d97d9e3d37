use crate::assembly::{OperatorAssembler, OperatorOptions};
use crate::error::AssemblyError;
use crate::grid::{Direction, Field, GridIndex, IndexSpace};
use crate::mesh::StaggeredGrid;
use crate::stencil::{backward_pair, Scaling, StencilOperator};
use stagger_sparse::{Communicator, DistributedCsrMatrix};
use stagger_traits::Real;

/// The divergence of the velocity, evaluated at the pressure points.
///
/// In the pass along `d`, row `p(i)` gets the columns `u_d(i - 1)` and `u_d(i)` with
/// coefficients `-1/h` and `1/h`, `h` being the cell width along `d`. Velocity points on a
/// non-periodic boundary are not unknowns, so boundary rows only get the interior face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divergence {
    scaling: Scaling,
}

impl Divergence {
    pub fn new(scaling: Scaling) -> Self {
        Self { scaling }
    }
}

impl<T: Real> StencilOperator<T, 2> for Divergence {
    fn name(&self) -> &'static str {
        "divergence"
    }

    fn row_space(&self) -> IndexSpace {
        IndexSpace::Pressure
    }

    fn column_space(&self) -> IndexSpace {
        IndexSpace::Velocity
    }

    fn row_field(&self, _pass: Direction) -> Field {
        Field::P
    }

    fn column_field(&self, pass: Direction) -> Field {
        Field::velocity(pass)
    }

    fn neighbors(&self, pass: Direction, index: GridIndex) -> [GridIndex; 2] {
        backward_pair(pass, index)
    }

    fn coefficients<G>(&self, grid: &G, pass: Direction, index: GridIndex) -> [T; 2]
    where
        G: StaggeredGrid<T>,
    {
        match self.scaling {
            Scaling::Normalized => [-T::one(), T::one()],
            Scaling::Physical => {
                let inv_h = T::one() / grid.spacing(Field::P, pass, index.component(pass));
                [-inv_h, inv_h]
            }
        }
    }
}

/// Assembles the divergence, mapping velocity to pressure.
///
/// Collective over `comm`.
pub fn create_divergence<T, G, C>(
    grid: &G,
    comm: &C,
    options: &OperatorOptions,
) -> Result<DistributedCsrMatrix<T>, AssemblyError>
where
    T: Real,
    G: StaggeredGrid<T>,
    C: Communicator,
{
    OperatorAssembler::new(grid, options).assemble(&Divergence::new(options.scaling), comm)
}
