use crate::assembly::{OperatorAssembler, OperatorOptions};
use crate::error::AssemblyError;
use crate::grid::{Dimension, Direction, Field, GridIndex, IndexSpace};
use crate::mesh::StaggeredGrid;
use crate::stencil::{forward_pair, Scaling, StencilOperator};
use stagger_sparse::{Communicator, DistributedCsrMatrix};
use stagger_traits::Real;

/// The gradient of the pressure, evaluated at the velocity points.
///
/// Row `u_d(i)` of the pass along `d` has the columns `p(i)` and `p(i + 1)` (shifted along
/// `d`) with coefficients `-1/h` and `1/h`, where `h` is the spacing of the velocity point
/// along `d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gradient {
    scaling: Scaling,
    component: Option<Direction>,
}

impl Gradient {
    /// The gradient along every direction of the mesh.
    pub fn new(scaling: Scaling) -> Self {
        Self {
            scaling,
            component: None,
        }
    }

    /// A single component of the gradient.
    pub fn component(scaling: Scaling, direction: Direction) -> Self {
        Self {
            scaling,
            component: Some(direction),
        }
    }
}

impl<T: Real> StencilOperator<T, 2> for Gradient {
    fn name(&self) -> &'static str {
        "gradient"
    }

    fn row_space(&self) -> IndexSpace {
        IndexSpace::Velocity
    }

    fn column_space(&self) -> IndexSpace {
        IndexSpace::Pressure
    }

    fn passes(&self, dimension: Dimension) -> Vec<Direction> {
        match self.component {
            Some(direction) => vec![direction],
            None => dimension.directions().to_vec(),
        }
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

    fn coefficients<G>(&self, grid: &G, pass: Direction, index: GridIndex) -> [T; 2]
    where
        G: StaggeredGrid<T>,
    {
        match self.scaling {
            Scaling::Normalized => [-T::one(), T::one()],
            Scaling::Physical => {
                let h = grid.spacing(Field::velocity(pass), pass, index.component(pass));
                let inv_h = T::one() / h;
                [-inv_h, inv_h]
            }
        }
    }
}

/// Assembles the gradient, mapping pressure to all velocity components.
///
/// Collective over `comm`.
pub fn create_gradient<T, G, C>(
    grid: &G,
    comm: &C,
    options: &OperatorOptions,
) -> Result<DistributedCsrMatrix<T>, AssemblyError>
where
    T: Real,
    G: StaggeredGrid<T>,
    C: Communicator,
{
    OperatorAssembler::new(grid, options).assemble(&Gradient::new(options.scaling), comm)
}

/// Assembles the rows of a single gradient component.
///
/// The matrix still spans the whole velocity space; the rows of the other components are
/// empty. Fails with [`AssemblyError::UnsupportedDimension`] before allocating anything if the
/// mesh has no such direction.
pub fn create_gradient_component<T, G, C>(
    grid: &G,
    direction: Direction,
    comm: &C,
    options: &OperatorOptions,
) -> Result<DistributedCsrMatrix<T>, AssemblyError>
where
    T: Real,
    G: StaggeredGrid<T>,
    C: Communicator,
{
    OperatorAssembler::new(grid, options).assemble(&Gradient::component(options.scaling, direction), comm)
}
