use crate::assembly::{OperatorAssembler, OperatorOptions};
use crate::error::AssemblyError;
use crate::grid::{Dimension, Direction, Field, GridIndex, IndexSpace};
use crate::mesh::StaggeredGrid;
use crate::stencil::{star, star_size, Scaling, StencilOperator};
use stagger_sparse::{Communicator, DistributedCsrMatrix, InsertMode};
use stagger_traits::Real;

/// The vector Laplacian of the velocity, one pass per velocity component.
///
/// Implemented as a 5-point operator for 2-D meshes and a 7-point operator for 3-D meshes.
/// Along each axis, with `dm` and `dp` the distances to the previous and next point and `h` the
/// spacing of the point itself, the neighbors get `1 / (dm h)` and `1 / (dp h)` and the centre
/// gets minus their sum. Ghost points on non-periodic boundaries lie on the boundary face: they
/// still shorten the distances, but have no column.
///
/// Entries are added rather than inserted, so that the two neighbors along a periodic axis with
/// only two points combine into one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Laplacian {
    scaling: Scaling,
}

impl Laplacian {
    pub fn new(scaling: Scaling) -> Self {
        Self { scaling }
    }

    fn star_coefficients<T, G, const N: usize>(&self, grid: &G, pass: Direction, index: GridIndex) -> [T; N]
    where
        T: Real,
        G: StaggeredGrid<T>,
    {
        let field = Field::velocity(pass);
        let mut coefficients = [T::zero(); N];
        for (a, &axis) in Direction::ALL[..(N - 1) / 2].iter().enumerate() {
            let (minus, plus) = match self.scaling {
                Scaling::Normalized => (T::one(), T::one()),
                Scaling::Physical => {
                    let c = index.component(axis);
                    let x = grid.coordinate(field, axis, c);
                    let dm = x - grid.coordinate(field, axis, c - 1);
                    let dp = grid.coordinate(field, axis, c + 1) - x;
                    let h = grid.spacing(field, axis, c);
                    (T::one() / (dm * h), T::one() / (dp * h))
                }
            };
            coefficients[1 + 2 * a] = minus;
            coefficients[2 + 2 * a] = plus;
            coefficients[0] -= minus + plus;
        }
        coefficients
    }
}

macro_rules! impl_star_laplacian {
    ($points:expr) => {
        impl<T: Real> StencilOperator<T, $points> for Laplacian {
            fn name(&self) -> &'static str {
                "laplacian"
            }

            fn row_space(&self) -> IndexSpace {
                IndexSpace::Velocity
            }

            fn column_space(&self) -> IndexSpace {
                IndexSpace::Velocity
            }

            fn supports_dimension(&self, dimension: Dimension) -> bool {
                star_size(dimension) == $points
            }

            fn row_field(&self, pass: Direction) -> Field {
                Field::velocity(pass)
            }

            fn column_field(&self, pass: Direction) -> Field {
                Field::velocity(pass)
            }

            fn insert_mode(&self) -> InsertMode {
                InsertMode::Add
            }

            fn neighbors(&self, _pass: Direction, index: GridIndex) -> [GridIndex; $points] {
                star(index)
            }

            fn coefficients<G>(&self, grid: &G, pass: Direction, index: GridIndex) -> [T; $points]
            where
                G: StaggeredGrid<T>,
            {
                self.star_coefficients(grid, pass, index)
            }
        }
    };
}

impl_star_laplacian!(5);
impl_star_laplacian!(7);

/// Assembles the Laplacian, mapping velocity to velocity.
///
/// Collective over `comm`.
pub fn create_laplacian<T, G, C>(
    grid: &G,
    comm: &C,
    options: &OperatorOptions,
) -> Result<DistributedCsrMatrix<T>, AssemblyError>
where
    T: Real,
    G: StaggeredGrid<T>,
    C: Communicator,
{
    let operator = Laplacian::new(options.scaling);
    let assembler = OperatorAssembler::new(grid, options);
    match grid.dimension() {
        Dimension::Two => assembler.assemble::<_, _, 5>(&operator, comm),
        Dimension::Three => assembler.assemble::<_, _, 7>(&operator, comm),
    }
}
