//! Discrete differential operators on staggered grids.
//!
//! Each operator is a [`StencilOperator`](crate::stencil::StencilOperator) together with a
//! factory function that assembles it into a finalized distributed matrix.
mod divergence;
mod gradient;
mod interpolation;
mod laplacian;

pub use divergence::*;
pub use gradient::*;
pub use interpolation::*;
pub use laplacian::*;
