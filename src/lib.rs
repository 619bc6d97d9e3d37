//! Assembly of discrete differential operators on distributed staggered Cartesian grids.
//!
//! A [`StaggeredMesh`](mesh::StaggeredMesh) describes the grid as seen from one rank: the
//! geometry of the velocity and pressure points, the part of each field owned by the rank, and
//! the packing of all field points into global indices. The factories in [`operators`] turn it
//! into gradient, divergence, Laplacian and interpolation matrices, distributed over the ranks
//! as [`DistributedCsrMatrix`](sparse::DistributedCsrMatrix).

pub mod assembly;
pub mod decomposition;
pub mod error;
pub mod grid;
pub mod mesh;
pub mod operators;
pub mod packing;
pub mod stencil;

#[cfg(feature = "proptest")]
pub mod proptest;

pub mod sparse {
    pub use stagger_sparse::*;
}

pub mod comm {
    pub use stagger_sparse::comm::*;
}

pub use stagger_traits::Real;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
