//! Errors raised while building meshes and assembling operators.
use crate::grid::{Dimension, Field, GridIndex};
use stagger_sparse::MatrixError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssemblyError {
    /// The operator needs a field or direction that a mesh of this dimension does not have.
    #[error("{operator} needs field {field}, which does not exist on a {dimension} mesh")]
    UnsupportedDimension {
        operator: &'static str,
        field: Field,
        dimension: Dimension,
    },
    /// The operator's stencil has the wrong number of points for a mesh of this dimension.
    #[error("{operator} with a {points}-point stencil is not defined on a {dimension} mesh")]
    UnsupportedStencil {
        operator: &'static str,
        points: usize,
        dimension: Dimension,
    },
    #[error("field {field} does not exist on a {dimension} mesh")]
    FieldNotInMesh { field: Field, dimension: Dimension },
    /// The index is neither inside the field nor in its ghost layer.
    #[error("index {index} is outside the packing domain of field {field}")]
    IndexOutOfDomain { field: Field, index: GridIndex },
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
    #[error("invalid decomposition: {0}")]
    InvalidDecomposition(String),
    #[error("mesh is decomposed over {mesh} ranks, but the communicator has {comm}")]
    CommunicatorSize { mesh: usize, comm: usize },
    #[error("mesh belongs to rank {mesh}, but the communicator is rank {comm}")]
    RankMismatch { mesh: usize, comm: usize },
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}
