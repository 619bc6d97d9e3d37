use crate::comm::CommError;
use nalgebra_sparse::{SparseFormatError, SparseFormatErrorKind};
use std::fmt;
use thiserror::Error;

/// One of the two storage blocks of a locally owned row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    /// Columns owned by the same rank as the row.
    Diagonal,
    /// Columns owned by any other rank.
    OffDiagonal,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Diagonal => write!(f, "diagonal"),
            Block::OffDiagonal => write!(f, "off-diagonal"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("row and column layouts span {rows} and {cols} ranks")]
    LayoutRankCount { rows: usize, cols: usize },
    #[error("rank {rank} does not exist in a layout over {num_ranks} ranks")]
    RankOutOfRange { rank: usize, num_ranks: usize },
    #[error("matrix distributed over {layout} ranks cannot be assembled on a communicator of size {comm}")]
    CommunicatorSize { layout: usize, comm: usize },
    #[error("matrix built for rank {expected} is being assembled by rank {actual}")]
    CommunicatorRank { expected: usize, actual: usize },
    #[error("row {row} is outside the global row range 0..{nrows}")]
    RowOutOfBounds { row: usize, nrows: usize },
    #[error("column {col} is outside the global column range 0..{ncols}")]
    ColumnOutOfBounds { col: usize, ncols: usize },
    #[error("preallocation describes {actual} rows but rank owns {expected}")]
    PreallocationLength { expected: usize, actual: usize },
    #[error(
        "entry ({row}, {col}) exceeds the preallocated {block} capacity of {capacity} entries in row {row}"
    )]
    PreallocationExceeded {
        row: usize,
        col: usize,
        block: Block,
        capacity: usize,
    },
    #[error("ranks disagree on the distribution of the matrix: global shapes {shapes:?}")]
    LayoutMismatch { shapes: Vec<(usize, usize)> },
    #[error(transparent)]
    Comm(#[from] CommError),
    #[error("assembled data is not valid CSR ({kind:?}): {message}")]
    Format { kind: SparseFormatErrorKind, message: String },
}

impl From<SparseFormatError> for MatrixError {
    fn from(error: SparseFormatError) -> Self {
        Self::Format {
            kind: *error.kind(),
            message: error.to_string(),
        }
    }
}
