//! Distributed sparse matrices with block-row ownership.
//!
//! Rows are partitioned into contiguous ranges, one per rank. Each rank stores its rows in two
//! CSR blocks: the *diagonal* block holds the columns owned by the same rank, the
//! *off-diagonal* block every other column. Entries are inserted into a
//! [`DistributedMatrixBuilder`], which must be finalized with the collective
//! [`DistributedMatrixBuilder::assemble`] before the matrix can be used.

pub mod comm;
pub mod distributed;
pub mod error;
pub mod layout;

pub use distributed::*;
pub use error::*;
pub use layout::Layout;

pub extern crate nalgebra_sparse;
pub use stagger_traits::comm::{CommError, Communicator};
