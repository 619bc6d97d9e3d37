//! Collective communication between the ranks that jointly own a distributed object.
//!
//! Every rank participating in a collective must call it, in the same order as all other ranks.
//! A rank that skips a collective leaves the others blocked: there is no timeout and no
//! cancellation.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommError {
    #[error("rank {rank} lost its connection to the communicator group")]
    Disconnected { rank: usize },
    #[error("collective called with {actual} outgoing buffers on a communicator of size {expected}")]
    BufferCount { expected: usize, actual: usize },
    #[error("rank {source_rank} sent a payload of an unexpected type")]
    PayloadType { source_rank: usize },
    #[error("rank {source_rank} did not contribute to the collective")]
    MissingContribution { source_rank: usize },
}

pub trait Communicator {
    /// The rank of the calling process, in `0 .. self.size()`.
    fn rank(&self) -> usize;

    /// The number of ranks in the group.
    fn size(&self) -> usize;

    /// Personalized all-to-all exchange.
    ///
    /// `outgoing[r]` is delivered to rank `r`. Entry `r` of the result holds whatever rank `r`
    /// sent to the calling rank. `outgoing` must have exactly `self.size()` entries.
    fn all_to_all<M>(&self, outgoing: Vec<Vec<M>>) -> Result<Vec<Vec<M>>, CommError>
    where
        M: Send + 'static;

    /// Gathers one value from every rank, ordered by rank, on every rank.
    fn all_gather<M>(&self, value: M) -> Result<Vec<M>, CommError>
    where
        M: Clone + Send + 'static,
    {
        let outgoing = (0..self.size()).map(|_| vec![value.clone()]).collect();
        self.all_to_all(outgoing)?
            .into_iter()
            .enumerate()
            .map(|(source_rank, mut values)| values.pop().ok_or(CommError::MissingContribution { source_rank }))
            .collect()
    }

    /// Blocks until every rank has entered the barrier.
    fn barrier(&self) -> Result<(), CommError> {
        self.all_gather(()).map(|_| ())
    }
}
