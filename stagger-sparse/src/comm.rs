//! Communicator implementations.
//!
//! [`SelfCommunicator`] is the trivial single-rank group. [`ThreadCommunicator`] runs every rank
//! on its own OS thread inside one process and exchanges messages over channels, which makes it
//! possible to exercise multi-rank code paths without an MPI installation.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::trace;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::resume_unwind;
use std::thread;

pub use stagger_traits::comm::{CommError, Communicator};

/// The communicator of a single process that owns everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelfCommunicator;

impl Communicator for SelfCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_to_all<M>(&self, outgoing: Vec<Vec<M>>) -> Result<Vec<Vec<M>>, CommError>
    where
        M: Send + 'static,
    {
        if outgoing.len() != 1 {
            return Err(CommError::BufferCount {
                expected: 1,
                actual: outgoing.len(),
            });
        }
        Ok(outgoing)
    }
}

struct Envelope {
    epoch: u64,
    source: usize,
    payload: Box<dyn Any + Send>,
}

/// One rank of a group of ranks living on separate threads of the same process.
///
/// Every collective call advances a per-rank epoch counter. Since all ranks call the same
/// collectives in the same order, messages are matched by `(epoch, source)`; a message from a
/// rank that has already moved on to the next collective is parked until it is needed.
pub struct ThreadCommunicator {
    rank: usize,
    peers: Vec<Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    epoch: Cell<u64>,
    parked: RefCell<FxHashMap<(u64, usize), Box<dyn Any + Send>>>,
}

impl std::fmt::Debug for ThreadCommunicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadCommunicator")
            .field("rank", &self.rank)
            .field("size", &self.peers.len())
            .field("epoch", &self.epoch.get())
            .finish()
    }
}

impl ThreadCommunicator {
    /// Creates the communicators of a group of `size` ranks, ordered by rank.
    ///
    /// Each communicator must be moved to its own thread.
    pub fn group(size: usize) -> Vec<Self> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Self {
                rank,
                peers: senders.clone(),
                inbox,
                epoch: Cell::new(0),
                parked: RefCell::new(FxHashMap::default()),
            })
            .collect()
    }

    /// Runs `f` on `size` ranks, each on its own scoped thread, and returns the results ordered
    /// by rank.
    ///
    /// # Panics
    ///
    /// If any rank panics, the panic is propagated to the caller once all ranks have finished.
    /// A rank that panics inside a collective leaves the other ranks blocked, so `f` should
    /// prefer returning errors.
    pub fn run<F, R>(size: usize, f: F) -> Vec<R>
    where
        F: Fn(ThreadCommunicator) -> R + Sync,
        R: Send,
    {
        let f = &f;
        thread::scope(|scope| {
            let handles: Vec<_> = Self::group(size)
                .into_iter()
                .map(|comm| scope.spawn(move || f(comm)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|payload| resume_unwind(payload)))
                .collect()
        })
    }

    fn next_epoch(&self) -> u64 {
        let epoch = self.epoch.get() + 1;
        self.epoch.set(epoch);
        epoch
    }
}

fn unpack<M: 'static>(payload: Box<dyn Any + Send>, source_rank: usize) -> Result<Vec<M>, CommError> {
    payload
        .downcast::<Vec<M>>()
        .map(|buffer| *buffer)
        .map_err(|_| CommError::PayloadType { source_rank })
}

impl Communicator for ThreadCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn all_to_all<M>(&self, outgoing: Vec<Vec<M>>) -> Result<Vec<Vec<M>>, CommError>
    where
        M: Send + 'static,
    {
        let size = self.size();
        if outgoing.len() != size {
            return Err(CommError::BufferCount {
                expected: size,
                actual: outgoing.len(),
            });
        }

        let epoch = self.next_epoch();
        for (destination, buffer) in outgoing.into_iter().enumerate() {
            let envelope = Envelope {
                epoch,
                source: self.rank,
                payload: Box::new(buffer),
            };
            self.peers[destination]
                .send(envelope)
                .map_err(|_| CommError::Disconnected { rank: destination })?;
        }

        let mut incoming: Vec<Option<Vec<M>>> = (0..size).map(|_| None).collect();
        let mut received = 0;
        {
            let mut parked = self.parked.borrow_mut();
            for (source, slot) in incoming.iter_mut().enumerate() {
                if let Some(payload) = parked.remove(&(epoch, source)) {
                    *slot = Some(unpack(payload, source)?);
                    received += 1;
                }
            }
        }

        while received < size {
            let envelope = self
                .inbox
                .recv()
                .map_err(|_| CommError::Disconnected { rank: self.rank })?;
            if envelope.epoch == epoch {
                incoming[envelope.source] = Some(unpack(envelope.payload, envelope.source)?);
                received += 1;
            } else {
                trace!(
                    "rank {} parks message from rank {} for epoch {} while in epoch {}",
                    self.rank,
                    envelope.source,
                    envelope.epoch,
                    epoch
                );
                self.parked
                    .borrow_mut()
                    .insert((envelope.epoch, envelope.source), envelope.payload);
            }
        }

        incoming
            .into_iter()
            .enumerate()
            .map(|(source_rank, buffer)| buffer.ok_or(CommError::MissingContribution { source_rank }))
            .collect()
    }
}
