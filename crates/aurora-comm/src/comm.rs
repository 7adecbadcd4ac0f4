//! Point-to-point communication interface.

use std::collections::VecDeque;

use indexmap::IndexMap;

use aurora_core::CommError;

/// A posted receive, completed by [`Communicator::wait_all`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecvHandle {
    /// Sending rank.
    pub src: usize,
    /// Message tag.
    pub tag: u32,
}

/// Non-blocking point-to-point messaging between ranks.
///
/// Sends are buffered and return immediately. Receives are posted with
/// [`irecv`](Communicator::irecv) and completed together by
/// [`wait_all`](Communicator::wait_all). Messages between one pair of
/// ranks with the same tag arrive in send order. There is no timeout:
/// `wait_all` returns only when every posted receive is satisfied or a
/// peer is gone.
pub trait Communicator: Send {
    /// This rank.
    fn rank(&self) -> usize;

    /// Number of ranks.
    fn size(&self) -> usize;

    /// Queue `payload` for `dest` under `tag`.
    fn isend(&mut self, dest: usize, tag: u32, payload: Vec<u8>) -> Result<(), CommError>;

    /// Post a receive from `src` under `tag`.
    fn irecv(&mut self, src: usize, tag: u32) -> Result<RecvHandle, CommError> {
        check_rank(src, self.size())?;
        Ok(RecvHandle { src, tag })
    }

    /// Block until every handle has a message; payloads in handle order.
    fn wait_all(&mut self, handles: &[RecvHandle]) -> Result<Vec<Vec<u8>>, CommError>;
}

pub(crate) fn check_rank(rank: usize, size: usize) -> Result<(), CommError> {
    if rank >= size {
        return Err(CommError::InvalidRank { rank, size });
    }
    Ok(())
}

/// Messages that arrived before anyone asked for them, keyed by
/// `(src, tag)` in arrival order.
#[derive(Debug, Default)]
pub(crate) struct Stash {
    queues: IndexMap<(usize, u32), VecDeque<Vec<u8>>>,
}

impl Stash {
    pub(crate) fn push(&mut self, src: usize, tag: u32, payload: Vec<u8>) {
        self.queues.entry((src, tag)).or_default().push_back(payload);
    }

    pub(crate) fn pop(&mut self, src: usize, tag: u32) -> Option<Vec<u8>> {
        self.queues.get_mut(&(src, tag)).and_then(VecDeque::pop_front)
    }

    pub(crate) fn pending(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}

/// Communicator for a single-rank run. Every message is to itself.
#[derive(Debug, Default)]
pub struct SelfComm {
    stash: Stash,
}

impl SelfComm {
    /// A fresh single-rank communicator.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Communicator for SelfComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn isend(&mut self, dest: usize, tag: u32, payload: Vec<u8>) -> Result<(), CommError> {
        check_rank(dest, 1)?;
        self.stash.push(0, tag, payload);
        Ok(())
    }

    fn wait_all(&mut self, handles: &[RecvHandle]) -> Result<Vec<Vec<u8>>, CommError> {
        handles
            .iter()
            .map(|h| self.stash.pop(h.src, h.tag).ok_or(CommError::Disconnected { peer: h.src }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_comm_round_trip() {
        let mut c = SelfComm::new();
        c.isend(0, 3, vec![1, 2]).unwrap();
        c.isend(0, 4, vec![9]).unwrap();
        let h4 = c.irecv(0, 4).unwrap();
        let h3 = c.irecv(0, 3).unwrap();
        assert_eq!(c.wait_all(&[h4, h3]).unwrap(), vec![vec![9], vec![1, 2]]);
        assert_eq!(c.stash.pending(), 0);
    }

    #[test]
    fn self_comm_rejects_other_ranks() {
        let mut c = SelfComm::new();
        assert_eq!(
            c.isend(1, 0, vec![]),
            Err(CommError::InvalidRank { rank: 1, size: 1 })
        );
        assert!(c.irecv(2, 0).is_err());
    }

    #[test]
    fn missing_self_message_is_an_error() {
        let mut c = SelfComm::new();
        let h = c.irecv(0, 0).unwrap();
        assert_eq!(c.wait_all(&[h]), Err(CommError::Disconnected { peer: 0 }));
    }
}
