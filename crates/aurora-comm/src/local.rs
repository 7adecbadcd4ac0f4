//! In-process communicator: one rank per thread, crossbeam channels.

use crossbeam_channel::{unbounded, Receiver, Sender};

use aurora_core::CommError;

use crate::comm::{check_rank, Communicator, RecvHandle, Stash};

#[derive(Debug)]
struct Envelope {
    src: usize,
    tag: u32,
    payload: Vec<u8>,
}

/// Factory for a set of connected [`LocalComm`]s.
#[derive(Debug)]
pub struct LocalUniverse;

impl LocalUniverse {
    /// Create `size` communicators, one per rank, fully connected.
    ///
    /// Move each into its rank's thread. A rank never holds a sender to
    /// itself, so once every other rank has dropped its communicator a
    /// blocked `wait_all` reports the peer as disconnected.
    pub fn create(size: usize) -> Vec<LocalComm> {
        let (txs, rxs): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded::<Envelope>()).unzip();
        rxs.into_iter()
            .enumerate()
            .map(|(rank, rx)| LocalComm {
                rank,
                size,
                peers: txs
                    .iter()
                    .enumerate()
                    .map(|(r, tx)| (r != rank).then(|| tx.clone()))
                    .collect(),
                rx,
                stash: Stash::default(),
            })
            .collect()
    }
}

/// One rank's endpoint in a [`LocalUniverse`].
#[derive(Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    /// Indexed by destination rank; `None` at this rank's own slot.
    peers: Vec<Option<Sender<Envelope>>>,
    rx: Receiver<Envelope>,
    stash: Stash,
}

impl LocalComm {
    /// Messages received but not yet claimed by a `wait_all`.
    pub fn pending(&self) -> usize {
        self.stash.pending()
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&mut self, dest: usize, tag: u32, payload: Vec<u8>) -> Result<(), CommError> {
        check_rank(dest, self.size)?;
        match &self.peers[dest] {
            None => {
                self.stash.push(self.rank, tag, payload);
                Ok(())
            }
            Some(tx) => tx
                .send(Envelope {
                    src: self.rank,
                    tag,
                    payload,
                })
                .map_err(|_| CommError::Disconnected { peer: dest }),
        }
    }

    fn wait_all(&mut self, handles: &[RecvHandle]) -> Result<Vec<Vec<u8>>, CommError> {
        let mut out = Vec::with_capacity(handles.len());
        for h in handles {
            let payload = loop {
                if let Some(p) = self.stash.pop(h.src, h.tag) {
                    break p;
                }
                if h.src == self.rank {
                    return Err(CommError::Disconnected { peer: h.src });
                }
                match self.rx.recv() {
                    Ok(env) => self.stash.push(env.src, env.tag, env.payload),
                    Err(_) => return Err(CommError::Disconnected { peer: h.src }),
                }
            };
            out.push(payload);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn two_ranks_exchange_out_of_order() {
        let mut comms = LocalUniverse::create(2);
        let mut c1 = comms.pop().unwrap();
        let mut c0 = comms.pop().unwrap();
        let t = thread::spawn(move || {
            c1.isend(0, 7, vec![7]).unwrap();
            c1.isend(0, 5, vec![5]).unwrap();
            let h = c1.irecv(0, 1).unwrap();
            c1.wait_all(&[h]).unwrap()
        });
        c0.isend(1, 1, vec![1, 1]).unwrap();
        let h5 = c0.irecv(1, 5).unwrap();
        let h7 = c0.irecv(1, 7).unwrap();
        assert_eq!(c0.wait_all(&[h5, h7]).unwrap(), vec![vec![5], vec![7]]);
        assert_eq!(t.join().unwrap(), vec![vec![1, 1]]);
        assert_eq!(c0.pending(), 0);
    }

    #[test]
    fn same_tag_preserves_order() {
        let mut comms = LocalUniverse::create(2);
        let mut c1 = comms.pop().unwrap();
        let mut c0 = comms.pop().unwrap();
        c1.isend(0, 2, vec![1]).unwrap();
        c1.isend(0, 2, vec![2]).unwrap();
        let h = c0.irecv(1, 2).unwrap();
        assert_eq!(c0.wait_all(&[h, h]).unwrap(), vec![vec![1], vec![2]]);
    }

    #[test]
    fn self_send_uses_stash() {
        let mut comms = LocalUniverse::create(1);
        let mut c = comms.pop().unwrap();
        c.isend(0, 9, vec![3]).unwrap();
        let h = c.irecv(0, 9).unwrap();
        assert_eq!(c.wait_all(&[h]).unwrap(), vec![vec![3]]);
    }

    #[test]
    fn dropped_peer_is_reported() {
        let mut comms = LocalUniverse::create(2);
        let c1 = comms.pop().unwrap();
        let mut c0 = comms.pop().unwrap();
        drop(c1);
        let h = c0.irecv(1, 0).unwrap();
        assert_eq!(c0.wait_all(&[h]), Err(CommError::Disconnected { peer: 1 }));
        assert_eq!(
            c0.isend(1, 0, vec![]),
            Err(CommError::Disconnected { peer: 1 })
        );
    }
}
