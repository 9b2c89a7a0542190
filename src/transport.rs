//! Ranked, tag-based message transport.
//!
//! Every rank (coordinators, the isolated coordinator, the leader) runs as an OS
//! thread inside one process rather than a separate MPI process spread across hosts,
//! so the transport is a set of `crossbeam_channel` pairs rather than a network
//! socket: a job/result channel-pair idiom generalized from one master/N-worker pair
//! to any rank talking to any other rank.

use crate::messages::{C2L, L2C};
use crossbeam_channel::{unbounded, Receiver, RecvError, SendError, Sender};
use std::collections::HashMap;

/// A single rank's view of the control-message fabric: one channel pair per
/// (direction, tag) combination it actually uses.
pub struct RankLink {
    pub rank: usize,
    l2c_recv: Receiver<L2C>,
    c2l_send: Sender<(usize, C2L)>,
    /// Subproblem body bytes, keyed by the sending rank.
    body_recv: Receiver<(usize, Vec<u8>)>,
    body_senders: HashMap<usize, Sender<(usize, Vec<u8>)>>,
}

impl RankLink {
    pub fn send_to_leader(&self, msg: C2L) -> Result<(), SendError<(usize, C2L)>> {
        self.c2l_send.send((self.rank, msg))
    }

    pub fn try_recv_from_leader(&self) -> Option<L2C> {
        self.l2c_recv.try_recv().ok()
    }

    pub fn recv_from_leader(&self) -> Result<L2C, RecvError> {
        self.l2c_recv.recv()
    }

    /// Sends a subproblem body to another coordinator rank.
    pub fn send_body(&self, to: usize, bytes: Vec<u8>) -> Result<(), SendError<(usize, Vec<u8>)>> {
        match self.body_senders.get(&to) {
            Some(sender) => sender.send((self.rank, bytes)),
            None => Err(SendError((self.rank, bytes))),
        }
    }

    /// Blocks until a subproblem body arrives from any other coordinator.
    pub fn recv_body(&self) -> Result<(usize, Vec<u8>), RecvError> {
        self.body_recv.recv()
    }
}

/// The leader's view: a fan-in receiver for all coordinators' `C2L` messages, plus a
/// per-coordinator `L2C` sender.
pub struct LeaderLink {
    c2l_recv: Receiver<(usize, C2L)>,
    l2c_sends: HashMap<usize, Sender<L2C>>,
}

impl LeaderLink {
    pub fn send_to(&self, rank: usize, msg: L2C) -> Result<(), SendError<L2C>> {
        match self.l2c_sends.get(&rank) {
            Some(sender) => sender.send(msg),
            None => Err(SendError(msg)),
        }
    }

    /// Returns `(source_rank, message)` for the next available message, if any.
    pub fn try_recv(&self) -> Option<(usize, C2L)> {
        self.c2l_recv.try_recv().ok()
    }

    pub fn recv(&self) -> Result<(usize, C2L), RecvError> {
        self.c2l_recv.recv()
    }
}

/// Builds the full channel fabric for `num_coordinators` ranks (interactive +
/// isolated; the isolated coordinator is the last rank of this range) plus the
/// leader. Returns each coordinator's `RankLink` (indexed by rank) and the
/// `LeaderLink`.
pub fn build_channel_transport(num_coordinators: usize) -> (Vec<RankLink>, LeaderLink) {
    let (c2l_send, c2l_recv) = unbounded::<(usize, C2L)>();

    let mut l2c_sends = HashMap::new();
    let mut l2c_recvs = HashMap::new();
    for rank in 0..num_coordinators {
        let (s, r) = unbounded::<L2C>();
        l2c_sends.insert(rank, s);
        l2c_recvs.insert(rank, r);
    }

    // One body channel per ordered pair (src, dst) would be wasteful; instead each
    // rank owns a single inbound body channel and every peer holds a clone of the
    // sender, tagged with the sender's own rank on each message.
    let mut body_senders_per_rank: HashMap<usize, Sender<(usize, Vec<u8>)>> = HashMap::new();
    let mut body_recv_per_rank: HashMap<usize, Receiver<(usize, Vec<u8>)>> = HashMap::new();
    for rank in 0..num_coordinators {
        let (s, r) = unbounded::<(usize, Vec<u8>)>();
        body_senders_per_rank.insert(rank, s);
        body_recv_per_rank.insert(rank, r);
    }

    let mut links = Vec::with_capacity(num_coordinators);
    for rank in 0..num_coordinators {
        let body_recv = body_recv_per_rank.remove(&rank).expect("body recv for rank");
        let mut body_senders = body_senders_per_rank.clone();
        body_senders.remove(&rank);
        links.push(RankLink {
            rank,
            l2c_recv: l2c_recvs.remove(&rank).expect("l2c recv for rank"),
            c2l_send: c2l_send.clone(),
            body_recv,
            body_senders,
        });
    }

    let leader_link = LeaderLink {
        c2l_recv,
        l2c_sends,
    };

    (links, leader_link)
}
