//! Datagram channel
//!
//! KOTH assumes an unreliable, fire-and-forget datagram transport. The
//! [`PacketSink`] / [`PacketSource`] traits are the seam to it;
//! [`LoopbackHub`] is an in-process implementation over crossbeam channels
//! with optional random loss, used by tests and the demo binary.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Connected peer handle
pub type PeerId = u32;

/// Transport errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Unknown peer {0}")]
    UnknownPeer(PeerId),
    #[error("Peer {0} disconnected")]
    Disconnected(PeerId),
}

/// Sending half of the datagram channel
pub trait PacketSink {
    /// Send one datagram to a single peer
    fn send_to(&mut self, peer: PeerId, data: &[u8]) -> Result<(), TransportError>;
    /// Send one datagram to every connected peer
    fn broadcast(&mut self, data: &[u8]);
}

/// Receiving half of the datagram channel
pub trait PacketSource {
    /// Next pending datagram, if any
    fn poll_recv(&mut self) -> Option<Vec<u8>>;
}

/// Destination of an outgoing datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Broadcast,
    Peer(PeerId),
}

/// Datagram produced by a session frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub target: Target,
    pub data: Vec<u8>,
}

impl Outgoing {
    pub fn broadcast(data: Vec<u8>) -> Self {
        Self {
            target: Target::Broadcast,
            data,
        }
    }

    pub fn to_peer(peer: PeerId, data: Vec<u8>) -> Self {
        Self {
            target: Target::Peer(peer),
            data,
        }
    }
}

/// Hand every outgoing datagram to the sink
///
/// Delivery failures are logged and dropped, there are no retries.
pub fn dispatch<S: PacketSink>(sink: &mut S, outgoing: &[Outgoing]) {
    for packet in outgoing {
        match packet.target {
            Target::Broadcast => sink.broadcast(&packet.data),
            Target::Peer(peer) => {
                if let Err(e) = sink.send_to(peer, &packet.data) {
                    debug!("Dropping datagram: {}", e);
                }
            }
        }
    }
}

/// Collect every datagram pending on a source
pub fn drain<S: PacketSource>(source: &mut S) -> Vec<Vec<u8>> {
    std::iter::from_fn(|| source.poll_recv()).collect()
}

/// In-process datagram hub
pub struct LoopbackHub {
    peers: HashMap<PeerId, Sender<Vec<u8>>>,
    next_peer: PeerId,
    capacity: usize,
    loss_rate: f64,
    rng: StdRng,
    sent: u64,
    dropped: u64,
}

impl LoopbackHub {
    /// Lossless hub; each peer queues up to `capacity` datagrams
    pub fn new(capacity: usize) -> Self {
        Self::with_loss(capacity, 0.0, 0)
    }

    /// Hub that drops each datagram with probability `loss_rate`
    pub fn with_loss(capacity: usize, loss_rate: f64, seed: u64) -> Self {
        let loss_rate = if loss_rate.is_finite() {
            loss_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            peers: HashMap::new(),
            next_peer: 1,
            capacity: capacity.max(1),
            loss_rate,
            rng: StdRng::seed_from_u64(seed),
            sent: 0,
            dropped: 0,
        }
    }

    /// Register a new peer and return its receiving end
    pub fn connect(&mut self) -> LoopbackClient {
        let peer = self.next_peer;
        self.next_peer += 1;
        let (sender, receiver) = bounded(self.capacity);
        self.peers.insert(peer, sender);
        LoopbackClient { peer, receiver }
    }

    pub fn disconnect(&mut self, peer: PeerId) {
        self.peers.remove(&peer);
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Datagrams delivered to a peer queue
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Datagrams lost to simulated loss or full queues
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn deliver(&mut self, peer: PeerId, data: &[u8]) -> Result<(), TransportError> {
        let sender = self.peers.get(&peer).ok_or(TransportError::UnknownPeer(peer))?;
        if self.loss_rate > 0.0 && self.rng.gen_bool(self.loss_rate) {
            self.dropped += 1;
            return Ok(());
        }
        match sender.try_send(data.to_vec()) {
            Ok(()) => {
                self.sent += 1;
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                self.peers.remove(&peer);
                Err(TransportError::Disconnected(peer))
            }
        }
    }
}

impl PacketSink for LoopbackHub {
    fn send_to(&mut self, peer: PeerId, data: &[u8]) -> Result<(), TransportError> {
        self.deliver(peer, data)
    }

    fn broadcast(&mut self, data: &[u8]) {
        let peers: Vec<PeerId> = self.peers.keys().copied().collect();
        for peer in peers {
            if let Err(e) = self.deliver(peer, data) {
                debug!("Broadcast: {}", e);
            }
        }
    }
}

/// Receiving end of a loopback peer
pub struct LoopbackClient {
    peer: PeerId,
    receiver: Receiver<Vec<u8>>,
}

impl LoopbackClient {
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

impl PacketSource for LoopbackClient {
    fn poll_recv(&mut self) -> Option<Vec<u8>> {
        self.receiver.try_recv().ok()
    }
}
