//! Roster: per-peer connection state and the ordered set of connected peers.

use std::collections::HashMap;

use crate::identity::PeerId;
use crate::protocol::PeerState;

/// Effect of applying one state report to the roster.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RosterChange {
    /// Peer entered the connected set.
    Joined,
    /// Peer left the connected set.
    Left,
    /// Peer is being tracked or forgotten without touching the connected set.
    Tracked,
    /// Report was redundant or not a legal transition.
    Ignored,
}

/// Tracks every peer the transport has reported and which of them are connected.
///
/// Legal transitions are connecting -> connected -> disconnected and connecting -> disconnected.
/// Disconnected peers are forgotten, so a peer only returns through a fresh cycle.
#[derive(Debug, Default)]
pub struct Roster {
    states: HashMap<PeerId, PeerState>,
    connected: Vec<PeerId>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, peer: PeerId, state: PeerState) -> RosterChange {
        let current = self.states.get(&peer).copied();
        match (current, state) {
            (None, PeerState::Connecting) => {
                self.states.insert(peer, PeerState::Connecting);
                RosterChange::Tracked
            }
            // Transports may skip the connecting report; treat it as a fresh cycle.
            (None | Some(PeerState::Connecting), PeerState::Connected) => {
                self.states.insert(peer, PeerState::Connected);
                if !self.connected.contains(&peer) {
                    self.connected.push(peer);
                }
                RosterChange::Joined
            }
            (Some(PeerState::Connecting), PeerState::Disconnected) => {
                self.states.remove(&peer);
                RosterChange::Tracked
            }
            (Some(PeerState::Connected), PeerState::Disconnected) => {
                self.states.remove(&peer);
                self.connected.retain(|p| *p != peer);
                RosterChange::Left
            }
            _ => RosterChange::Ignored,
        }
    }

    pub fn state(&self, peer: &PeerId) -> Option<PeerState> {
        self.states.get(peer).copied()
    }

    /// Connected peers in the order they joined.
    pub fn connected(&self) -> &[PeerId] {
        &self.connected
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.connected.contains(peer)
    }

    pub fn len(&self) -> usize {
        self.connected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connected.is_empty()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_state() -> impl Strategy<Value = PeerState> {
        prop_oneof![
            Just(PeerState::Connecting),
            Just(PeerState::Connected),
            Just(PeerState::Disconnected),
        ]
    }

    proptest! {
        // Roster size tracks the connected peers for any report sequence, and every
        // change follows the legal transitions.
        #[test]
        fn prop_size_matches_connected_peers(
            script in prop::collection::vec((0..5usize, any_state()), 0..64),
        ) {
            let ps: Vec<PeerId> = (0..5).map(|_| PeerId::generate()).collect();
            let mut r = Roster::new();
            for (i, state) in script {
                let before = r.state(&ps[i]);
                let change = r.apply(ps[i], state);
                let after = r.state(&ps[i]);

                match change {
                    RosterChange::Joined => {
                        prop_assert!(matches!(before, None | Some(PeerState::Connecting)));
                        prop_assert_eq!(after, Some(PeerState::Connected));
                    }
                    RosterChange::Left => {
                        prop_assert_eq!(before, Some(PeerState::Connected));
                        prop_assert_eq!(after, None);
                    }
                    RosterChange::Tracked => {
                        prop_assert!(matches!(before, None | Some(PeerState::Connecting)));
                        prop_assert!(after != Some(PeerState::Connected));
                    }
                    RosterChange::Ignored => {
                        prop_assert_eq!(before, after);
                    }
                }
                // A disconnected peer is forgotten rather than parked in a terminal state.
                prop_assert!(after != Some(PeerState::Disconnected));

                let connected = ps
                    .iter()
                    .filter(|p| r.state(p) == Some(PeerState::Connected))
                    .count();
                prop_assert_eq!(r.len(), connected);
                let mut ids = r.connected().to_vec();
                ids.sort_by_key(|p| *p.as_bytes());
                ids.dedup();
                prop_assert_eq!(ids.len(), r.len());
            }
        }
    }
}
