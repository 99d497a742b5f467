//! In-process transport: endpoints attached to one hub see each other as nearby peers.
//! Used by tests and by hosts that simulate neighbours; no sockets, no discovery protocol.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::identity::{LocalIdentity, PeerId};
use crate::protocol::{PeerState, Reliability, ServiceTag};
use crate::queue::EventSender;
use crate::transport::{PeerTransport, TransportError, TransportEvent};

struct Endpoint {
    name: String,
    events: EventSender,
    advertising: Option<ServiceTag>,
    /// Inviters waiting for this endpoint's answer.
    invites: HashSet<PeerId>,
    sessions: HashSet<PeerId>,
}

#[derive(Default)]
struct HubState {
    endpoints: HashMap<PeerId, Endpoint>,
    advertising_unavailable: bool,
}

impl HubState {
    fn post(&self, to: &PeerId, event: TransportEvent) {
        if let Some(ep) = self.endpoints.get(to) {
            if !ep.events.transport(event) {
                tracing::debug!(peer = %to, "loopback endpoint queue closed");
            }
        }
    }

    fn connect(&mut self, a: PeerId, b: PeerId) {
        for (x, y) in [(a, b), (b, a)] {
            if let Some(ep) = self.endpoints.get_mut(&x) {
                ep.sessions.insert(y);
            }
            self.post(&x, TransportEvent::PeerStateChanged(y, PeerState::Connecting));
            self.post(&x, TransportEvent::PeerStateChanged(y, PeerState::Connected));
        }
    }

    /// Cancel every invitation `local` sent that has not been answered yet.
    fn withdraw_invites(&mut self, local: PeerId) {
        for ep in self.endpoints.values_mut() {
            ep.invites.remove(&local);
        }
    }

    fn drop_sessions(&mut self, local: PeerId) {
        let peers: Vec<PeerId> = match self.endpoints.get_mut(&local) {
            Some(ep) => ep.sessions.drain().collect(),
            None => return,
        };
        for peer in peers {
            if let Some(ep) = self.endpoints.get_mut(&peer) {
                ep.sessions.remove(&local);
            }
            self.post(&peer, TransportEvent::PeerStateChanged(local, PeerState::Disconnected));
            self.post(&local, TransportEvent::PeerStateChanged(peer, PeerState::Disconnected));
        }
    }
}

/// Shared fabric connecting loopback endpoints.
#[derive(Clone, Default)]
pub struct LoopbackHub {
    state: Arc<Mutex<HubState>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attach an endpoint for `identity`; its events are posted to `events`.
    pub fn attach(&self, identity: &LocalIdentity, events: EventSender) -> LoopbackTransport {
        self.lock().endpoints.insert(
            identity.peer_id(),
            Endpoint {
                name: identity.display_name().to_string(),
                events,
                advertising: None,
                invites: HashSet::new(),
                sessions: HashSet::new(),
            },
        );
        LoopbackTransport {
            hub: self.clone(),
            local: identity.peer_id(),
        }
    }

    /// Make every later `advertise` fail, as if the radio were off.
    pub fn set_advertising_unavailable(&self, unavailable: bool) {
        self.lock().advertising_unavailable = unavailable;
    }

    /// Display name of an attached endpoint.
    pub fn name_of(&self, peer: &PeerId) -> Option<String> {
        self.lock().endpoints.get(peer).map(|ep| ep.name.clone())
    }

    /// Endpoints currently advertising `tag`.
    pub fn advertisers(&self, tag: &ServiceTag) -> Vec<PeerId> {
        self.lock()
            .endpoints
            .iter()
            .filter(|(_, ep)| ep.advertising.as_ref() == Some(tag))
            .map(|(id, _)| *id)
            .collect()
    }
}

/// One endpoint's handle on the hub.
pub struct LoopbackTransport {
    hub: LoopbackHub,
    local: PeerId,
}

impl LoopbackTransport {
    /// Detach from the hub, dropping every session.
    pub fn detach(self) {
        let mut hub = self.hub.lock();
        hub.drop_sessions(self.local);
        hub.withdraw_invites(self.local);
        hub.endpoints.remove(&self.local);
    }
}

impl PeerTransport for LoopbackTransport {
    fn advertise(&mut self, _identity: &LocalIdentity, tag: &ServiceTag) {
        let mut hub = self.hub.lock();
        if hub.advertising_unavailable {
            hub.post(
                &self.local,
                TransportEvent::AdvertisingFailed("advertising is unavailable".to_string()),
            );
            return;
        }
        if let Some(ep) = hub.endpoints.get_mut(&self.local) {
            ep.advertising = Some(tag.clone());
        }
    }

    fn browse_and_invite(&mut self, _identity: &LocalIdentity, tag: &ServiceTag) {
        let mut hub = self.hub.lock();
        let in_session = match hub.endpoints.get(&self.local) {
            Some(ep) => ep.sessions.clone(),
            None => return,
        };
        let found: Vec<PeerId> = hub
            .endpoints
            .iter()
            .filter(|(id, ep)| {
                **id != self.local
                    && ep.advertising.as_ref() == Some(tag)
                    && !in_session.contains(*id)
            })
            .map(|(id, _)| *id)
            .collect();
        tracing::debug!(found = found.len(), service = %tag, "loopback browse");
        for peer in found {
            if let Some(ep) = hub.endpoints.get_mut(&peer) {
                ep.invites.insert(self.local);
            }
            hub.post(&peer, TransportEvent::InvitationReceived(self.local));
        }
    }

    fn send(
        &mut self,
        payload: &[u8],
        peers: &[PeerId],
        _reliability: Reliability,
    ) -> Result<(), TransportError> {
        let hub = self.hub.lock();
        let sessions = match hub.endpoints.get(&self.local) {
            Some(ep) => &ep.sessions,
            None => return Err(TransportError::Closed),
        };
        let mut result = Ok(());
        for peer in peers {
            if sessions.contains(peer) {
                hub.post(peer, TransportEvent::DataReceived(payload.to_vec(), self.local));
            } else if result.is_ok() {
                result = Err(TransportError::NotConnected(*peer));
            }
        }
        result
    }

    fn respond_to_invitation(&mut self, peer: &PeerId, accept: bool) {
        let mut hub = self.hub.lock();
        let invited = match hub.endpoints.get_mut(&self.local) {
            Some(ep) => ep.invites.remove(peer),
            None => false,
        };
        if !invited || !accept || !hub.endpoints.contains_key(peer) {
            return;
        }
        hub.connect(*peer, self.local);
    }

    fn disconnect(&mut self) {
        let mut hub = self.hub.lock();
        hub.drop_sessions(self.local);
        hub.withdraw_invites(self.local);
        if let Some(ep) = hub.endpoints.get_mut(&self.local) {
            ep.advertising = None;
            ep.invites.clear();
        }
    }
}
