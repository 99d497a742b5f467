//! Session controller: owns the roster and message log, reacts to transport events and user
//! actions, issues transport commands.

use crate::identity::{LocalIdentity, PeerId};
use crate::log::{MessageLog, Origin};
use crate::protocol::{PeerState, Reliability, ServiceTag};
use crate::queue::{Event, UiCommand};
use crate::roster::{Roster, RosterChange};
use crate::transport::{PeerTransport, TransportEvent, UiSurface};
use crate::wire;

/// Title shown while nobody is connected.
pub const NO_PEERS_TITLE: &str = "No friends yet";

/// Title for a roster of `n` peers. Depends on nothing but the count.
pub fn peer_count_title(n: usize) -> String {
    match n {
        0 => NO_PEERS_TITLE.to_string(),
        1 => "1 friend".to_string(),
        n => format!("{} friends", n),
    }
}

/// Single-threaded session state. Every method is expected to run on the event queue consumer.
pub struct SessionController {
    identity: LocalIdentity,
    service_tag: ServiceTag,
    transport: Box<dyn PeerTransport>,
    surface: Box<dyn UiSurface>,
    roster: Roster,
    log: MessageLog,
}

impl SessionController {
    pub fn new(
        identity: LocalIdentity,
        service_tag: ServiceTag,
        transport: Box<dyn PeerTransport>,
        surface: Box<dyn UiSurface>,
    ) -> Self {
        Self {
            identity,
            service_tag,
            transport,
            surface,
            roster: Roster::new(),
            log: MessageLog::new(),
        }
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    pub fn service_tag(&self) -> &ServiceTag {
        &self.service_tag
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn messages(&self) -> &MessageLog {
        &self.log
    }

    /// Start advertising and publish the initial title.
    pub fn start(&mut self) {
        tracing::info!(
            peer_id = %self.identity.peer_id(),
            name = self.identity.display_name(),
            service = %self.service_tag,
            "starting session"
        );
        self.transport.advertise(&self.identity, &self.service_tag);
        self.publish_title();
    }

    /// Apply one queued event. Returns false for `Shutdown`.
    pub fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Transport(TransportEvent::PeerStateChanged(peer, state)) => {
                self.on_peer_state_changed(peer, state)
            }
            Event::Transport(TransportEvent::DataReceived(bytes, from)) => {
                self.on_data_received(&bytes, from);
            }
            Event::Transport(TransportEvent::InvitationReceived(peer)) => {
                self.on_invitation_received(peer)
            }
            Event::Transport(TransportEvent::AdvertisingFailed(reason)) => {
                self.on_advertising_failed(&reason)
            }
            Event::Ui(UiCommand::Send(text)) => {
                self.send_message(&text);
            }
            Event::Ui(UiCommand::Clear) => self.clear_messages(),
            Event::Ui(UiCommand::Browse) => self.browse(),
            Event::Ui(UiCommand::Shutdown) => return false,
        }
        true
    }

    /// Any nearby inviter is accepted.
    pub fn on_invitation_received(&mut self, peer: PeerId) {
        tracing::info!(%peer, "accepting invitation");
        self.transport.respond_to_invitation(&peer, true);
    }

    pub fn on_peer_state_changed(&mut self, peer: PeerId, state: PeerState) {
        match self.roster.apply(peer, state) {
            RosterChange::Joined => tracing::info!(%peer, "peer connected"),
            RosterChange::Left => tracing::info!(%peer, "peer disconnected"),
            RosterChange::Tracked => tracing::debug!(%peer, ?state, "peer state"),
            RosterChange::Ignored => {
                tracing::warn!(%peer, ?state, "ignoring peer state report")
            }
        }
        self.publish_title();
    }

    /// Append a local message and broadcast it to every connected peer. Blank input is a no-op.
    /// Returns whether the message was accepted.
    pub fn send_message(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.log.push(text.to_string(), Origin::Local);
        let payload = wire::encode_text(text);
        let peers = self.roster.connected().to_vec();
        tracing::debug!(bytes = payload.len(), peers = peers.len(), "sending message");
        if let Err(e) = self.transport.send(&payload, &peers, Reliability::Reliable) {
            tracing::debug!(error = %e, "send failed");
        }
        self.surface.messages_changed(&self.log);
        true
    }

    /// Append a remote message. Payloads that are not UTF-8 are dropped.
    /// Returns whether a message was appended.
    pub fn on_data_received(&mut self, bytes: &[u8], from: PeerId) -> bool {
        match wire::decode_text(bytes) {
            Ok(text) => {
                tracing::debug!(%from, bytes = bytes.len(), "received message");
                self.log.push(text, Origin::Remote(from));
                self.surface.messages_changed(&self.log);
                true
            }
            Err(e) => {
                tracing::warn!(%from, error = %e, "dropping payload");
                false
            }
        }
    }

    pub fn on_advertising_failed(&mut self, reason: &str) {
        tracing::warn!(reason, "advertising failed");
        self.surface.show_alert("Error", reason);
    }

    /// Empty the log. Roster and connections are untouched.
    pub fn clear_messages(&mut self) {
        self.log.clear();
        self.surface.messages_changed(&self.log);
    }

    pub fn browse(&mut self) {
        self.transport
            .browse_and_invite(&self.identity, &self.service_tag);
    }

    pub fn peer_count_summary(&self) -> String {
        peer_count_title(self.roster.len())
    }

    /// Leave the session. Called once when the UI goes away.
    pub fn teardown(&mut self) {
        tracing::info!(peers = self.roster.len(), "tearing down session");
        self.transport.disconnect();
    }

    fn publish_title(&mut self) {
        let title = self.peer_count_summary();
        self.surface.title_changed(&title);
    }
}
