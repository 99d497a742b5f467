//! Seams to the collaborators the session does not own: the peer transport and the UI surface.

use crate::identity::{LocalIdentity, PeerId};
use crate::log::MessageLog;
use crate::protocol::{PeerState, Reliability, ServiceTag};

/// Discovery, connection management and delivery between nearby peers.
///
/// Implementations report asynchronous outcomes as [`TransportEvent`]s through the session's
/// event queue rather than calling back into the controller.
pub trait PeerTransport: Send {
    /// Announce this peer under `tag`. Failure arrives later as `AdvertisingFailed`.
    fn advertise(&mut self, identity: &LocalIdentity, tag: &ServiceTag);

    /// Start the browse-and-invite flow for peers advertising `tag`.
    fn browse_and_invite(&mut self, identity: &LocalIdentity, tag: &ServiceTag);

    /// Deliver one payload to each of `peers`.
    fn send(
        &mut self,
        payload: &[u8],
        peers: &[PeerId],
        reliability: Reliability,
    ) -> Result<(), TransportError>;

    /// Answer an invitation reported by `InvitationReceived`.
    fn respond_to_invitation(&mut self, peer: &PeerId, accept: bool);

    /// Leave the session, dropping every connection.
    fn disconnect(&mut self);
}

/// Something the transport observed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TransportEvent {
    PeerStateChanged(PeerId, PeerState),
    DataReceived(Vec<u8>, PeerId),
    InvitationReceived(PeerId),
    AdvertisingFailed(String),
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("peer {0} is not connected")]
    NotConnected(PeerId),
    #[error("transport is closed")]
    Closed,
}

/// Renders session state. Called only from the event queue consumer.
pub trait UiSurface: Send {
    fn messages_changed(&mut self, log: &MessageLog);
    fn title_changed(&mut self, title: &str);
    fn show_alert(&mut self, title: &str, message: &str);
}
