//! Simulated nearby devices on the loopback hub: they advertise, accept any invitation and
//! answer every message they hear.

use multipeer_core::{
    decode_text, encode_text, event_queue, Event, EventQueue, LocalIdentity, LoopbackHub,
    LoopbackTransport, PeerTransport, Reliability, ServiceTag, TransportEvent,
};

/// Spawn `count` neighbours advertising `tag`.
pub fn spawn(hub: &LoopbackHub, tag: &ServiceTag, count: usize) {
    for i in 1..=count {
        let identity = LocalIdentity::generate(format!("Neighbour {}", i));
        let (tx, queue) = event_queue();
        let mut transport = hub.attach(&identity, tx);
        transport.advertise(&identity, tag);
        tracing::debug!(peer = %identity.peer_id(), name = identity.display_name(), "neighbour up");
        tokio::spawn(run(identity, transport, queue));
    }
}

/// Reply a neighbour sends for `text`.
pub fn reply_to(name: &str, text: &str) -> String {
    format!("{} heard \"{}\"", name, text.trim())
}

async fn run(identity: LocalIdentity, mut transport: LoopbackTransport, mut queue: EventQueue) {
    while let Some(event) = queue.recv().await {
        match event {
            Event::Transport(TransportEvent::InvitationReceived(peer)) => {
                transport.respond_to_invitation(&peer, true);
            }
            Event::Transport(TransportEvent::DataReceived(bytes, from)) => {
                let text = match decode_text(&bytes) {
                    Ok(t) => t,
                    Err(_) => continue,
                };
                let reply = encode_text(&reply_to(identity.display_name(), &text));
                if let Err(e) = transport.send(&reply, &[from], Reliability::Reliable) {
                    tracing::debug!(error = %e, "neighbour reply failed");
                }
            }
            _ => {}
        }
    }
}
