//! Multipeer chat session core.
//! Host-driven: no I/O of its own; the host supplies a peer transport and a UI surface, posts
//! their callbacks to the event queue, and the session controller applies them in order.

pub mod identity;
pub mod protocol;
pub mod wire;

pub use identity::{LocalIdentity, PeerId};
pub use protocol::{PeerState, Reliability, ServiceTag, ServiceTagError, DEFAULT_SERVICE_TAG};
pub use wire::{decode_text, encode_text, DecodeError};

pub mod settings;
pub mod store;

pub use settings::{FileSettings, MemorySettings, SettingsStore, StoreError};
pub use store::{IdentityLoadError, IdentityStore};

pub mod log;
pub mod roster;
pub mod transport;

pub use log::{Message, MessageLog, Origin};
pub use roster::{Roster, RosterChange};
pub use transport::{PeerTransport, TransportError, TransportEvent, UiSurface};

pub mod queue;
pub mod session;

pub use queue::{event_queue, Event, EventQueue, EventSender, UiCommand};
pub use session::{peer_count_title, SessionController};

pub mod ffi;
pub mod loopback;

pub use loopback::{LoopbackHub, LoopbackTransport};
