//! Local and remote peer identity: opaque peer tokens and the device's own identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque peer token (16 bytes, random). Stable for as long as the owning identity is kept.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PeerId(#[serde(with = "bytes_16")] [u8; 16]);

mod bytes_16 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    pub fn serialize<S: Serializer>(v: &[u8; 16], serializer: S) -> Result<S::Ok, S::Error> {
        v.as_slice().serialize(serializer)
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 16], D::Error> {
        let buf: Vec<u8> = Deserialize::deserialize(d)?;
        buf.try_into()
            .map_err(|_| serde::de::Error::custom("expected 16 bytes"))
    }
}

impl PeerId {
    /// Fresh random token.
    pub fn generate() -> Self {
        PeerId(uuid::Uuid::new_v4().into_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Create a `PeerId` from raw bytes (e.g. handed over by a host transport).
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        PeerId(bytes)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_bytes(self.0).hyphenated())
    }
}

/// This device's identity as seen by nearby peers.
///
/// Bound to a display name: when the device name changes a new identity is generated
/// and the old one is simply forgotten.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LocalIdentity {
    display_name: String,
    peer_id: PeerId,
}

impl LocalIdentity {
    /// Generate a new identity with a random peer token.
    pub fn generate(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            peer_id: PeerId::generate(),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Serialized form stored in the settings store (bincode).
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_differ() {
        assert_ne!(PeerId::generate(), PeerId::generate());
    }

    #[test]
    fn identity_bytes_restore_same_peer_id() {
        let id = LocalIdentity::generate("Stu's iPhone");
        let bytes = id.to_bytes().unwrap();
        let restored = LocalIdentity::from_bytes(&bytes).unwrap();
        assert_eq!(restored, id);
        assert_eq!(restored.display_name(), "Stu's iPhone");
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let bytes = LocalIdentity::generate("device").to_bytes().unwrap();
        assert!(LocalIdentity::from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn peer_id_displays_as_uuid() {
        let id = PeerId::from_bytes([0xab; 16]);
        assert_eq!(id.to_string(), "abababab-abab-abab-abab-abababababab");
    }
}
