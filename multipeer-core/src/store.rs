//! Identity store: keeps one stable local identity per device name across launches.

use crate::identity::LocalIdentity;
use crate::settings::{SettingsStore, StoreError};

/// Settings key holding the device name the stored identity was created for.
pub const DISPLAY_NAME_KEY: &str = "Display Name";
/// Settings key holding the serialized identity.
pub const PEER_ID_KEY: &str = "Peer ID";

/// Stored identity could not be read back.
#[derive(Debug, thiserror::Error)]
pub enum IdentityLoadError {
    #[error("no stored identity")]
    Missing,
    #[error("stored identity is corrupt: {0}")]
    Decode(#[from] bincode::Error),
}

/// Owns the settings store the identity lives in.
pub struct IdentityStore<S> {
    settings: S,
}

impl<S: SettingsStore> IdentityStore<S> {
    pub fn new(settings: S) -> Self {
        Self { settings }
    }

    /// Return the stored identity if it was created for `device_name`, otherwise generate,
    /// persist and return a new one. A corrupt blob falls back to a fresh identity; only a
    /// failure to persist is an error.
    pub fn get_or_create_identity(&mut self, device_name: &str) -> Result<LocalIdentity, StoreError> {
        if self.settings.string(DISPLAY_NAME_KEY).as_deref() == Some(device_name) {
            match self.load_identity() {
                Ok(Some(identity)) if identity.display_name() == device_name => {
                    tracing::debug!(peer_id = %identity.peer_id(), "reusing stored identity");
                    return Ok(identity);
                }
                Ok(_) => {
                    tracing::warn!("stored identity does not match device name, generating a new one")
                }
                Err(e) => tracing::warn!(error = %e, "generating a new identity"),
            }
        }
        let identity = LocalIdentity::generate(device_name);
        let blob = identity.to_bytes()?;
        self.settings.set_string(DISPLAY_NAME_KEY, device_name)?;
        self.settings.set_data(PEER_ID_KEY, &blob)?;
        tracing::info!(peer_id = %identity.peer_id(), name = device_name, "created local identity");
        Ok(identity)
    }

    /// Read the stored identity, if any.
    pub fn load_identity(&self) -> Result<Option<LocalIdentity>, IdentityLoadError> {
        match self.settings.data(PEER_ID_KEY) {
            Some(blob) => Ok(Some(LocalIdentity::from_bytes(&blob)?)),
            None => Ok(None),
        }
    }

    /// Like `load_identity` but treats absence as an error.
    pub fn require_identity(&self) -> Result<LocalIdentity, IdentityLoadError> {
        self.load_identity()?.ok_or(IdentityLoadError::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{FileSettings, MemorySettings};

    #[test]
    fn same_device_name_keeps_identity() {
        let mut store = IdentityStore::new(MemorySettings::new());
        let first = store.get_or_create_identity("DeviceA").unwrap();
        let second = store.get_or_create_identity("DeviceA").unwrap();
        assert_eq!(first.peer_id(), second.peer_id());
    }

    #[test]
    fn renamed_device_gets_new_identity() {
        let mut store = IdentityStore::new(MemorySettings::new());
        let a = store.get_or_create_identity("DeviceA").unwrap();
        let b = store.get_or_create_identity("DeviceB").unwrap();
        assert_ne!(a.peer_id(), b.peer_id());
        assert_eq!(b.display_name(), "DeviceB");
        // Switching back does not resurrect the orphaned identity.
        let a2 = store.get_or_create_identity("DeviceA").unwrap();
        assert_ne!(a.peer_id(), a2.peer_id());
    }

    #[test]
    fn corrupt_blob_falls_back_and_is_replaced() {
        let mut settings = MemorySettings::new();
        settings.set_string(DISPLAY_NAME_KEY, "DeviceA").unwrap();
        settings.set_data(PEER_ID_KEY, &[0xde, 0xad]).unwrap();
        let mut store = IdentityStore::new(settings);
        assert!(matches!(
            store.load_identity(),
            Err(IdentityLoadError::Decode(_))
        ));

        let fresh = store.get_or_create_identity("DeviceA").unwrap();
        assert_eq!(store.require_identity().unwrap(), fresh);
        assert_eq!(
            store.get_or_create_identity("DeviceA").unwrap().peer_id(),
            fresh.peer_id()
        );
    }

    #[test]
    fn missing_blob_with_matching_name_creates_identity() {
        let mut settings = MemorySettings::new();
        settings.set_string(DISPLAY_NAME_KEY, "DeviceA").unwrap();
        let mut store = IdentityStore::new(settings);
        assert!(matches!(
            store.require_identity(),
            Err(IdentityLoadError::Missing)
        ));
        let id = store.get_or_create_identity("DeviceA").unwrap();
        assert_eq!(store.load_identity().unwrap(), Some(id));
    }

    #[test]
    fn identity_survives_relaunch_with_file_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let first = IdentityStore::new(FileSettings::open(&path))
            .get_or_create_identity("laptop")
            .unwrap();
        let second = IdentityStore::new(FileSettings::open(&path))
            .get_or_create_identity("laptop")
            .unwrap();
        assert_eq!(first.peer_id(), second.peer_id());
    }
}
