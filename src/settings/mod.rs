//! Connector settings.
//!
//! [`SettingsStore`] is the persisted, process-wide key-value store.
//! [`ConnectorSettings`] is a typed snapshot of the endpoint and ticket
//! defaults, and [`SettingsFacade`] is the stringly-typed get/update surface
//! used by scripting callers.

mod store;

pub use store::{SettingName, SettingsStore};

use std::sync::Arc;

use crate::config::Config;
use crate::error::ConnectorError;
use crate::models::TicketDefaults;
use crate::vault::{CredentialVault, FileScopeKeys, ProtectionScope, ScopeKeyProvider};

/// Typed snapshot of the non-credential settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorSettings {
    /// Base address of the OTRS web service.
    pub uri: String,
    /// Resource path of the ticket-create operation.
    pub resource: String,
    /// Agent login.
    pub user: String,
    /// Default customer user for new tickets.
    pub customer: String,
    /// Default queue for new tickets.
    pub queue: String,
}

impl ConnectorSettings {
    /// Reads the current values from `store`.
    pub fn from_store(store: &SettingsStore) -> Self {
        Self {
            uri: store.get(SettingName::Uri),
            resource: store.get(SettingName::Resource),
            user: store.get(SettingName::User),
            customer: store.get(SettingName::Customer),
            queue: store.get(SettingName::Queue),
        }
    }

    /// Defaults applied to every new ticket.
    pub fn ticket_defaults(&self) -> TicketDefaults {
        TicketDefaults::new(&self.customer, &self.queue)
    }
}

/// Get/update by setting name, with soft misses for unknown names.
///
/// Writes to `password` go through [`CredentialVault::rotate`]; `entropy`
/// can never be written, and neither can be read back.
#[derive(Clone)]
pub struct SettingsFacade {
    store: SettingsStore,
    scope: ProtectionScope,
    keys: Arc<dyn ScopeKeyProvider>,
}

impl SettingsFacade {
    /// Creates a facade over `store`, rotating passwords under `scope`.
    pub fn new(
        store: SettingsStore,
        scope: ProtectionScope,
        keys: Arc<dyn ScopeKeyProvider>,
    ) -> Self {
        Self { store, scope, keys }
    }

    /// Creates a facade using the scope and key directory from `config`.
    pub fn from_config(config: &Config, store: SettingsStore) -> Self {
        Self::new(
            store,
            config.protection_scope,
            Arc::new(FileScopeKeys::new(&config.key_dir)),
        )
    }

    /// The underlying store.
    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// Returns the value of `name`, or "" for unknown names and for the
    /// credential settings.
    pub fn get(&self, name: &str) -> String {
        match SettingName::parse(name) {
            Some(setting) => self.store.get(setting),
            None => {
                tracing::debug!(setting = %name, "Get on unknown setting");
                String::new()
            }
        }
    }

    /// Updates `name` to `value`.
    ///
    /// Returns `Ok(false)` without touching the store for unknown names and
    /// for `entropy`.
    ///
    /// # Errors
    ///
    /// Returns an error if a known setting cannot be persisted, or if the
    /// password cannot be encrypted.
    pub fn update(&self, name: &str, value: &str) -> Result<bool, ConnectorError> {
        match SettingName::parse(name) {
            Some(SettingName::Password) => {
                let mut vault =
                    CredentialVault::new(self.store.clone(), self.scope, self.keys.clone());
                vault.rotate(value)?;
                Ok(true)
            }
            Some(SettingName::Entropy) => {
                tracing::debug!("Refusing direct update of entropy");
                Ok(false)
            }
            Some(setting) => {
                self.store.set(setting, value)?;
                Ok(true)
            }
            None => {
                tracing::debug!(setting = %name, "Update on unknown setting");
                Ok(false)
            }
        }
    }

    /// Creates a vault over the same store and scope.
    pub fn vault(&self) -> CredentialVault {
        CredentialVault::new(self.store.clone(), self.scope, self.keys.clone())
    }
}

impl std::fmt::Debug for SettingsFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsFacade")
            .field("store", &self.store)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::MemoryScopeKeys;

    fn facade() -> SettingsFacade {
        SettingsFacade::new(
            SettingsStore::in_memory(),
            ProtectionScope::CurrentUser,
            Arc::new(MemoryScopeKeys::new()),
        )
    }

    #[test]
    fn test_get_unknown_is_empty() {
        let facade = facade();
        assert_eq!(facade.get("colour"), "");
    }

    #[test]
    fn test_update_unknown_is_soft_miss() {
        let facade = facade();
        facade.update("queue", "Raw").unwrap();

        assert!(!facade.update("colour", "blue").unwrap());
        assert_eq!(facade.get("colour"), "");
        assert_eq!(facade.get("queue"), "Raw");
    }

    #[test]
    fn test_update_known_setting() {
        let facade = facade();
        assert!(facade.update("uri", "https://otrs.example.com").unwrap());
        assert_eq!(facade.get("uri"), "https://otrs.example.com");
    }

    #[test]
    fn test_entropy_cannot_be_updated() {
        let facade = facade();
        facade.update("password", "hunter2").unwrap();
        let before = facade.store().credential_pair();

        assert!(!facade.update("entropy", "AAAA").unwrap());
        assert_eq!(facade.store().credential_pair(), before);
    }

    #[test]
    fn test_password_routes_through_vault() {
        let facade = facade();
        assert!(facade.update("password", "hunter2").unwrap());

        assert_eq!(facade.get("password"), "");
        assert_eq!(facade.get("entropy"), "");
        let (blob, entropy) = facade.store().credential_pair();
        assert!(!blob.is_empty());
        assert!(!entropy.is_empty());
        assert!(!blob.contains("hunter2"));

        let mut vault = facade.vault();
        vault.load().unwrap();
        assert_eq!(vault.password().unwrap(), "hunter2");
    }

    #[test]
    fn test_failed_password_update_keeps_previous_password() {
        let dir = tempfile::tempdir().unwrap();
        let settings_dir = dir.path().join("conf");
        let facade = SettingsFacade::new(
            SettingsStore::open(settings_dir.join("settings.json")).unwrap(),
            ProtectionScope::CurrentUser,
            Arc::new(MemoryScopeKeys::new()),
        );
        facade.update("password", "first").unwrap();
        let before = facade.store().credential_pair();

        std::fs::remove_dir_all(&settings_dir).unwrap();
        std::fs::write(&settings_dir, b"").unwrap();

        let err = facade.update("password", "second").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Settings);
        assert_eq!(facade.store().credential_pair(), before);

        let mut vault = facade.vault();
        vault.load().unwrap();
        assert_eq!(vault.password().unwrap(), "first");
    }

    #[test]
    fn test_connector_settings_snapshot() {
        let facade = facade();
        facade.update("customer", "oc").unwrap();
        facade.update("queue", "Online Classroom").unwrap();
        facade.update("user", "ticketbot").unwrap();

        let settings = ConnectorSettings::from_store(facade.store());
        assert_eq!(settings.user, "ticketbot");
        assert_eq!(
            settings.ticket_defaults(),
            TicketDefaults::new("oc", "Online Classroom")
        );
    }
}
