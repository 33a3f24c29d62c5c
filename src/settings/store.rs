//! Persisted named-string settings shared by every connector instance in
//! the process.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tempfile::NamedTempFile;

use crate::error::ConnectorError;

/// The settings the connector knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingName {
    /// Base address of the OTRS web service.
    Uri,
    /// Resource path of the ticket-create operation.
    Resource,
    /// Agent login used for authentication.
    User,
    /// Encrypted password blob (base64).
    Password,
    /// Entropy the password blob was encrypted with (base64).
    Entropy,
    /// Default customer user for new tickets.
    Customer,
    /// Default queue for new tickets.
    Queue,
}

impl SettingName {
    /// Every known setting.
    pub const ALL: [SettingName; 7] = [
        SettingName::Uri,
        SettingName::Resource,
        SettingName::User,
        SettingName::Password,
        SettingName::Entropy,
        SettingName::Customer,
        SettingName::Queue,
    ];

    /// Looks up a setting by its stored name. Names are case-sensitive.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// The stored name of this setting.
    pub fn as_str(self) -> &'static str {
        match self {
            SettingName::Uri => "uri",
            SettingName::Resource => "resource",
            SettingName::User => "user",
            SettingName::Password => "password",
            SettingName::Entropy => "entropy",
            SettingName::Customer => "customer",
            SettingName::Queue => "queue",
        }
    }

    /// True for the two settings owned by the credential vault.
    pub fn is_credential(self) -> bool {
        matches!(self, SettingName::Password | SettingName::Entropy)
    }
}

impl fmt::Display for SettingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to the process-wide settings store.
///
/// Cloning is cheap and every clone sees the same values. Each write
/// replaces the settings file atomically; concurrent writers are
/// last-write-wins.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    /// `None` for an in-memory store.
    path: Option<PathBuf>,
    values: RwLock<Entries>,
}

/// Everything read from the settings file.
#[derive(Debug, Default)]
struct Entries {
    known: BTreeMap<SettingName, String>,
    /// Names the connector does not use, written back unchanged.
    other: BTreeMap<String, String>,
}

impl SettingsStore {
    /// Opens the settings file at `path`.
    ///
    /// A missing file opens as an empty store; it is created on first write.
    /// Names in the file that the connector does not know are invisible to
    /// [`get`](Self::get) but kept when the file is rewritten.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Settings` if the file exists but cannot be
    /// read or is not a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConnectorError> {
        let path = path.into();

        let values = match std::fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Settings file not found, starting empty");
                Entries::default()
            }
            Err(e) => {
                return Err(ConnectorError::settings_io(
                    format!("cannot read {}", path.display()),
                    e,
                ))
            }
        };

        Ok(Self {
            inner: Arc::new(StoreInner {
                path: Some(path),
                values: RwLock::new(values),
            }),
        })
    }

    /// Creates a store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path: None,
                values: RwLock::new(Entries::default()),
            }),
        }
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Returns the value of a non-credential setting, or "" if unset.
    ///
    /// The credential settings always read as "".
    pub fn get(&self, name: SettingName) -> String {
        if name.is_credential() {
            return String::new();
        }
        self.read(name)
    }

    /// Sets a non-credential setting and persists the store.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Settings` for the credential settings, which
    /// only the vault may write, or if persisting fails.
    pub fn set(&self, name: SettingName, value: impl Into<String>) -> Result<(), ConnectorError> {
        if name.is_credential() {
            return Err(ConnectorError::settings(format!(
                "'{}' can only be changed through the credential vault",
                name
            )));
        }

        let mut values = self.inner.values.write();
        values.known.insert(name, value.into());
        self.persist(&values)?;

        tracing::debug!(setting = %name, "Setting updated");
        Ok(())
    }

    /// Returns the stored `(password, entropy)` pair.
    pub(crate) fn credential_pair(&self) -> (String, String) {
        let values = self.inner.values.read();
        let get = |name: SettingName| values.known.get(&name).cloned().unwrap_or_default();
        (get(SettingName::Password), get(SettingName::Entropy))
    }

    /// Replaces the `(password, entropy)` pair under a single lock and a
    /// single file write.
    ///
    /// If persisting fails the in-memory pair is restored, so readers never
    /// see a blob without its entropy.
    pub(crate) fn set_credential_pair(
        &self,
        password: String,
        entropy: String,
    ) -> Result<(), ConnectorError> {
        let mut values = self.inner.values.write();
        let previous = (
            values.known.insert(SettingName::Password, password),
            values.known.insert(SettingName::Entropy, entropy),
        );

        if let Err(e) = self.persist(&values) {
            for (name, old) in [
                (SettingName::Password, previous.0),
                (SettingName::Entropy, previous.1),
            ] {
                match old {
                    Some(old) => values.known.insert(name, old),
                    None => values.known.remove(&name),
                };
            }
            return Err(e);
        }

        Ok(())
    }

    fn read(&self, name: SettingName) -> String {
        self.inner
            .values
            .read()
            .known
            .get(&name)
            .cloned()
            .unwrap_or_default()
    }

    fn parse(text: &str) -> Result<Entries, ConnectorError> {
        let mut entries = Entries::default();
        if text.trim().is_empty() {
            return Ok(entries);
        }

        let raw: BTreeMap<String, String> = serde_json::from_str(text)
            .map_err(|e| ConnectorError::settings(format!("settings file is malformed: {}", e)))?;

        for (name, value) in raw {
            match SettingName::parse(&name) {
                Some(setting) => {
                    entries.known.insert(setting, value);
                }
                None => {
                    entries.other.insert(name, value);
                }
            }
        }
        Ok(entries)
    }

    /// Writes the whole map to a temporary file next to the target and
    /// renames it into place.
    fn persist(&self, values: &Entries) -> Result<(), ConnectorError> {
        let Some(path) = self.inner.path.as_deref() else {
            return Ok(());
        };

        let raw: BTreeMap<&str, &str> = values
            .other
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .chain(
                values
                    .known
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str())),
            )
            .collect();
        let json = serde_json::to_string_pretty(&raw)?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| {
            ConnectorError::settings_io(format!("cannot create {}", dir.display()), e)
        })?;

        let mut file = NamedTempFile::new_in(dir)
            .map_err(|e| ConnectorError::settings_io("cannot create temporary settings file", e))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| ConnectorError::settings_io("cannot write temporary settings file", e))?;
        file.persist(path).map_err(|e| {
            ConnectorError::settings_io(format!("cannot replace {}", path.display()), e.error)
        })?;

        Ok(())
    }
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}
