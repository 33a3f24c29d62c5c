//! Credential vault: at-rest protection of the connector password.
//!
//! The password is encrypted with ChaCha20-Poly1305 under a key derived from
//! a per-scope master secret and a fresh random entropy value. The encrypted
//! blob and the entropy are stored together in the settings store; the
//! master secret never leaves its scope.
//!
//! # Protection scopes
//!
//! A scope is either the current OS account on this machine or the whole
//! machine. Each scope identity owns its own master secret, so a blob copied
//! to another account or machine cannot be decrypted there. Encryption and decryption always use
//! the single scope the vault was constructed with.
//!
//! # States
//!
//! `Uninitialized` → `load()` → `Loaded`, and any state → `rotate()` →
//! `Rotated`. A failed `load()` returns the vault to `Uninitialized`.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::error::ConnectorError;
use crate::settings::SettingsStore;

/// Length of the random entropy generated on every rotation.
pub const ENTROPY_LEN: usize = 20;

/// Length of a scope master key.
pub const MASTER_KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_CONTEXT: &[u8] = b"otrs-connector/credential/v1";

/// A scope master secret, wiped on drop.
pub type MasterKey = Zeroizing<[u8; MASTER_KEY_LEN]>;

/// Boundary within which a stored password can be decrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtectionScope {
    /// Only the current OS account.
    #[default]
    CurrentUser,
    /// Any account on this machine.
    LocalMachine,
}

impl ProtectionScope {
    /// Short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            ProtectionScope::CurrentUser => "user",
            ProtectionScope::LocalMachine => "machine",
        }
    }
}

impl FromStr for ProtectionScope {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "currentuser" => Ok(ProtectionScope::CurrentUser),
            "machine" | "localmachine" => Ok(ProtectionScope::LocalMachine),
            other => Err(ConnectorError::invalid_config(format!(
                "unknown protection scope {:?} (expected 'user' or 'machine')",
                other
            ))),
        }
    }
}

impl fmt::Display for ProtectionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of per-scope master secrets.
pub trait ScopeKeyProvider: Send + Sync {
    /// Identity of the scope, bound into the derived key.
    fn scope_label(&self, scope: ProtectionScope) -> String;

    /// Returns the master key for `scope` if one exists.
    fn existing_key(&self, scope: ProtectionScope) -> Result<Option<MasterKey>, ConnectorError>;

    /// Returns the master key for `scope`, creating it if needed.
    fn get_or_create_key(&self, scope: ProtectionScope) -> Result<MasterKey, ConnectorError>;
}

/// Master keys kept as files in a key directory, one per scope identity.
///
/// The machine scope is identified by the machine ID. The account scope is
/// identified by the login name *and* the machine ID, so the same login on
/// another machine never resolves to the same key. Key files are written
/// owner-readable only and appear atomically: a reader never observes a
/// partially written key.
#[derive(Debug, Clone)]
pub struct FileScopeKeys {
    dir: PathBuf,
    user: String,
    machine: String,
}

/// What a key file on disk holds.
enum KeyFile {
    Missing,
    Corrupt,
    Valid(MasterKey),
}

impl FileScopeKeys {
    /// Creates a provider for the current account and machine.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_identities(dir, current_user(), machine_id())
    }

    /// Creates a provider with explicit account and machine identities.
    pub fn with_identities(
        dir: impl Into<PathBuf>,
        user: impl Into<String>,
        machine: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            user: file_safe(&user.into()),
            machine: file_safe(&machine.into()),
        }
    }

    fn key_path(&self, scope: ProtectionScope) -> PathBuf {
        self.dir.join(format!("{}.key", self.scope_label(scope)))
    }

    fn read_key(path: &Path) -> Result<KeyFile, ConnectorError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(KeyFile::Missing),
            Err(e) => {
                return Err(ConnectorError::decryption_failed(format!(
                    "cannot read scope key: {}",
                    e
                )))
            }
        };

        if bytes.len() != MASTER_KEY_LEN {
            return Ok(KeyFile::Corrupt);
        }

        let mut key = Zeroizing::new([0u8; MASTER_KEY_LEN]);
        key.copy_from_slice(&bytes);
        Ok(KeyFile::Valid(key))
    }

    /// Writes `key` to a temporary file in the key directory and moves it
    /// into place. With `replace` unset an existing file is left alone and
    /// `AlreadyExists` is returned.
    fn write_key(&self, path: &Path, key: &[u8], replace: bool) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let mut file = NamedTempFile::new_in(&self.dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(key)?;
        file.as_file().sync_all()?;

        let persisted = if replace {
            file.persist(path)
        } else {
            file.persist_noclobber(path)
        };
        persisted.map(|_| ()).map_err(|e| e.error)
    }
}

impl ScopeKeyProvider for FileScopeKeys {
    fn scope_label(&self, scope: ProtectionScope) -> String {
        match scope {
            ProtectionScope::CurrentUser => format!("user-{}@{}", self.user, self.machine),
            ProtectionScope::LocalMachine => format!("machine-{}", self.machine),
        }
    }

    fn existing_key(&self, scope: ProtectionScope) -> Result<Option<MasterKey>, ConnectorError> {
        match Self::read_key(&self.key_path(scope))? {
            KeyFile::Valid(key) => Ok(Some(key)),
            KeyFile::Missing => Ok(None),
            KeyFile::Corrupt => Err(ConnectorError::decryption_failed("scope key file is corrupt")),
        }
    }

    fn get_or_create_key(&self, scope: ProtectionScope) -> Result<MasterKey, ConnectorError> {
        let path = self.key_path(scope);
        let replace = match Self::read_key(&path)? {
            KeyFile::Valid(key) => return Ok(key),
            KeyFile::Missing => false,
            KeyFile::Corrupt => {
                // Nothing encrypted under a corrupt key can be recovered.
                tracing::warn!(scope = %scope, "Replacing corrupt scope key");
                true
            }
        };

        let mut key = Zeroizing::new([0u8; MASTER_KEY_LEN]);
        OsRng.fill_bytes(&mut key[..]);

        match self.write_key(&path, &key[..], replace) {
            Ok(()) => {
                tracing::info!(scope = %scope, "Created new scope key");
                Ok(key)
            }
            // Another instance created it first.
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                match Self::read_key(&path)? {
                    KeyFile::Valid(existing) => Ok(existing),
                    _ => Err(ConnectorError::EncryptionFailed(
                        "scope key created concurrently is unreadable".to_string(),
                    )),
                }
            }
            Err(e) => Err(ConnectorError::EncryptionFailed(format!(
                "cannot write scope key: {}",
                e
            ))),
        }
    }
}

/// Master keys held in memory only.
#[derive(Default)]
pub struct MemoryScopeKeys {
    keys: Mutex<HashMap<ProtectionScope, [u8; MASTER_KEY_LEN]>>,
}

impl fmt::Debug for MemoryScopeKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryScopeKeys").finish_non_exhaustive()
    }
}

impl MemoryScopeKeys {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScopeKeyProvider for MemoryScopeKeys {
    fn scope_label(&self, scope: ProtectionScope) -> String {
        format!("memory-{}", scope)
    }

    fn existing_key(&self, scope: ProtectionScope) -> Result<Option<MasterKey>, ConnectorError> {
        Ok(self.keys.lock().get(&scope).copied().map(Zeroizing::new))
    }

    fn get_or_create_key(&self, scope: ProtectionScope) -> Result<MasterKey, ConnectorError> {
        let mut keys = self.keys.lock();
        let key = keys.entry(scope).or_insert_with(|| {
            let mut key = [0u8; MASTER_KEY_LEN];
            OsRng.fill_bytes(&mut key);
            key
        });
        Ok(Zeroizing::new(*key))
    }
}

/// Lifecycle of a [`CredentialVault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// No password in memory.
    Uninitialized,
    /// Password decrypted from the store.
    Loaded,
    /// Password replaced by `rotate()` in this session.
    Rotated,
}

/// Owner of the stored password.
///
/// Only the vault reads or writes the `password` and `entropy` settings.
pub struct CredentialVault {
    store: SettingsStore,
    scope: ProtectionScope,
    keys: Arc<dyn ScopeKeyProvider>,
    state: VaultState,
    password: Option<Zeroizing<String>>,
}

impl CredentialVault {
    /// Creates an uninitialized vault over `store`.
    pub fn new(
        store: SettingsStore,
        scope: ProtectionScope,
        keys: Arc<dyn ScopeKeyProvider>,
    ) -> Self {
        Self {
            store,
            scope,
            keys,
            state: VaultState::Uninitialized,
            password: None,
        }
    }

    /// Creates a vault using the scope and key directory from `config`.
    pub fn from_config(config: &Config, store: SettingsStore) -> Self {
        Self::new(
            store,
            config.protection_scope,
            Arc::new(FileScopeKeys::new(&config.key_dir)),
        )
    }

    /// The scope used for both encryption and decryption.
    pub fn scope(&self) -> ProtectionScope {
        self.scope
    }

    /// Current lifecycle state.
    pub fn state(&self) -> VaultState {
        self.state
    }

    /// Decrypts the stored password into memory.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::DecryptionFailed` if the blob, the entropy or
    /// the scope key is missing, corrupt, or belongs to a different scope.
    pub fn load(&mut self) -> Result<(), ConnectorError> {
        self.state = VaultState::Uninitialized;
        self.password = None;

        let (blob, entropy) = self.store.credential_pair();
        if blob.is_empty() || entropy.is_empty() {
            return Err(ConnectorError::decryption_failed(
                "no stored password - set one with update_setting(\"password\", ..)",
            ));
        }

        let blob = STANDARD
            .decode(blob)
            .map_err(|_| ConnectorError::decryption_failed("stored password is not valid base64"))?;
        let entropy = STANDARD
            .decode(entropy)
            .map_err(|_| ConnectorError::decryption_failed("stored entropy is not valid base64"))?;

        let master = self.keys.existing_key(self.scope)?.ok_or_else(|| {
            ConnectorError::decryption_failed(format!(
                "no {} scope key - the password was saved under another account or machine",
                self.scope
            ))
        })?;

        let key = self.derive_key(&master, &entropy);
        let plaintext = decrypt(&key, &blob)?;
        let password = String::from_utf8(plaintext.to_vec())
            .map_err(|_| ConnectorError::decryption_failed("stored password is not UTF-8"))?;

        self.password = Some(Zeroizing::new(password));
        self.state = VaultState::Loaded;
        tracing::debug!(scope = %self.scope, "Credentials loaded");
        Ok(())
    }

    /// Encrypts `new_password` under fresh entropy and stores the blob and
    /// entropy as one pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope key cannot be obtained or the store
    /// cannot be persisted; the previously stored pair is then left intact.
    pub fn rotate(&mut self, new_password: &str) -> Result<(), ConnectorError> {
        let mut entropy = [0u8; ENTROPY_LEN];
        OsRng.fill_bytes(&mut entropy);

        let master = self.keys.get_or_create_key(self.scope)?;
        let key = self.derive_key(&master, &entropy);
        let blob = encrypt(&key, new_password.as_bytes())?;

        self.store
            .set_credential_pair(STANDARD.encode(blob), STANDARD.encode(entropy))?;

        self.password = Some(Zeroizing::new(new_password.to_string()));
        self.state = VaultState::Rotated;
        tracing::info!(scope = %self.scope, "Stored password rotated");
        Ok(())
    }

    /// The decrypted password.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::CredentialsNotLoaded` before a successful
    /// `load()` or `rotate()`.
    pub fn password(&self) -> Result<&str, ConnectorError> {
        self.password
            .as_deref()
            .map(String::as_str)
            .ok_or(ConnectorError::CredentialsNotLoaded)
    }

    fn derive_key(&self, master: &MasterKey, entropy: &[u8]) -> Zeroizing<[u8; 32]> {
        let label = self.keys.scope_label(self.scope);
        let mut hasher = Sha256::new();
        hasher.update(KEY_CONTEXT);
        hasher.update((label.len() as u32).to_be_bytes());
        hasher.update(label.as_bytes());
        hasher.update(&master[..]);
        hasher.update(entropy);
        Zeroizing::new(hasher.finalize().into())
    }
}

impl fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVault")
            .field("scope", &self.scope)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Returns `nonce || ciphertext || tag`.
fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, ConnectorError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| ConnectorError::EncryptionFailed("cipher rejected input".to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

fn decrypt(key: &[u8; 32], blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, ConnectorError> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(ConnectorError::decryption_failed("stored password is truncated"));
    }

    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| {
            ConnectorError::decryption_failed(
                "authentication failed - entropy, scope or ciphertext does not match",
            )
        })
}

fn current_user() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn machine_id() -> String {
    ["/etc/machine-id", "/var/lib/dbus/machine-id"]
        .iter()
        .find_map(|path| {
            std::fs::read_to_string(path)
                .ok()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
        })
        .or_else(|| {
            ["HOSTNAME", "COMPUTERNAME"]
                .iter()
                .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
        })
        .unwrap_or_else(|| "localhost".to_string())
}

fn file_safe(identity: &str) -> String {
    identity
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
