// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Encrypted Credential Store
//!
//! Every secret the CLI persists (pending link requests with their private keys,
//! linked wallet sessions, the builder access key) lives here as an encrypted JSON
//! document.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   .encryption-key        32 random bytes, 0600 (absent when a passphrase is used)
//!   .kdf-salt              16 random bytes, 0600 (passphrase mode only)
//!   requests/<id>.json
//!   wallets/<name>.json
//!   builder/<name>.json
//! ```
//!
//! Writes go to a temporary sibling and are renamed into place, so an interrupted
//! write never leaves a half-written document behind.

use crate::crypto::{decrypt_aes_gcm, derive_key_from_passphrase, encrypt_aes_gcm};
use crate::error::{AgentWalletError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::{rngs::OsRng, RngCore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

const KEY_FILE: &str = ".encryption-key";
const SALT_FILE: &str = ".kdf-salt";
const DOCUMENT_VERSION: u32 = 1;
const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Requests,
    Wallets,
    Builder,
}

impl RecordKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            RecordKind::Requests => "requests",
            RecordKind::Wallets => "wallets",
            RecordKind::Builder => "builder",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// On-disk envelope around an encrypted record
#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    version: u32,
    kind: String,
    name: String,
    /// base64(nonce | ciphertext+tag)
    payload: String,
}

/// Names become file names, so only a conservative character set is allowed
pub fn validate_record_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(AgentWalletError::usage(format!(
            "name must be 1-{} characters, got {}",
            MAX_NAME_LEN,
            name.len()
        )));
    }
    if name.starts_with('.') {
        return Err(AgentWalletError::usage("name must not start with '.'"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(AgentWalletError::usage(format!(
            "name '{}' contains unsupported character '{}'; use letters, digits, '-', '_' or '.'",
            name, bad
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct CredentialStore {
    root: PathBuf,
    key: [u8; 32],
}

impl CredentialStore {
    /// Open (creating if needed) the store at `root`
    ///
    /// Without a passphrase the store key is read from, or generated into, the
    /// owner-only key file. With a passphrase the key is derived from it and a
    /// per-store salt.
    pub fn open(root: impl Into<PathBuf>, passphrase: Option<&str>) -> Result<Self> {
        let root = root.into();
        ensure_private_dir(&root)?;

        let key = match passphrase {
            Some(passphrase) => {
                let salt = read_or_create_secret::<16>(&root.join(SALT_FILE))?;
                debug!("🔐 Store key derived from operator passphrase");
                derive_key_from_passphrase(passphrase, &salt)
            }
            None => read_or_create_secret::<32>(&root.join(KEY_FILE))?,
        };

        Ok(Self { root, key })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_dir(&self, kind: RecordKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    fn document_path(&self, kind: RecordKind, name: &str) -> PathBuf {
        self.kind_dir(kind).join(format!("{}.json", name))
    }

    fn aad(kind: RecordKind, name: &str) -> Vec<u8> {
        format!("{}/{}", kind.dir_name(), name).into_bytes()
    }

    /// Replace the whole document for `kind/name`
    pub fn save<T: Serialize>(&self, kind: RecordKind, name: &str, record: &T) -> Result<()> {
        validate_record_name(name)?;
        let plaintext = serde_json::to_vec(record).map_err(AgentWalletError::storage)?;
        let encrypted = encrypt_aes_gcm(&plaintext, &self.key, &Self::aad(kind, name))
            .map_err(AgentWalletError::storage)?;

        let document = StoredDocument {
            version: DOCUMENT_VERSION,
            kind: kind.dir_name().to_string(),
            name: name.to_string(),
            payload: STANDARD.encode(encrypted),
        };
        let bytes = serde_json::to_vec_pretty(&document).map_err(AgentWalletError::storage)?;

        let dir = self.kind_dir(kind);
        ensure_private_dir(&dir)?;
        write_private_atomic(&self.document_path(kind, name), &bytes)?;
        debug!("💾 Saved {}/{}", kind, name);
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self, kind: RecordKind, name: &str) -> Result<Option<T>> {
        validate_record_name(name)?;
        let path = self.document_path(kind, name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let document: StoredDocument = serde_json::from_slice(&bytes).map_err(|e| {
            AgentWalletError::Storage(format!("corrupt document {}: {}", path.display(), e))
        })?;
        if document.version != DOCUMENT_VERSION {
            return Err(AgentWalletError::Storage(format!(
                "unsupported document version {} in {}",
                document.version,
                path.display()
            )));
        }

        let encrypted = STANDARD.decode(&document.payload).map_err(|e| {
            AgentWalletError::Storage(format!("corrupt payload in {}: {}", path.display(), e))
        })?;
        let plaintext = decrypt_aes_gcm(&encrypted, &self.key, &Self::aad(kind, name))
            .map_err(|_| {
                AgentWalletError::Storage(format!(
                    "{} could not be decrypted with the current store key",
                    path.display()
                ))
            })?;

        let record = serde_json::from_slice(&plaintext).map_err(|e| {
            AgentWalletError::Storage(format!("unexpected record shape in {}: {}", path.display(), e))
        })?;
        Ok(Some(record))
    }

    /// Names stored under `kind`, sorted
    pub fn list(&self, kind: RecordKind) -> Result<Vec<String>> {
        let dir = self.kind_dir(kind);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove `kind/name`; returns whether a document existed
    pub fn delete(&self, kind: RecordKind, name: &str) -> Result<bool> {
        validate_record_name(name)?;
        match fs::remove_file(self.document_path(kind, name)) {
            Ok(()) => {
                info!("🗑️  Deleted {}/{}", kind, name);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

fn ensure_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

fn open_private(path: &Path, create_new: bool) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

fn write_private_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4().simple()));
    let written = (|| -> std::io::Result<()> {
        let mut file = open_private(&tmp, true)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Read an N-byte secret file, generating it with owner-only permissions first if
/// it does not exist yet
fn read_or_create_secret<const N: usize>(path: &Path) -> Result<[u8; N]> {
    match open_private(path, true) {
        Ok(mut file) => {
            let mut secret = [0u8; N];
            OsRng.fill_bytes(&mut secret);
            file.write_all(&secret)?;
            file.sync_all()?;
            info!("🔑 Generated new store secret at {}", path.display());
            Ok(secret)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let bytes = fs::read(path)?;
            if bytes.len() != N {
                return Err(AgentWalletError::Storage(format!(
                    "{} has wrong length: expected {} bytes, got {}",
                    path.display(),
                    N,
                    bytes.len()
                )));
            }
            let mut secret = [0u8; N];
            secret.copy_from_slice(&bytes);
            Ok(secret)
        }
        Err(e) => Err(e.into()),
    }
}
