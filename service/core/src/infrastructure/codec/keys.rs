// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Master secret loading and per-identity key derivation.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha512_256};

use crate::domain::identity::{IdentityKey, MasterSecret};

/// Length of generated master secrets.
pub const MASTER_SECRET_LEN: usize = 32;

const IDENTITY_SEPARATOR: &[u8] = b"::";

/// Where the active master secret came from. Logged at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    Passphrase,
    KeyFile(PathBuf),
    Generated,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passphrase => write!(f, "passphrase"),
            Self::KeyFile(path) => write!(f, "key file {}", path.display()),
            Self::Generated => write!(f, "generated (ephemeral)"),
        }
    }
}

/// `SHA-512/256(master || uid || "::" || role)`.
///
/// Deterministic; a change of role yields an unrelated key, so descriptors
/// minted for one role never verify under another.
pub fn derive_identity_key(master: &MasterSecret, uid: &str, role: &str) -> IdentityKey {
    let mut hasher = Sha512_256::new();
    hasher.update(master.as_bytes());
    hasher.update(uid.as_bytes());
    hasher.update(IDENTITY_SEPARATOR);
    hasher.update(role.as_bytes());
    IdentityKey::from_bytes(hasher.finalize().into())
}

/// Stretch an operator passphrase into master secret bytes.
pub fn secret_from_passphrase(passphrase: &str) -> Option<MasterSecret> {
    if passphrase.is_empty() {
        return None;
    }
    MasterSecret::from_bytes(Sha512_256::digest(passphrase.as_bytes()).to_vec())
}

pub fn generate_master_secret() -> MasterSecret {
    let mut bytes = [0u8; MASTER_SECRET_LEN];
    OsRng.fill_bytes(&mut bytes);
    MasterSecret::from(bytes)
}

/// Resolve the master secret: passphrase, then key file, then a fresh random
/// key that dies with the process.
pub fn load_master_secret(
    passphrase: Option<&str>,
    key_file: Option<&Path>,
) -> Result<(MasterSecret, SecretSource)> {
    if let Some(secret) = passphrase.and_then(secret_from_passphrase) {
        return Ok((secret, SecretSource::Passphrase));
    }

    if let Some(path) = key_file.filter(|p| p.exists()) {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read key file: {}", path.display()))?;
        let Some(secret) = MasterSecret::from_bytes(bytes) else {
            bail!("Key file is empty: {}", path.display());
        };
        return Ok((secret, SecretSource::KeyFile(path.to_path_buf())));
    }

    tracing::warn!(
        "No master secret configured; generated an ephemeral key. \
         Issued tokens will not survive a restart."
    );
    Ok((generate_master_secret(), SecretSource::Generated))
}

/// Write a fresh random key to `path`. Refuses to overwrite an existing file.
pub fn write_key_file(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Refusing to overwrite existing key file: {}", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let secret = generate_master_secret();
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to create key file: {}", path.display()))?;
    file.write_all(secret.as_bytes())
        .with_context(|| format!("Failed to write key file: {}", path.display()))?;
    Ok(())
}
