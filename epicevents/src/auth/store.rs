//! Encrypted at-rest storage for the session credential.
//!
//! The credential is AES-256-GCM encrypted (random 96-bit nonce prepended,
//! base64 encoded) and written to a fixed path under `~/.epicevents`, next to
//! a separately stored symmetric key. Both files are owner-only; both are
//! required to recover the session. There is at most one stored session:
//! `save` overwrites.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose};
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::errors::{Error, Result};

const BLOB_FILE: &str = "session";
const KEY_FILE: &str = "session.key";

/// Store for the persisted, encrypted session credential.
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Store rooted at the fixed per-user location, `~/.epicevents`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| Error::Internal {
            operation: "locate the home directory for the session store".to_string(),
        })?;

        Ok(Self::at(home.join(".epicevents")))
    }

    /// Store rooted at an explicit directory (tests)
    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn blob_path(&self) -> PathBuf {
        self.dir.join(BLOB_FILE)
    }

    fn key_path(&self) -> PathBuf {
        self.dir.join(KEY_FILE)
    }

    /// Encrypt and persist a credential, replacing any prior session.
    pub fn save(&self, raw: &str) -> Result<()> {
        create_private_dir(&self.dir).map_err(|e| Error::Internal {
            operation: format!("create the session directory {}: {e}", self.dir.display()),
        })?;

        let key = self.load_or_create_key()?;
        let cipher = Aes256Gcm::new(&key);

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher.encrypt(&nonce, raw.as_bytes()).map_err(|e| Error::Internal {
            operation: format!("encrypt the session credential: {e}"),
        })?;

        let mut blob = nonce.to_vec();
        blob.extend_from_slice(&ciphertext);
        let encoded = general_purpose::STANDARD.encode(blob);

        write_private(&self.blob_path(), encoded.as_bytes()).map_err(|e| Error::Internal {
            operation: format!("write the session file: {e}"),
        })
    }

    /// Load and decrypt the stored credential.
    ///
    /// Returns `None` when no session is stored. Decryption failures
    /// (corrupted blob, missing or mismatched key) also return `None` after
    /// logging a diagnostic: the user re-logs in, the process continues.
    pub fn load(&self) -> Option<String> {
        let encoded = match fs::read_to_string(self.blob_path()) {
            Ok(encoded) => encoded,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Stored session is unreadable: {e}");
                return None;
            }
        };

        let key = match self.load_key() {
            Ok(Some(key)) => key,
            Ok(None) => {
                warn!("A session file exists but its key file is missing; please log in again");
                return None;
            }
            Err(e) => {
                warn!("Session key file is unreadable: {e}");
                return None;
            }
        };

        match decrypt(&key, encoded.trim()) {
            Ok(raw) => Some(raw),
            Err(e) => {
                warn!("Stored session cannot be decrypted ({e}); please log in again");
                None
            }
        }
    }

    /// Remove the stored credential. Returns `false` when there was nothing
    /// to delete; calling it twice is fine. The key file is kept for the
    /// next session.
    pub fn delete(&self) -> bool {
        match fs::remove_file(self.blob_path()) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                warn!("Could not delete the stored session: {e}");
                false
            }
        }
    }

    /// Read the key file, or generate one on first use.
    ///
    /// An existing key is never overwritten: regenerating it would silently
    /// orphan any blob encrypted under it.
    fn load_or_create_key(&self) -> Result<Key<Aes256Gcm>> {
        if let Some(key) = self.load_key().map_err(|e| Error::Internal {
            operation: format!("read the session key file: {e}"),
        })? {
            return Ok(key);
        }

        let key = Aes256Gcm::generate_key(&mut OsRng);
        write_private(&self.key_path(), key.as_slice()).map_err(|e| Error::Internal {
            operation: format!("write the session key file: {e}"),
        })?;

        Ok(key)
    }

    fn load_key(&self) -> io::Result<Option<Key<Aes256Gcm>>> {
        let bytes = match fs::read(self.key_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        if bytes.len() != 32 {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("session key must be 32 bytes, found {}", bytes.len()),
            ));
        }

        Ok(Some(*Key::<Aes256Gcm>::from_slice(&bytes)))
    }
}

fn decrypt(key: &Key<Aes256Gcm>, encoded: &str) -> std::result::Result<String, String> {
    let blob = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| format!("invalid base64: {e}"))?;

    if blob.len() < 12 {
        return Err("blob too short to hold a nonce".to_string());
    }

    let (nonce_bytes, ciphertext) = blob.split_at(12);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new(key);
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| "decryption failed (wrong key or corrupted data)".to_string())?;

    String::from_utf8(plaintext).map_err(|e| format!("decrypted content is not UTF-8: {e}"))
}

fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}

/// Write a file readable by the owner only (0600).
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(bytes)
}
