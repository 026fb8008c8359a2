//! Encrypted on-disk token cache
//!
//! Tokens are persisted one file per endpoint cache key, named by the SHA-256
//! of the key, surviving process restarts. Payloads are protected with
//! ChaCha20-Poly1305 envelope encryption: a per-cache-directory data key is
//! generated lazily on first use and stored in `keyset.json`, itself wrapped
//! by a fixed master key embedded in the binary. Each token payload is
//! encrypted under the data key with the endpoint's cache key as associated
//! data, binding the ciphertext to the endpoint it was issued for.
//!
//! Every read-side failure (missing file, corrupt ciphertext, wrong
//! associated data, stale token) is treated as a cache miss: the offending
//! file is removed and the token is re-issued. Nothing about why decryption
//! failed is surfaced.

use crate::endpoint::CodeArtifactEndpoint;
use crate::error::{FetchError, Result};
use crate::logging::Logger;
use crate::token::CodeArtifactToken;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chacha20poly1305::aead::{Aead, OsRng, Payload};
use chacha20poly1305::{AeadCore, ChaCha20Poly1305, Key, KeyInit, Nonce};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::path::{Path, PathBuf};

const KEYSET_FILE: &str = "keyset.json";
const NONCE_LEN: usize = 12;

// Fixed master key wrapping the per-directory data key at rest. Embedded by
// design: the cache protects tokens from casual disclosure, not from an
// attacker with access to this binary.
const MASTER_KEY: [u8; 32] = [
    0x8c, 0x42, 0xa1, 0x5e, 0x09, 0xd3, 0x77, 0xf0, 0x21, 0xb6, 0x4d, 0xee, 0x93, 0x0a, 0xc8, 0x35,
    0x6f, 0x18, 0xe2, 0x5b, 0xa4, 0x07, 0xd9, 0x8e, 0x50, 0xcb, 0x3c, 0x61, 0xf7, 0x2d, 0x94, 0x1a,
];

/// Serialized form of the wrapped data key
#[derive(Debug, Serialize, Deserialize)]
struct KeysetFile {
    nonce: String,
    ciphertext: String,
}

/// Encrypted persistent token store, one instance per cache directory.
#[derive(Debug, Clone)]
pub struct LocalCache {
    cache_dir: PathBuf,
    logger: Logger,
}

impl LocalCache {
    pub fn new(cache_dir: impl Into<PathBuf>, logger: Logger) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            logger,
        }
    }

    /// Load the cached token for `endpoint`, falling through to `issue` on
    /// any miss (absent, unreadable, undecryptable or expired entry). Freshly
    /// issued tokens are persisted before being returned.
    pub async fn load<F>(&self, endpoint: &CodeArtifactEndpoint, issue: F) -> Result<CodeArtifactToken>
    where
        F: Future<Output = Result<CodeArtifactToken>>,
    {
        let cache_file = self.cache_file(endpoint);
        let cache_key = endpoint.cache_key();

        match self.read_token(&cache_file, &cache_key) {
            Ok(token) if !token.expired() => {
                self.logger.debug(&format!(
                    "Retrieved CodeArtifact token from local cache for key {}",
                    cache_key
                ));
                return Ok(token);
            }
            Ok(token) => {
                self.logger.debug(&format!(
                    "Cached CodeArtifact token expired/stale; expiration: {}",
                    token.expiration
                ));
            }
            Err(err) => {
                self.logger.debug(&format!(
                    "Failed to read cached CodeArtifact token (removing from cache) {}: {}",
                    cache_file.display(),
                    err
                ));
            }
        }

        let _ = std::fs::remove_file(&cache_file);

        self.logger
            .info(&format!("Fetching CodeArtifact token for {}", cache_key));
        let token = issue.await?;
        self.logger.debug(&format!(
            "Fetched CodeArtifact token for {}; expires in {}m",
            cache_key,
            token.expires_in().num_minutes()
        ));
        self.store(&token)?;
        Ok(token)
    }

    /// Encrypt and persist a token, creating the cache directory as needed.
    pub fn store(&self, token: &CodeArtifactToken) -> Result<()> {
        let cache_file = self.cache_file(&token.endpoint);
        let cache_key = token.endpoint.cache_key();

        std::fs::create_dir_all(&self.cache_dir)?;
        let plaintext = serde_json::to_vec(token)?;
        let ciphertext = self.encrypt(&plaintext, cache_key.as_bytes())?;

        // Write-then-rename so a racing reader sees either the old or the new
        // complete file, never a partial one.
        let tmp_file = cache_file.with_extension(format!("tmp.{}", std::process::id()));
        std::fs::write(&tmp_file, &ciphertext)?;
        std::fs::rename(&tmp_file, &cache_file)?;
        Ok(())
    }

    fn read_token(&self, cache_file: &Path, cache_key: &str) -> Result<CodeArtifactToken> {
        let ciphertext = std::fs::read(cache_file)?;
        let plaintext = self.decrypt(&ciphertext, cache_key.as_bytes())?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    fn cache_file(&self, endpoint: &CodeArtifactEndpoint) -> PathBuf {
        let digest = Sha256::digest(endpoint.cache_key().as_bytes());
        self.cache_dir.join(format!("{}.cache", hex::encode(digest)))
    }

    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new(&self.data_key()?);
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|_| FetchError::Cache("encryption failed".to_string()))?;
        let mut out = nonce.to_vec();
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN {
            return Err(FetchError::Cache("ciphertext truncated".to_string()));
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(&self.data_key()?);
        cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: associated_data,
                },
            )
            .map_err(|_| FetchError::Cache("decryption failed".to_string()))
    }

    /// Read the per-directory data key, generating it on first use. A lost
    /// creation race falls back to reading the winner's keyset.
    fn data_key(&self) -> Result<Key> {
        let keyset_path = self.cache_dir.join(KEYSET_FILE);
        match self.read_keyset(&keyset_path) {
            Ok(key) => Ok(key),
            Err(_) if !keyset_path.exists() => {
                match self.generate_keyset(&keyset_path) {
                    Ok(key) => Ok(key),
                    Err(FetchError::Io(err))
                        if err.kind() == std::io::ErrorKind::AlreadyExists =>
                    {
                        self.read_keyset(&keyset_path)
                    }
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    fn read_keyset(&self, keyset_path: &Path) -> Result<Key> {
        let keyset: KeysetFile = serde_json::from_str(&std::fs::read_to_string(keyset_path)?)?;
        let nonce = BASE64
            .decode(&keyset.nonce)
            .map_err(|e| FetchError::Cache(format!("invalid keyset nonce: {}", e)))?;
        let sealed = BASE64
            .decode(&keyset.ciphertext)
            .map_err(|e| FetchError::Cache(format!("invalid keyset ciphertext: {}", e)))?;
        if nonce.len() != NONCE_LEN {
            return Err(FetchError::Cache("invalid keyset nonce length".to_string()));
        }
        let master = ChaCha20Poly1305::new(Key::from_slice(&MASTER_KEY));
        let key_bytes = master
            .decrypt(Nonce::from_slice(&nonce), sealed.as_slice())
            .map_err(|_| FetchError::Cache("keyset decryption failed".to_string()))?;
        if key_bytes.len() != 32 {
            return Err(FetchError::Cache("invalid keyset length".to_string()));
        }
        Ok(*Key::from_slice(&key_bytes))
    }

    fn generate_keyset(&self, keyset_path: &Path) -> Result<Key> {
        std::fs::create_dir_all(&self.cache_dir)?;
        let key = ChaCha20Poly1305::generate_key(&mut OsRng);
        let master = ChaCha20Poly1305::new(Key::from_slice(&MASTER_KEY));
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = master
            .encrypt(&nonce, key.as_slice())
            .map_err(|_| FetchError::Cache("keyset encryption failed".to_string()))?;
        let keyset = KeysetFile {
            nonce: BASE64.encode(nonce),
            ciphertext: BASE64.encode(sealed),
        };

        // create_new so a concurrent first use from another process cannot
        // truncate an already-written keyset.
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        let file = options.open(keyset_path)?;
        serde_json::to_writer(file, &keyset)?;
        Ok(key)
    }
}
