use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use rusqlite::{Connection, OptionalExtension, params};
use sha2::Sha256;
use tracing::info;

pub const MIGRATION_0001: &str = include_str!("../migrations/0001_init.sql");

const DEFAULT_KEY_BITS: usize = 4096;

/// Errors surfaced by the credential vault. Nothing is recovered locally;
/// callers see the failure unchanged.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("credential store error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("no credential stored for service `{0}`")]
    NotFound(String),
    #[error("stored credential for `{service}` cannot be decrypted: {reason}")]
    Decryption { service: String, reason: String },
    #[error("key error: {0}")]
    Key(String),
    #[error("encryption error: {0}")]
    Encryption(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, VaultError>;

/// Filesystem layout of the vault.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// PEM-encoded PKCS8 private key, created on first use.
    pub key_path: PathBuf,
    /// Single-file sqlite credential store.
    pub store_path: PathBuf,
    /// RSA modulus size for freshly generated keys.
    pub key_bits: usize,
}

impl VaultConfig {
    pub fn new(key_path: impl Into<PathBuf>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
            store_path: store_path.into(),
            key_bits: DEFAULT_KEY_BITS,
        }
    }

    /// Conventional layout inside a config directory:
    /// `connector.pem` and `passwords_db.sqlite3`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join("connector.pem"), dir.join("passwords_db.sqlite3"))
    }

    pub fn with_key_bits(mut self, key_bits: usize) -> Self {
        self.key_bits = key_bits;
        self
    }
}

/// Stores per-service credentials encrypted with a local RSA keypair.
///
/// Only the public key (derived from the private key on demand) ever
/// encrypts; the private key stays in `key_path`. OAEP padding makes
/// ciphertexts non-deterministic, so equality of stored values is never
/// meaningful.
pub struct Vault {
    config: VaultConfig,
}

impl Vault {
    pub fn new(config: VaultConfig) -> Self {
        Self { config }
    }

    /// One-time setup: generates the keypair and creates the store if either
    /// is missing. Safe to call concurrently; a process losing the key-file
    /// creation race uses the winner's key.
    pub fn ensure_initialized(&self) -> Result<()> {
        self.ensure_key()?;
        let conn = self.open_store()?;
        conn.execute_batch(MIGRATION_0001)?;
        Ok(())
    }

    /// Encrypts `plaintext` for `service` and upserts it, returning the row id.
    pub fn set_password(&self, service: &str, plaintext: &str) -> Result<i64> {
        let private_key = self.load_private_key()?;
        let public_key = RsaPublicKey::from(&private_key);
        let mut rng = rand::thread_rng();
        let ciphertext = public_key
            .encrypt(&mut rng, Oaep::new::<Sha256>(), plaintext.as_bytes())
            .map_err(|err| VaultError::Encryption(err.to_string()))?;
        let encoded = BASE64.encode(ciphertext);

        let conn = self.open_store()?;
        conn.execute(
            r#"
            INSERT INTO passwords (service_name, service_password)
            VALUES (?1, ?2)
            ON CONFLICT(service_name) DO UPDATE SET service_password = excluded.service_password
            "#,
            params![service, encoded],
        )?;
        let id = conn.query_row(
            "SELECT id FROM passwords WHERE service_name = ?1",
            params![service],
            |row| row.get(0),
        )?;
        info!(%service, "stored credential");
        Ok(id)
    }

    /// Decrypts and returns the credential stored for `service`.
    pub fn get_password(&self, service: &str) -> Result<String> {
        let conn = self.open_store()?;
        let encoded: Option<String> = conn
            .query_row(
                "SELECT service_password FROM passwords WHERE service_name = ?1",
                params![service],
                |row| row.get(0),
            )
            .optional()?;
        let encoded = encoded.ok_or_else(|| VaultError::NotFound(service.to_string()))?;

        let ciphertext =
            BASE64
                .decode(encoded.as_bytes())
                .map_err(|err| VaultError::Decryption {
                    service: service.to_string(),
                    reason: format!("stored value is not base64: {err}"),
                })?;
        let private_key = self.load_private_key()?;
        let plaintext = private_key
            .decrypt(Oaep::new::<Sha256>(), &ciphertext)
            .map_err(|err| VaultError::Decryption {
                service: service.to_string(),
                reason: err.to_string(),
            })?;
        String::from_utf8(plaintext).map_err(|err| VaultError::Decryption {
            service: service.to_string(),
            reason: format!("plaintext is not utf-8: {err}"),
        })
    }

    pub fn cloudblue_api_key(&self) -> Result<String> {
        self.get_password("cloudblue")
    }

    pub fn power_panel_password(&self) -> Result<String> {
        self.get_password("power_panel")
    }

    pub fn onnap_token(&self) -> Result<String> {
        self.get_password("onnap")
    }

    fn open_store(&self) -> Result<Connection> {
        Ok(Connection::open(&self.config.store_path)?)
    }

    /// Creates the private key if it is missing. The keypair is generated and
    /// serialized before the file exists, and the file itself is created
    /// exclusively, so a failed run never leaves a partial key behind and two
    /// first-run processes cannot both write one.
    fn ensure_key(&self) -> Result<()> {
        if self.config.key_path.exists() {
            return Ok(());
        }

        info!(bits = self.config.key_bits, "generating vault keypair");
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, self.config.key_bits)
            .map_err(|err| VaultError::Key(format!("key generation failed: {err}")))?;
        let pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|err| VaultError::Key(format!("key serialization failed: {err}")))?;

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.config.key_path);
        let mut file = match file {
            Ok(file) => file,
            // Another process won the creation race; use its key.
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        if let Err(err) = file.write_all(pem.as_bytes()) {
            // A truncated key file would wedge every later initialization.
            let _ = std::fs::remove_file(&self.config.key_path);
            return Err(err.into());
        }
        Ok(())
    }

    fn load_private_key(&self) -> Result<RsaPrivateKey> {
        let pem = std::fs::read_to_string(&self.config.key_path).map_err(|err| {
            VaultError::Key(format!(
                "read key file {}: {err}",
                self.config.key_path.display()
            ))
        })?;
        RsaPrivateKey::from_pkcs8_pem(&pem)
            .map_err(|err| VaultError::Key(format!("parse key file: {err}")))
    }
}
