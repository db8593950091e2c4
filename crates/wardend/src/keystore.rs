//! Key and trust store descriptors handed to the directory server.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use camino::Utf8Path;
use uuid::Uuid;
use warden_config::Config;

/// Which store a binding describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeystoreKind {
    /// Store holding the server certificate and private key.
    KeyStore,
    /// Store holding the certificates the server trusts.
    TrustStore,
}

/// Template tokens for one store kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeystoreTokens {
    /// Replaced with the store's absolute location.
    pub location: &'static str,
    /// Replaced with the store password.
    pub password: &'static str,
    /// Replaced with the store type.
    pub store_type: &'static str,
    /// Replaced with the absolute path of the pin file.
    pub pin_location: &'static str,
}

static KEY_STORE_TOKENS: KeystoreTokens = KeystoreTokens {
    location: "key.store.loc",
    password: "key.store.pw",
    store_type: "key.store.type",
    pin_location: "key.store.pin.loc",
};

static TRUST_STORE_TOKENS: KeystoreTokens = KeystoreTokens {
    location: "trust.store.loc",
    password: "trust.store.pw",
    store_type: "trust.store.type",
    pin_location: "trust.store.pin.loc",
};

impl KeystoreKind {
    /// Template tokens for this kind.
    #[must_use]
    pub fn tokens(self) -> &'static KeystoreTokens {
        match self {
            Self::KeyStore => &KEY_STORE_TOKENS,
            Self::TrustStore => &TRUST_STORE_TOKENS,
        }
    }
}

impl fmt::Display for KeystoreKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyStore => formatter.write_str("key store"),
            Self::TrustStore => formatter.write_str("trust store"),
        }
    }
}

/// Runtime values substituted for one store.
#[derive(Clone, PartialEq, Eq)]
pub struct KeystoreBinding {
    kind: KeystoreKind,
    location: Option<PathBuf>,
    password: String,
    store_type: String,
    pin_path: PathBuf,
}

impl KeystoreBinding {
    /// Builds a binding, resolving `location` and `pin_path` to absolute paths.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while resolving the current directory.
    pub fn new(
        kind: KeystoreKind,
        location: Option<&Path>,
        password: impl Into<String>,
        store_type: impl Into<String>,
        pin_path: &Path,
    ) -> io::Result<Self> {
        let location = location.map(std::path::absolute).transpose()?;
        Ok(Self {
            kind,
            location,
            password: password.into(),
            store_type: store_type.into(),
            pin_path: std::path::absolute(pin_path)?,
        })
    }

    /// Store kind.
    #[must_use]
    pub const fn kind(&self) -> KeystoreKind {
        self.kind
    }

    /// Absolute store location, when one is configured.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Store password.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Store type.
    #[must_use]
    pub fn store_type(&self) -> &str {
        self.store_type.as_str()
    }

    /// Absolute path of the transient pin file.
    #[must_use]
    pub fn pin_path(&self) -> &Path {
        self.pin_path.as_path()
    }
}

impl fmt::Debug for KeystoreBinding {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("KeystoreBinding")
            .field("kind", &self.kind)
            .field("location", &self.location)
            .field("password", &"<redacted>")
            .field("store_type", &self.store_type)
            .field("pin_path", &self.pin_path)
            .finish()
    }
}

/// The key store and trust store bindings of one supervised server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystoreBindings {
    key_store: KeystoreBinding,
    trust_store: KeystoreBinding,
}

impl KeystoreBindings {
    /// Pairs an explicit key store and trust store.
    #[must_use]
    pub const fn new(key_store: KeystoreBinding, trust_store: KeystoreBinding) -> Self {
        Self {
            key_store,
            trust_store,
        }
    }

    /// Builds bindings from configuration.
    ///
    /// Pin files live in the configured pin directory under fresh random
    /// names, so a previous run's pin path is never reused.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while resolving relative paths.
    pub fn from_config(config: &Config) -> io::Result<Self> {
        let pin_dir = config.pin_dir();
        let key_store = KeystoreBinding::new(
            KeystoreKind::KeyStore,
            config.key_store.as_deref().map(Utf8Path::as_std_path),
            config.key_store_password.clone().unwrap_or_default(),
            config.key_store_type.clone(),
            pin_dir.join(Uuid::new_v4().to_string()).as_std_path(),
        )?;
        let trust_store = KeystoreBinding::new(
            KeystoreKind::TrustStore,
            config.trust_store.as_deref().map(Utf8Path::as_std_path),
            config.trust_store_password.clone().unwrap_or_default(),
            config.trust_store_type.clone(),
            pin_dir.join(Uuid::new_v4().to_string()).as_std_path(),
        )?;
        Ok(Self::new(key_store, trust_store))
    }

    /// Binding for `kind`.
    #[must_use]
    pub const fn get(&self, kind: KeystoreKind) -> &KeystoreBinding {
        match kind {
            KeystoreKind::KeyStore => &self.key_store,
            KeystoreKind::TrustStore => &self.trust_store,
        }
    }

    /// Iterates the key store then the trust store.
    pub fn iter(&self) -> impl Iterator<Item = &KeystoreBinding> {
        [&self.key_store, &self.trust_store].into_iter()
    }
}
