// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Crypto mode dispatcher
//!
//! Routes sign / encrypt / decrypt / verify operations to the engine for
//! the user's configured [CryptMode]. Engines are provided by the caller
//! via [CryptEngines], the dispatcher itself holds no state beyond the
//! selected engine.

use std::sync::Arc;

use hbci_proto::CryptMode;
use log::debug;

use crate::{message::Response, user::User, Error};

/// Signature request for one signer
#[derive(Clone, Debug)]
pub struct SignRequest<'a> {
    /// Signed data (signature heads and job segments)
    pub data: &'a [u8],
    /// Signer (key or user) id
    pub signer: &'a str,
    /// TAN to include in the signature tail
    pub tan: Option<&'a str>,
}

/// Signature produced by an engine
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub value: Vec<u8>,
    /// Signer expected on the response, if the bank signs
    pub expected_signer: Option<String>,
}

/// Encrypted message payload
#[derive(Clone, Debug, PartialEq)]
pub struct Encrypted {
    /// Key name for the encryption head
    pub key_name: String,
    pub data: Vec<u8>,
    /// Crypter expected on the response
    pub expected_crypter: Option<String>,
}

/// Crypto engine for one crypt mode
pub trait CryptEngine: Send + Sync {
    /// Sign a message on behalf of `req.signer`
    fn sign(&self, req: &SignRequest) -> Result<Signature, Error>;

    /// Encrypt a message body for `crypter`
    fn encrypt(&self, crypter: &str, data: &[u8]) -> Result<Encrypted, Error>;

    /// Decrypt a response in place, recording the crypter
    fn decrypt(&self, resp: &mut Response) -> Result<(), Error>;

    /// Verify response signatures, recording the signers
    ///
    /// Signers with invalid signatures are recorded with a `!` prefix,
    /// signers with unknown keys with a `?` prefix.
    fn verify(&self, resp: &mut Response) -> Result<(), Error>;
}

/// Available engines by crypt mode
#[derive(Clone, Default)]
pub struct CryptEngines {
    pub ddv: Option<Arc<dyn CryptEngine>>,
    pub rdh: Option<Arc<dyn CryptEngine>>,
    pub pintan: Option<Arc<dyn CryptEngine>>,
}

impl CryptEngines {
    pub fn with_ddv(mut self, e: Arc<dyn CryptEngine>) -> Self {
        self.ddv = Some(e);
        self
    }

    pub fn with_rdh(mut self, e: Arc<dyn CryptEngine>) -> Self {
        self.rdh = Some(e);
        self
    }

    pub fn with_pintan(mut self, e: Arc<dyn CryptEngine>) -> Self {
        self.pintan = Some(e);
        self
    }
}

/// Crypt dispatcher, selected once per user / session
#[derive(Clone)]
pub enum Crypt {
    Ddv(Option<Arc<dyn CryptEngine>>),
    Rdh(Option<Arc<dyn CryptEngine>>),
    PinTan(Option<Arc<dyn CryptEngine>>),
    /// Unknown raw mode value
    Unsupported(u8),
}

impl Crypt {
    /// Select the dispatcher for a raw crypt mode
    pub fn new(mode: u8, engines: &CryptEngines) -> Self {
        match CryptMode::try_from(mode) {
            Ok(CryptMode::Ddv) => Self::Ddv(engines.ddv.clone()),
            Ok(CryptMode::Rdh) => Self::Rdh(engines.rdh.clone()),
            Ok(CryptMode::PinTan) => Self::PinTan(engines.pintan.clone()),
            Err(_) => {
                debug!("Unsupported crypt mode: {}", mode);
                Self::Unsupported(mode)
            }
        }
    }

    /// Select the dispatcher for a user's configured mode
    pub fn for_user(user: &User, engines: &CryptEngines) -> Self {
        Self::new(user.crypt_mode, engines)
    }

    pub fn mode(&self) -> Option<CryptMode> {
        match self {
            Self::Ddv(_) => Some(CryptMode::Ddv),
            Self::Rdh(_) => Some(CryptMode::Rdh),
            Self::PinTan(_) => Some(CryptMode::PinTan),
            Self::Unsupported(_) => None,
        }
    }

    fn engine(&self) -> Result<&dyn CryptEngine, Error> {
        let (engine, mode) = match self {
            Self::Ddv(e) => (e, CryptMode::Ddv),
            Self::Rdh(e) => (e, CryptMode::Rdh),
            Self::PinTan(e) => (e, CryptMode::PinTan),
            Self::Unsupported(m) => {
                return Err(Error::NotSupported(format!("crypt mode {m}")));
            }
        };

        engine
            .as_deref()
            .ok_or_else(|| Error::NotSupported(format!("no engine for crypt mode {mode}")))
    }

    pub fn sign(&self, req: &SignRequest) -> Result<Signature, Error> {
        self.engine()?.sign(req)
    }

    pub fn encrypt(&self, crypter: &str, data: &[u8]) -> Result<Encrypted, Error> {
        self.engine()?.encrypt(crypter, data)
    }

    pub fn decrypt(&self, resp: &mut Response) -> Result<(), Error> {
        self.engine()?.decrypt(resp)
    }

    pub fn verify(&self, resp: &mut Response) -> Result<(), Error> {
        self.engine()?.verify(resp)
    }
}

impl std::fmt::Debug for Crypt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported(m) => write!(f, "Crypt(unsupported {m})"),
            _ => write!(f, "Crypt({:?})", self.mode()),
        }
    }
}
