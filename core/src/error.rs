// Copyright (c) 2022-2023 The MobileCoin Foundation

use strum::{Display, EnumIter};

/// Error kinds surfaced to callers
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter)]
pub enum ErrorKind {
    /// Template, TAN method, account or parameter missing
    NotFound,
    /// Unknown crypto mode or TAN process
    NotSupported,
    /// Missing challenge, malformed response
    BadData,
    /// Invalid or unexpected signer / crypter
    Security,
    /// Encoding failure, unresolved group reference
    Internal,
    /// Send / receive failure or timeout
    Transport,
    /// Operation aborted by the user
    Aborted,
}

/// Engine errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Bad data: {0}")]
    BadData(String),

    #[error("Security violation: {0}")]
    Security(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Message already encoded
    #[error("Message already encoded")]
    AlreadyEncoded,

    #[error("Protocol error: {0}")]
    Proto(#[from] hbci_proto::Error),
}

impl Error {
    /// Fetch the kind of an error
    pub fn kind(&self) -> ErrorKind {
        use hbci_proto::Error as P;

        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::NotSupported(_) => ErrorKind::NotSupported,
            Error::BadData(_) => ErrorKind::BadData,
            Error::Security(_) => ErrorKind::Security,
            Error::Internal(_) | Error::AlreadyEncoded => ErrorKind::Internal,
            Error::Proto(
                P::UnresolvedGroup { .. }
                | P::GroupDepth(_)
                | P::InvalidNode
                | P::InvalidLength
                | P::Encdec,
            ) => ErrorKind::Internal,
            Error::Proto(_) => ErrorKind::BadData,
        }
    }
}
