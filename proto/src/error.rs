// Copyright (c) 2022-2023 The MobileCoin Foundation

use alloc::string::String;

/// Protocol encoding / tree errors
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum Error {
    /// Output buffer too short
    #[cfg_attr(feature = "thiserror", error("Invalid buffer length"))]
    InvalidLength,

    /// Segment terminator missing
    #[cfg_attr(feature = "thiserror", error("Unterminated segment"))]
    Unterminated,

    /// Segment header missing or incomplete
    #[cfg_attr(feature = "thiserror", error("Invalid segment header"))]
    InvalidHeader,

    /// Numeric field could not be parsed
    #[cfg_attr(feature = "thiserror", error("Invalid numeric field"))]
    InvalidNumber,

    /// Binary element length prefix invalid or truncated
    #[cfg_attr(feature = "thiserror", error("Invalid binary element"))]
    InvalidBinary,

    /// Non UTF-8 data in a text field
    #[cfg_attr(feature = "thiserror", error("Invalid UTF-8"))]
    Utf8,

    /// Group reference without a matching definition
    #[cfg_attr(feature = "thiserror", error("Group definition {name}:{version} not found"))]
    UnresolvedGroup { name: String, version: u32 },

    /// Group definitions nested too deeply (or recursive)
    #[cfg_attr(feature = "thiserror", error("Group nesting exceeds {0} levels"))]
    GroupDepth(usize),

    /// Invalid node reference
    #[cfg_attr(feature = "thiserror", error("Invalid node reference"))]
    InvalidNode,

    /// Underlying encdec error
    #[cfg_attr(feature = "thiserror", error("Encode / decode error"))]
    Encdec,
}

impl From<encdec::Error> for Error {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => Error::InvalidLength,
            _ => Error::Encdec,
        }
    }
}
