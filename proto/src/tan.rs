// Copyright (c) 2022-2023 The MobileCoin Foundation

//! TAN process identifiers

use strum::{Display, EnumIter, EnumString};

/// Function id of the one-step pseudo method used when the bank
/// advertises no TAN methods
pub const ONE_STEP_FUNCTION: u32 = 999;

/// Segment code of TAN requests
pub const TAN_REQUEST: &str = "HKTAN";
/// Segment code of TAN responses
pub const TAN_RESPONSE: &str = "HITAN";

/// TAN process type advertised for a method
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter, num_enum::TryFromPrimitive,
)]
#[repr(u8)]
pub enum TanProcess {
    /// TAN is supplied with the original message
    OneStep = 1,
    /// Challenge is requested first, TAN is sent in a second message
    TwoStep = 2,
}

/// Process field of a TAN request segment
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter, num_enum::TryFromPrimitive,
)]
#[repr(u8)]
pub enum TanJobProcess {
    /// One-step, carries the order hash
    OrderHash = 1,
    /// Two-step, second message carrying the order reference
    Submit = 2,
    /// Two-step, first message requesting a challenge
    Challenge = 4,
}

impl TanJobProcess {
    /// Wire value of the process field
    pub fn code(&self) -> u8 {
        *self as u8
    }
}
