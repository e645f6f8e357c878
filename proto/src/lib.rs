// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol definitions for HBCI / FinTS style home banking
//!
//! This crate provides the element tree used to describe and carry segments,
//! the normalizer that turns grammar-described trees into canonical
//! nested DEG structures, and a minimal segment wire codec.
//!
//! Segments use the EDIFACT-like syntax of the protocol: a header DEG
//! (`CODE:NUMBER:VERSION[:REF]`), `+` separated data element groups,
//! `:` separated data elements and a `'` terminator, with `?` as the
//! release (escape) character and `@len@` prefixed binary elements.
//!

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod element;
pub mod normalize;
pub mod result;
pub mod segment;
pub mod status;
pub mod tan;

mod error;
pub use error::Error;

pub use element::{Element, ElementKind, ElementTree, NodeId};
pub use result::{BankResult, ResultScope};
pub use segment::Segment;
pub use status::JobStatus;

/// Crypto mode configured for a user
///
/// Raw values match the persisted user configuration
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    num_enum::TryFromPrimitive,
)]
#[repr(u8)]
pub enum CryptMode {
    /// Chip card (DDV)
    Ddv = 1,
    /// RSA key file / card (RDH)
    Rdh = 2,
    /// PIN + TAN
    PinTan = 5,
}
