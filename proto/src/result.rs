// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bank result records
//!
//! Results are returned in `HIRMG` (message scope) and `HIRMS` (segment
//! scope) segments, one result per DEG laid out as
//! `code:reference:text[:param...]`.

use alloc::{string::String, vec::Vec};
use core::fmt;

use strum::{Display, EnumString};

use crate::Segment;

/// Message results segment code
pub const MSG_RESULTS: &str = "HIRMG";
/// Segment results segment code
pub const SEG_RESULTS: &str = "HIRMS";

/// More data available, parameter holds the attach point
pub const CODE_ATTACH_POINT: u16 = 3040;
/// Allowed TAN methods for this user
pub const CODE_ITAN_METHODS: u16 = 3920;

/// Scope of a result record
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString)]
pub enum ResultScope {
    Segment,
    Message,
}

/// Result record returned by the bank
///
/// Immutable once created, results are cloned when shared between jobs.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BankResult {
    code: u16,
    text: Option<String>,
    reference: Option<String>,
    param: Option<String>,
    scope: ResultScope,
}

impl BankResult {
    pub fn new(
        code: u16,
        text: Option<&str>,
        reference: Option<&str>,
        param: Option<&str>,
        scope: ResultScope,
    ) -> Self {
        Self {
            code,
            text: text.map(String::from),
            reference: reference.map(String::from),
            param: param.map(String::from),
            scope,
        }
    }

    /// Parse every result carried by a `HIRMG` / `HIRMS` segment
    ///
    /// Returns `None` for other segments.
    pub fn parse(s: &Segment) -> Option<Vec<BankResult>> {
        let scope = match s.code.as_str() {
            MSG_RESULTS => ResultScope::Message,
            SEG_RESULTS => ResultScope::Segment,
            _ => return None,
        };

        let results = (0..s.len())
            .filter_map(|i| {
                let code = s.text(i, 0)?.parse().ok()?;
                Some(BankResult::new(
                    code,
                    s.text(i, 2),
                    s.text(i, 1),
                    s.text(i, 3),
                    scope,
                ))
            })
            .collect();

        Some(results)
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    pub fn scope(&self) -> ResultScope {
        self.scope
    }

    /// Warnings are codes in `3000..4000`
    pub fn is_warning(&self) -> bool {
        (3000..4000).contains(&self.code)
    }

    /// Errors are codes from `9000`
    pub fn is_error(&self) -> bool {
        self.code >= 9000
    }
}

impl fmt::Display for BankResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.code)?;
        if let Some(r) = &self.reference {
            write!(f, "({r})")?;
        }
        write!(f, ": {}", self.text.as_deref().unwrap_or(""))?;
        if let Some(p) = &self.param {
            write!(f, " ({p})")?;
        }
        Ok(())
    }
}
