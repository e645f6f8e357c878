// Copyright (c) 2022-2023 The MobileCoin Foundation

//! User and account context

use hbci_proto::CryptMode;
use serde::{Deserialize, Serialize};

use crate::tan::TanMethod;

bitflags::bitflags! {
    /// Persisted per-user flags
    pub struct UserFlags: u32 {
        /// Accept unsigned bank responses
        const BANK_DOESNT_SIGN = 1 << 0;
        /// Bank uses signature sequence counters
        const BANK_USES_SIGNSEQ = 1 << 1;
    }
}

impl Default for UserFlags {
    fn default() -> Self {
        UserFlags::empty()
    }
}

/// Banking user
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    /// User id, also used as the default signer
    pub user_id: String,
    pub customer_id: String,
    pub bank_code: String,

    /// Raw crypt mode, see [CryptMode]
    pub crypt_mode: u8,
    pub hbci_version: u32,
    pub system_id: Option<String>,
    pub flags: UserFlags,

    /// TAN function ids available to this user
    pub tan_methods: Vec<u32>,
    /// Last selected method, encoded as `job_version * 1000 + function`
    pub selected_tan_method: Option<u32>,
    /// TAN methods advertised by the bank
    pub tan_method_descriptions: Vec<TanMethod>,
    /// TAN medium (eg. device name) for two-step methods
    pub tan_medium_id: Option<String>,
}

impl User {
    /// Create a new user with the provided ids and crypt mode
    pub fn new(user_id: &str, customer_id: &str, bank_code: &str, mode: CryptMode) -> Self {
        Self {
            user_id: user_id.to_string(),
            customer_id: customer_id.to_string(),
            bank_code: bank_code.to_string(),
            crypt_mode: mode as u8,
            hbci_version: 300,
            system_id: None,
            flags: UserFlags::empty(),
            tan_methods: Vec::new(),
            selected_tan_method: None,
            tan_method_descriptions: Vec::new(),
            tan_medium_id: None,
        }
    }

    /// Fetch the configured crypt mode, `None` if the raw value is unknown
    pub fn crypt_mode(&self) -> Option<CryptMode> {
        CryptMode::try_from(self.crypt_mode).ok()
    }

    /// Check whether the user may use the TAN method `function`
    pub fn has_tan_method(&self, function: u32) -> bool {
        self.tan_methods.contains(&function)
    }
}

/// Bank account context
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Local unique id, used to look up account parameters
    pub unique_id: u32,
    pub account_number: String,
    pub sub_account: Option<String>,
    pub bank_code: String,
    pub country: u16,
}

impl Account {
    pub fn new(unique_id: u32, account_number: &str, bank_code: &str) -> Self {
        Self {
            unique_id,
            account_number: account_number.to_string(),
            sub_account: None,
            bank_code: bank_code.to_string(),
            country: 280,
        }
    }
}
