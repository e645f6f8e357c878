// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outbox configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// Timeout waiting for a bank response
    pub request_timeout_s: u64,
    /// Order hash mode for TAN jobs (0 / 1: RIPEMD-160, 2: SHA-1)
    pub itan_hash_mode: u32,
    /// Protocol version for message headers
    pub hbci_version: u32,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            request_timeout_s: 30,
            itan_hash_mode: 0,
            hbci_version: 300,
        }
    }
}

impl OutboxConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_s)
    }
}
