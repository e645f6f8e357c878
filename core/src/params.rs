// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Negotiated bank parameters (BPD / UPD)
//!
//! Parameters are loaded and persisted elsewhere, jobs only consume them
//! through [ParamStore].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::user::Account;

/// Versioned parameter set for one job type
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamSet {
    /// Segment version these parameters apply to
    pub version: u32,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl ParamSet {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    /// Fetch a numeric value, `None` if missing or not a number
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.parse().ok())
    }
}

/// Bank parameter store
pub trait ParamStore {
    /// Check whether bank parameters have been received at all
    fn has_bpd(&self) -> bool;

    /// Fetch every parameter set for the named parameter group
    fn job_params(&self, name: &str, hbci_version: u32) -> Vec<ParamSet>;

    /// PIN/TAN specific override of whether a segment requires a TAN
    fn tan_required(&self, code: &str) -> Option<bool>;

    /// Fetch account specific parameters for a segment code
    fn upd(&self, account: &Account, code: &str) -> Option<ParamSet>;
}

/// In-memory bank parameters
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct BankParams {
    /// Parameter sets by parameter group name
    #[serde(default)]
    pub jobs: BTreeMap<String, Vec<ParamSet>>,
    /// PIN/TAN table, segment code to TAN requirement
    #[serde(default)]
    pub pintan: BTreeMap<String, bool>,
    /// Account parameters by account id and segment code
    #[serde(default)]
    pub upd: BTreeMap<u32, BTreeMap<String, ParamSet>>,
}

impl BankParams {
    pub fn with_job(mut self, name: &str, params: ParamSet) -> Self {
        self.jobs.entry(name.to_string()).or_default().push(params);
        self
    }

    pub fn with_tan_required(mut self, code: &str, required: bool) -> Self {
        self.pintan.insert(code.to_string(), required);
        self
    }

    pub fn with_upd(mut self, account: u32, code: &str, params: ParamSet) -> Self {
        self.upd
            .entry(account)
            .or_default()
            .insert(code.to_string(), params);
        self
    }
}

impl ParamStore for BankParams {
    fn has_bpd(&self) -> bool {
        !self.jobs.is_empty()
    }

    fn job_params(&self, name: &str, _hbci_version: u32) -> Vec<ParamSet> {
        self.jobs.get(name).cloned().unwrap_or_default()
    }

    fn tan_required(&self, code: &str) -> Option<bool> {
        self.pintan.get(code).copied()
    }

    fn upd(&self, account: &Account, code: &str) -> Option<ParamSet> {
        self.upd.get(&account.unique_id)?.get(code).cloned()
    }
}
