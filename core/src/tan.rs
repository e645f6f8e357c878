// Copyright (c) 2022-2023 The MobileCoin Foundation

//! TAN methods and TAN jobs
//!
//! Methods advertised by the bank are matched against those available to
//! the user to select the method for two-step authorisation. TAN jobs
//! (`HKTAN`) carry the order hash, challenge request or TAN submission.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use hbci_proto::{
    tan::{TanJobProcess, TanProcess, ONE_STEP_FUNCTION, TAN_RESPONSE},
    CryptMode,
};

use crate::{
    job::Job,
    params::ParamStore,
    template::TemplateProvider,
    user::User,
    Error,
};

/// Name of the TAN job template
pub const TAN_JOB: &str = "JobTan";

/// TAN job argument paths
pub mod args {
    pub const PROCESS: &str = "process";
    pub const SEGMENT_CODE: &str = "segcode";
    pub const ORDER_HASH: &str = "orderhash";
    pub const REFERENCE: &str = "reference";
    pub const MORE_TANS: &str = "moretans";
    pub const MEDIUM: &str = "medium";
}

/// TAN method advertised by the bank
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TanMethod {
    /// Security function id
    pub function: u32,
    /// Version of the TAN job used with this method
    pub job_version: u32,
    /// Process type, see [TanProcess]
    pub process: u8,
    #[serde(default)]
    pub method_id: String,
    #[serde(default)]
    pub method_name: String,
}

impl TanMethod {
    /// Pseudo method used when the bank advertises no methods
    pub fn one_step() -> Self {
        Self {
            function: ONE_STEP_FUNCTION,
            job_version: 0,
            process: TanProcess::OneStep as u8,
            method_id: String::new(),
            method_name: "Single step".to_string(),
        }
    }

    /// Process type, `None` if not supported
    pub fn process(&self) -> Option<TanProcess> {
        TanProcess::try_from(self.process).ok()
    }

    /// Selection id, `job_version * 1000 + function`
    pub fn id(&self) -> u32 {
        self.job_version * 1000 + self.function
    }

    pub fn is_one_step(&self) -> bool {
        self.function == ONE_STEP_FUNCTION
    }
}

/// Select the TAN method for a user
///
/// A previously selected method is kept while the bank still advertises
/// it with a supported process and the user still has it, otherwise the
/// first usable method in bank order is selected.
pub fn select_tan_method(user: &User) -> Result<TanMethod, Error> {
    let methods = &user.tan_method_descriptions;

    if methods.is_empty() {
        debug!("No TAN methods advertised, using single step");
        return Ok(TanMethod::one_step());
    }

    let usable = |m: &&TanMethod| m.process().is_some() && user.has_tan_method(m.function);

    if let Some(id) = user.selected_tan_method {
        match methods.iter().find(|m| m.id() == id) {
            Some(m) if usable(&m) => {
                debug!("Using selected TAN method {} ({})", m.function, m.method_name);
                return Ok(m.clone());
            }
            Some(m) => warn!(
                "Selected TAN method {} (process {}) not usable, autoselecting",
                m.function, m.process
            ),
            None => warn!("Selected TAN method {} no longer available, autoselecting", id),
        }
    }

    match methods.iter().find(usable) {
        Some(m) => {
            debug!("Autoselected TAN method {} ({})", m.function, m.method_name);
            Ok(m.clone())
        }
        None => Err(Error::NotFound("no usable TAN method".to_string())),
    }
}

/// Create a TAN job for the provided method and process
pub fn new_tan_job(
    user: &User,
    templates: &dyn TemplateProvider,
    params: &dyn ParamStore,
    process: TanJobProcess,
    method: &TanMethod,
) -> Result<Job, Error> {
    let mut j = Job::new(TAN_JOB, user, None, method.job_version, templates, params)?;

    j.mark_tan_job();
    j.set_argument(args::PROCESS, process.code().to_string());

    if user.crypt_mode() == Some(CryptMode::PinTan) && process == TanJobProcess::Submit {
        j.set_argument(args::MORE_TANS, "N");
    }
    if let Some(m) = &user.tan_medium_id {
        j.set_argument(args::MEDIUM, m);
    }

    Ok(j)
}

impl Job {
    /// Reference of the order a TAN is submitted for
    pub fn set_tan_reference(&mut self, reference: &str) {
        self.set_argument(args::REFERENCE, reference);
    }

    pub fn set_order_hash(&mut self, hash: &[u8]) {
        self.set_argument(args::ORDER_HASH, hash);
    }

    /// Segment code of the order a TAN is requested for
    pub fn set_tan_segcode(&mut self, code: &str) {
        self.set_argument(args::SEGMENT_CODE, code);
    }
}

/// Challenge returned in a `HITAN` response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TanChallenge {
    pub reference: Option<String>,
    pub challenge: Option<String>,
    /// Structured challenge (eg. for optical TAN generators)
    pub challenge_hhd: Option<Vec<u8>>,
}

impl TanChallenge {
    /// Extract the challenge from a TAN job's responses
    ///
    /// `HITAN` items: process, order hash, reference, challenge, HHD data
    pub fn from_job(job: &Job) -> Self {
        let s = match job.responses().iter().rev().find(|s| s.code == TAN_RESPONSE) {
            Some(s) => s,
            None => return Self::default(),
        };

        Self {
            reference: s.text(2, 0).map(String::from),
            challenge: s.text(3, 0).map(String::from),
            challenge_hhd: s.value(4, 0).filter(|v| !v.is_empty()).map(|v| v.to_vec()),
        }
    }

    /// Check whether neither a challenge nor HHD data was returned
    pub fn is_empty(&self) -> bool {
        self.challenge.is_none() && self.challenge_hhd.is_none()
    }
}
