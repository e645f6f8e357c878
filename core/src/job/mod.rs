// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Jobs
//!
//! A [Job] is one requested banking operation. Jobs are built from a
//! [JobTemplate] and the negotiated bank parameters, encoded into a
//! [Message](crate::message::Message), and collect the responses and
//! results returned by the bank.

use std::{cmp::Reverse, collections::BTreeMap, fmt};

use log::{debug, Level};
use zeroize::Zeroizing;

use hbci_proto::{
    normalize::{normalize, remove_trailing_empty, resolve_groups},
    result::{CODE_ATTACH_POINT, CODE_ITAN_METHODS},
    BankResult, CryptMode, ElementTree, JobStatus, ResultScope, Segment,
};

use crate::{
    message::Security,
    params::{ParamSet, ParamStore},
    template::{JobTemplate, TemplateFlags, TemplateProvider},
    user::{Account, User, UserFlags},
    Error,
};

mod handle;
pub use handle::{JobHandle, WeakJob};

mod entry;
pub use entry::LogEntry;

/// Provider name recorded in job logs
pub const PROVIDER: &str = "hbci";

/// Argument holding the continuation point for attachable jobs
pub const ARG_ATTACH_POINT: &str = "attach";

bitflags::bitflags! {
    /// Job flags
    pub struct JobFlags: u32 {
        /// Job must be signed
        const SIGN = 1 << 0;
        /// Job must be encrypted
        const CRYPT = 1 << 1;
        /// Job requires a TAN
        const NEED_TAN = 1 << 2;
        /// Job must be sent alone
        const SINGLE = 1 << 3;
        /// Job spans multiple messages
        const MULTI_MSG = 1 << 4;
        /// Bank returned a continuation point
        const HAS_ATTACHPOINT = 1 << 5;
        /// Suppress the system id
        const NO_SYSID = 1 << 6;
        /// Suppress the iTAN hash
        const NO_ITAN = 1 << 7;
        /// Bank returned warnings
        const HAS_WARNINGS = 1 << 8;
        /// Bank returned errors
        const HAS_ERRORS = 1 << 9;
        /// Dialog job
        const DLG_JOB = 1 << 10;
        /// Job may continue via an attach point
        const ATTACHABLE = 1 << 11;
        /// Further message units follow
        const HAS_MORE_MSGS = 1 << 12;
        /// Bank errors do not mark the job
        const IGNORE_ERROR = 1 << 13;
        /// Bank parameters are required
        const NEED_BPD = 1 << 14;
        /// Auxiliary TAN job, results propagate to the other jobs of a queue
        const TAN_JOB = 1 << 15;
    }
}

/// Outcome of a response signature check
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SignatureCheck {
    /// Signature acceptable
    Ok,
    /// Expected signature missing, the user must decide
    NeedsConfirmation,
}

/// Continuation callback, returns `false` when no further message is needed
pub type NextMessageFn = Box<dyn FnMut(&Job) -> bool + Send>;

/// Banking job
pub struct Job {
    id: u32,
    name: String,
    code: String,
    description: Option<String>,
    user: String,
    provider: String,
    crypt_mode: Option<CryptMode>,

    segment_version: u32,
    flags: JobFlags,
    status: JobStatus,

    /// Template with resolved and normalised segment trees
    template: JobTemplate,
    /// Current message unit for multi-message jobs
    msg_index: usize,

    params: Option<ParamSet>,
    upd: Option<ParamSet>,
    args: BTreeMap<String, Vec<u8>>,
    min_sigs: u32,
    sec_profile: u32,
    security_class: u32,
    jobs_per_msg: u32,

    responses: Vec<Segment>,
    sampled: usize,
    seg_results: Vec<BankResult>,
    msg_results: Vec<BankResult>,
    outbox_results: Vec<BankResult>,

    signers: Vec<String>,
    expected_signer: Option<String>,
    expected_crypter: Option<String>,
    used_tan: Option<Zeroizing<String>>,

    first_segment: u32,
    last_segment: u32,
    msg_num: u32,
    dialog_id: Option<String>,
    attach_point: Option<String>,

    next_msg: Option<NextMessageFn>,
    log: Vec<LogEntry>,
}

impl Job {
    /// Create a new job from the template `name`
    ///
    /// `version` selects an explicit segment version, `0` selects the
    /// highest version supported by both the bank parameters and the
    /// templates. Fails when the job cannot be fully constructed.
    pub fn new(
        name: &str,
        user: &User,
        account: Option<&Account>,
        version: u32,
        templates: &dyn TemplateProvider,
        params: &dyn ParamStore,
    ) -> Result<Self, Error> {
        let crypt_mode = user.crypt_mode();

        // Find any template for this job
        let base = templates
            .find_job(name, 0)
            .ok_or_else(|| Error::NotFound(format!("job {name} not supported")))?;

        let needs_bpd = base.flags.contains(TemplateFlags::NEED_BPD);
        let mut need_tan = base.flags.contains(TemplateFlags::NEED_TAN);

        let mut template = None;
        let mut job_params = None;

        // Select parameter set and matching template version
        if let Some(param_name) = base.params.as_deref() {
            if !params.has_bpd() {
                return Err(Error::NotFound("no bank parameters available".to_string()));
            }

            if crypt_mode == Some(CryptMode::PinTan) {
                if let Some(t) = params.tan_required(&base.code) {
                    debug!("TAN requirement for {} from PIN/TAN parameters: {}", base.code, t);
                    need_tan = t;
                }
            }

            let mut sets = params.job_params(param_name, user.hbci_version);
            sets.sort_by_key(|p| Reverse(p.version));

            let found = sets
                .into_iter()
                .filter(|p| version == 0 || p.version == version)
                .find_map(|p| templates.find_job(name, p.version).map(|t| (t, p)));

            match found {
                Some((t, p)) => {
                    debug!("Selected {} version {}", name, p.version);
                    template = Some(t);
                    job_params = Some(p);
                }
                None if needs_bpd => {
                    return Err(Error::NotFound(format!(
                        "job {name} (version {version}) not supported by bank"
                    )))
                }
                None => (),
            }
        }

        let mut template = match (template, version) {
            (Some(t), _) => t,
            (None, 0) => base,
            (None, v) => templates
                .find_job(name, v)
                .ok_or_else(|| Error::NotFound(format!("job {name} version {v} not supported")))?,
        };

        // Account specific parameters
        let upd = match account {
            Some(a) => {
                let u = params.upd(a, &template.code);
                if u.is_none() && needs_bpd {
                    return Err(Error::NotFound(format!(
                        "job {name} not enabled for account {}",
                        a.account_number
                    )));
                }
                u
            }
            None => None,
        };

        // Resolve and normalise segment descriptions
        prepare_tree(&mut template.segment, templates.groups())?;
        for m in template.messages.iter_mut() {
            prepare_tree(&mut m.segment, templates.groups())?;
        }

        let segment_version = job_params
            .as_ref()
            .map(|p| p.version)
            .unwrap_or(template.version);

        let mut j = Self {
            id: 0,
            name: name.to_string(),
            code: template.code.clone(),
            description: template.description.clone(),
            user: user.user_id.clone(),
            provider: PROVIDER.to_string(),
            crypt_mode,
            segment_version,
            flags: JobFlags::empty(),
            status: JobStatus::ToDo,
            template,
            msg_index: 0,
            params: job_params,
            upd,
            args: BTreeMap::new(),
            min_sigs: 0,
            sec_profile: 1,
            security_class: 0,
            jobs_per_msg: 0,
            responses: Vec::new(),
            sampled: 0,
            seg_results: Vec::new(),
            msg_results: Vec::new(),
            outbox_results: Vec::new(),
            signers: Vec::new(),
            expected_signer: None,
            expected_crypter: None,
            used_tan: None,
            first_segment: 0,
            last_segment: 0,
            msg_num: 0,
            dialog_id: None,
            attach_point: None,
            next_msg: None,
            log: Vec::new(),
        };

        j.sample_params();
        j.apply_template_flags(need_tan);

        j.log(Level::Info, "HBCI-Job created");

        Ok(j)
    }

    fn apply_template_flags(&mut self, need_tan: bool) {
        let tf = self.template.flags;

        if tf.contains(TemplateFlags::DLG) {
            self.flags |= JobFlags::DLG_JOB | JobFlags::SINGLE;
        }
        if tf.contains(TemplateFlags::ATTACHABLE) {
            self.flags |= JobFlags::ATTACHABLE;
        }
        if tf.contains(TemplateFlags::SINGLE) {
            self.flags |= JobFlags::SINGLE;
        }
        if tf.contains(TemplateFlags::NEED_BPD) {
            self.flags |= JobFlags::NEED_BPD;
        }
        if self.crypt_mode == Some(CryptMode::PinTan) {
            self.flags |= JobFlags::SINGLE;
        }
        if need_tan {
            self.flags |= JobFlags::NEED_TAN;
        }

        match self.template.messages.first() {
            Some(unit) => {
                let unit_flags = unit.flags;
                self.flags |= JobFlags::MULTI_MSG | JobFlags::SINGLE;
                self.flags
                    .set(JobFlags::HAS_MORE_MSGS, self.template.messages.len() > 1);
                self.sample_unit_flags(unit_flags);
            }
            None => self.sample_unit_flags(tf),
        }
    }

    /// Sample per-message flags from a template or message unit
    fn sample_unit_flags(&mut self, f: TemplateFlags) {
        self.flags.set(JobFlags::SIGN, f.contains(TemplateFlags::SIGN));
        if f.contains(TemplateFlags::SIGN) && self.min_sigs == 0 {
            self.min_sigs = 1;
        }
        self.flags.set(JobFlags::CRYPT, f.contains(TemplateFlags::CRYPT));
        self.flags.set(JobFlags::IGNORE_ERROR, f.contains(TemplateFlags::IGNORE_ERRORS));

        if f.contains(TemplateFlags::NO_ITAN) {
            self.flags |= JobFlags::NO_ITAN;
        } else {
            self.flags.remove(JobFlags::NO_ITAN);
        }

        if f.contains(TemplateFlags::NO_SYSID) {
            self.flags |= JobFlags::NO_SYSID | JobFlags::SINGLE;
        } else {
            self.flags.remove(JobFlags::NO_SYSID);
        }
    }

    /// Sample limits from the bank parameters, signed units raise a missing
    /// or zero `minsigs` to one
    fn sample_params(&mut self) {
        let p = match &self.params {
            Some(p) => p,
            None => return,
        };

        self.min_sigs = p.get_u32("minsigs").unwrap_or(0);
        self.sec_profile = p.get_u32("secProfile").unwrap_or(1);
        self.security_class = p.get_u32("securityClass").unwrap_or(0);
        self.jobs_per_msg = p.get_u32("jobspermsg").unwrap_or(0);
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Segment code of this job
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Owning user id
    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn crypt_mode(&self) -> Option<CryptMode> {
        self.crypt_mode
    }

    pub fn segment_version(&self) -> u32 {
        self.segment_version
    }

    pub fn flags(&self) -> JobFlags {
        self.flags
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Selected bank parameters
    pub fn params(&self) -> Option<&ParamSet> {
        self.params.as_ref()
    }

    /// Account specific parameters
    pub fn upd(&self) -> Option<&ParamSet> {
        self.upd.as_ref()
    }

    pub fn min_signatures(&self) -> u32 {
        self.min_sigs
    }

    pub fn security_profile(&self) -> u32 {
        self.sec_profile
    }

    pub fn security_class(&self) -> u32 {
        self.security_class
    }

    /// Maximum number of jobs of this type per message, `0` for no limit
    pub fn jobs_per_msg(&self) -> u32 {
        self.jobs_per_msg
    }

    /// Mark this job as an auxiliary TAN job
    pub fn mark_tan_job(&mut self) {
        self.flags |= JobFlags::TAN_JOB;
    }

    /// Set the status of this job
    ///
    /// Returns `true` if the status changed. Re-entering the current status
    /// does nothing, invalid transitions are rejected.
    pub fn set_status(&mut self, status: JobStatus) -> bool {
        if self.status == status {
            return false;
        }

        if !self.status.can_transition(status) {
            debug!(
                "{}: ignoring status change from \"{}\" to \"{}\"",
                self.name, self.status, status
            );
            return false;
        }

        let text = format!("Status changed from \"{}\" to \"{}\"", self.status, status);
        self.log(Level::Info, &text);
        self.status = status;

        true
    }

    /// Add a signer, returns `false` if already present
    pub fn add_signer(&mut self, name: &str) -> bool {
        if self.signers.iter().any(|s| s == name) {
            self.log(Level::Debug, &format!("Signer \"{name}\" already in list"));
            return false;
        }

        self.signers.push(name.to_string());
        self.flags |= JobFlags::SIGN;
        self.log(Level::Info, &format!("Signer \"{name}\" added"));

        true
    }

    pub fn signers(&self) -> &[String] {
        &self.signers
    }

    /// Set a `/` separated argument path
    pub fn set_argument(&mut self, path: &str, value: impl AsRef<[u8]>) {
        self.args.insert(path.to_string(), value.as_ref().to_vec());
    }

    pub fn argument(&self, path: &str) -> Option<&[u8]> {
        self.args.get(path).map(|v| &v[..])
    }

    /// Set the continuation callback for multi-message jobs
    pub fn set_next_message_fn(&mut self, f: NextMessageFn) {
        self.next_msg = Some(f);
    }

    /// Current message unit name for multi-message jobs
    pub fn message_unit(&self) -> Option<&str> {
        match self.flags.contains(JobFlags::MULTI_MSG) {
            true => self.template.messages.get(self.msg_index).map(|m| m.name.as_str()),
            false => None,
        }
    }

    /// Build the request segment for the current message round
    pub fn build_segment(&self, number: u32) -> Result<Segment, Error> {
        let unit = match self.flags.contains(JobFlags::MULTI_MSG) {
            true => self.template.messages.get(self.msg_index),
            false => None,
        };
        let mut tree = match unit {
            Some(u) => u.segment.clone(),
            None => self.template.segment.clone(),
        };

        // Fill arguments, unit specific values first
        for leaf in tree.leaves(tree.root()) {
            let path = tree.path_of(leaf);

            let value = unit
                .and_then(|u| self.args.get(&format!("{}/{}", u.name, path)))
                .or_else(|| self.args.get(&path))
                .cloned()
                .or_else(|| match path == ARG_ATTACH_POINT {
                    true => self.attach_point.as_ref().map(|a| a.as_bytes().to_vec()),
                    false => None,
                });

            if let (Some(v), Some(e)) = (value, tree.get_mut(leaf)) {
                e.data = Some(v);
            }
        }

        remove_trailing_empty(&mut tree);

        Ok(Segment {
            code: self.code.clone(),
            number,
            version: self.segment_version,
            reference: None,
            elements: tree,
        })
    }

    /// Decide whether another message round is required
    pub fn prepare_next_message(&mut self) -> bool {
        if let Some(mut f) = self.next_msg.take() {
            let more = f(self);
            self.next_msg = Some(f);

            if !more {
                debug!("{}: continuation callback reports no more messages", self.name);
                return false;
            }
        }

        match self.status {
            JobStatus::Unknown | JobStatus::Error => {
                debug!("{}: no more messages (status {})", self.name, self.status);
                return false;
            }
            JobStatus::ToDo => {
                debug!("{}: no more messages (job not yet sent)", self.name);
                return false;
            }
            _ => (),
        }

        if self.flags.contains(JobFlags::HAS_ATTACHPOINT) {
            debug!("{}: attach point present, more messages", self.name);
            return true;
        }

        if !self.flags.contains(JobFlags::MULTI_MSG) {
            return false;
        }

        let next = self.msg_index + 1;
        let unit_flags = match self.template.messages.get(next) {
            Some(u) => u.flags,
            None => {
                self.flags.remove(JobFlags::HAS_MORE_MSGS);
                return false;
            }
        };

        debug!("{}: advancing to message unit {}", self.name, next);

        self.msg_index = next;
        self.sample_unit_flags(unit_flags);
        self.flags.set(
            JobFlags::HAS_MORE_MSGS,
            self.template.messages.len() > next + 1,
        );

        true
    }

    /// Store a response segment addressed to this job
    pub fn add_response(&mut self, s: Segment) {
        self.responses.push(s);
    }

    pub fn responses(&self) -> &[Segment] {
        &self.responses
    }

    /// Sample results from responses received since the last call
    pub fn sample_results(&mut self) {
        if self.sampled >= self.responses.len() {
            return;
        }

        let new = self.responses.split_off(self.sampled);
        self.sampled += new.len();

        // Attach points only apply to the latest round
        self.flags.remove(JobFlags::HAS_ATTACHPOINT);
        self.attach_point = None;

        for s in &new {
            for r in BankResult::parse(s).into_iter().flatten() {
                self.add_result(r);
            }
        }

        self.responses.extend(new);
    }

    /// Record a result against this job
    pub fn add_result(&mut self, r: BankResult) {
        if r.code() == CODE_ATTACH_POINT && self.flags.contains(JobFlags::ATTACHABLE) {
            if let Some(p) = r.param() {
                self.attach_point = Some(p.to_string());
                self.flags |= JobFlags::HAS_ATTACHPOINT;
            }
        }

        self.record_result(r);
    }

    /// Record a result copied from another job
    ///
    /// Updates results and error / warning flags only, attach points
    /// belong to the job that received them.
    pub fn copy_result(&mut self, r: BankResult) {
        self.record_result(r);
    }

    fn record_result(&mut self, r: BankResult) {
        let level = if r.is_error() {
            Level::Error
        } else if r.is_warning() && r.code() != CODE_ITAN_METHODS {
            Level::Warn
        } else {
            Level::Info
        };
        self.log(level, &format!("{} result {}", r.scope(), r));

        if r.is_error() && !self.flags.contains(JobFlags::IGNORE_ERROR) {
            self.flags |= JobFlags::HAS_ERRORS;
        }
        if r.is_warning() {
            self.flags |= JobFlags::HAS_WARNINGS;
        }

        if self.flags.contains(JobFlags::TAN_JOB) {
            self.outbox_results.push(r.clone());
        }

        match r.scope() {
            ResultScope::Segment => self.seg_results.push(r),
            ResultScope::Message => self.msg_results.push(r),
        }
    }

    pub fn segment_results(&self) -> &[BankResult] {
        &self.seg_results
    }

    pub fn message_results(&self) -> &[BankResult] {
        &self.msg_results
    }

    /// Results to be propagated to the other jobs of a queue
    pub fn outbox_results(&self) -> &[BankResult] {
        &self.outbox_results
    }

    /// Check whether the bank returned its allowed TAN methods
    pub fn has_itan_result(&self) -> bool {
        self.seg_results
            .iter()
            .chain(self.msg_results.iter())
            .any(|r| r.code() == CODE_ITAN_METHODS)
    }

    pub fn attach_point(&self) -> Option<&str> {
        self.attach_point.as_deref()
    }

    /// Check the signatures of a response addressed to this job
    pub fn check_signature(
        &mut self,
        security: &Security,
        user_flags: UserFlags,
    ) -> Result<SignatureCheck, Error> {
        if self.crypt_mode == Some(CryptMode::PinTan) {
            debug!("{}: not checking signature in PIN/TAN mode", self.name);
            return Ok(SignatureCheck::Ok);
        }

        // Signatures by invalid keys are never accepted
        if let Some(s) = security.signers.iter().find(|s| s.starts_with('!')) {
            self.log(Level::Error, &format!("Invalid signature key \"{s}\""));
            return Err(Error::Security(format!("invalid signature key {s}")));
        }

        let expected = match &self.expected_signer {
            Some(e) if !user_flags.contains(UserFlags::BANK_DOESNT_SIGN) => e.clone(),
            _ => return Ok(SignatureCheck::Ok),
        };

        if security.signers.is_empty() {
            self.log(Level::Warn, "Response is not signed by the bank");
            return Ok(SignatureCheck::NeedsConfirmation);
        }

        for s in &security.signers {
            if s.eq_ignore_ascii_case(&expected) {
                debug!("{}: signed by expected signer \"{}\"", self.name, s);
                return Ok(SignatureCheck::Ok);
            }

            if !s.starts_with('?') {
                self.log(
                    Level::Warn,
                    &format!("Signer \"{s}\" is not the expected one (\"{expected}\")"),
                );
                return Ok(SignatureCheck::Ok);
            }
        }

        self.log(Level::Error, "No valid signature from the expected signer");
        Err(Error::Security(format!("no valid signature by {expected}")))
    }

    /// Accept a response without the expected signature
    pub fn accept_unsigned(&mut self, always: bool) {
        let text = match always {
            true => "Unsigned responses accepted for this user",
            false => "Unsigned response accepted once",
        };
        self.log(Level::Info, text);
    }

    /// Check the encryption of a response addressed to this job
    pub fn check_encryption(&mut self, security: &Security) -> Result<(), Error> {
        if self.crypt_mode == Some(CryptMode::PinTan) {
            debug!("{}: not checking encryption in PIN/TAN mode", self.name);
            return Ok(());
        }

        let expected = self.expected_crypter.clone();
        match (&security.crypter, &expected) {
            (Some(c), _) if c.starts_with('!') || c.starts_with('?') => {
                self.log(Level::Error, &format!("Invalid encryption key \"{c}\""));
                Err(Error::Security(format!("invalid encryption key {c}")))
            }
            (Some(c), Some(e)) if !c.eq_ignore_ascii_case(e) => {
                let text = format!("Encrypted with \"{c}\", expected \"{e}\"");
                self.log(Level::Warn, &text);
                Ok(())
            }
            (None, Some(_)) => {
                self.log(Level::Error, "Response is not encrypted");
                Err(Error::Security("response not encrypted".to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn expected_signer(&self) -> Option<&str> {
        self.expected_signer.as_deref()
    }

    pub fn set_expected_signer(&mut self, s: Option<&str>) {
        self.expected_signer = s.map(String::from);
    }

    pub fn expected_crypter(&self) -> Option<&str> {
        self.expected_crypter.as_deref()
    }

    pub fn set_expected_crypter(&mut self, c: Option<&str>) {
        self.expected_crypter = c.map(String::from);
    }

    /// TAN used to authorise this job
    pub fn used_tan(&self) -> Option<&str> {
        self.used_tan.as_ref().map(|t| t.as_str())
    }

    pub fn set_used_tan(&mut self, tan: &str) {
        self.used_tan = Some(Zeroizing::new(tan.to_string()));
    }

    pub fn first_segment(&self) -> u32 {
        self.first_segment
    }

    pub fn last_segment(&self) -> u32 {
        self.last_segment
    }

    pub fn set_segments(&mut self, first: u32, last: u32) {
        self.first_segment = first;
        self.last_segment = last;
    }

    /// Message number this job was last encoded into
    pub fn msg_num(&self) -> u32 {
        self.msg_num
    }

    pub fn dialog_id(&self) -> Option<&str> {
        self.dialog_id.as_deref()
    }

    pub fn set_message_info(&mut self, msg_num: u32, dialog_id: &str) {
        self.msg_num = msg_num;
        self.dialog_id = Some(dialog_id.to_string());
    }

    /// Check whether the response segment `reference` of message `msg_num`
    /// addresses this job
    pub fn owns_segment(&self, msg_num: u32, reference: u32) -> bool {
        self.msg_num == msg_num
            && self.first_segment != 0
            && (self.first_segment..=self.last_segment).contains(&reference)
    }

    /// Append to the job log
    pub fn log(&mut self, level: Level, text: &str) {
        log::log!(level, "{} #{}: {}", self.name, self.id, text);
        self.log.push(LogEntry::new(level, &self.provider, text));
    }

    /// Fetch the cumulative job log
    pub fn logs(&self) -> &[LogEntry] {
        &self.log
    }
}

fn prepare_tree(tree: &mut ElementTree, groups: &ElementTree) -> Result<(), Error> {
    resolve_groups(tree, groups)?;
    normalize(tree)?;
    Ok(())
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("code", &self.code)
            .field("version", &self.segment_version)
            .field("status", &self.status)
            .field("flags", &self.flags)
            .field("signers", &self.signers)
            .finish()
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        debug!("Destroying job {} #{}", self.name, self.id);
    }
}
