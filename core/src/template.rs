// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Job templates
//!
//! Templates describe a job type: its flags, the parameter group to look up
//! in the bank parameters, and the element tree of the segment to send.
//! Multi-message jobs carry one [MessageUnit] per message round.

use hbci_proto::ElementTree;

bitflags::bitflags! {
    /// Template flags
    pub struct TemplateFlags: u32 {
        /// Bank parameters are required
        const NEED_BPD = 1 << 0;
        /// Job requires a TAN
        const NEED_TAN = 1 << 1;
        /// Suppress the system id
        const NO_SYSID = 1 << 2;
        /// Suppress the iTAN hash
        const NO_ITAN = 1 << 3;
        /// Dialog job
        const DLG = 1 << 4;
        /// Job may continue via an attach point
        const ATTACHABLE = 1 << 5;
        /// Job must be sent alone
        const SINGLE = 1 << 6;
        /// Job must be signed
        const SIGN = 1 << 7;
        /// Job must be encrypted
        const CRYPT = 1 << 8;
        /// Bank errors do not fail the job
        const IGNORE_ERRORS = 1 << 9;
    }
}

/// One message round of a multi-message job
#[derive(Clone, Debug)]
pub struct MessageUnit {
    pub name: String,
    pub flags: TemplateFlags,
    pub segment: ElementTree,
}

impl MessageUnit {
    /// Create a new message unit, signed and encrypted by default
    pub fn new(name: &str, segment: ElementTree) -> Self {
        Self {
            name: name.to_string(),
            flags: TemplateFlags::SIGN | TemplateFlags::CRYPT,
            segment,
        }
    }

    pub fn with_flags(mut self, flags: TemplateFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Job template
#[derive(Clone, Debug)]
pub struct JobTemplate {
    /// Job name (eg. `JobGetBalance`)
    pub name: String,
    /// Segment code (eg. `HKSAL`)
    pub code: String,
    /// Segment version described by this template
    pub version: u32,
    pub flags: TemplateFlags,
    /// Parameter group name within the bank parameters
    pub params: Option<String>,
    /// Response group name
    pub response: Option<String>,
    pub description: Option<String>,
    /// Segment description, before group resolution
    pub segment: ElementTree,
    /// Message units for multi-message jobs
    pub messages: Vec<MessageUnit>,
}

impl JobTemplate {
    /// Create a new template, signed and encrypted by default
    pub fn new(name: &str, code: &str, version: u32) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            version,
            flags: TemplateFlags::SIGN | TemplateFlags::CRYPT,
            params: None,
            response: None,
            description: None,
            segment: ElementTree::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: TemplateFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_params(mut self, name: &str) -> Self {
        self.params = Some(name.to_string());
        self
    }

    pub fn with_response(mut self, name: &str) -> Self {
        self.response = Some(name.to_string());
        self
    }

    pub fn with_segment(mut self, segment: ElementTree) -> Self {
        self.segment = segment;
        self
    }

    pub fn with_message(mut self, unit: MessageUnit) -> Self {
        self.messages.push(unit);
        self
    }
}

/// Grammar / template provider
pub trait TemplateProvider {
    /// Find the template for `name` at `version`, any version when `version == 0`
    fn find_job(&self, name: &str, version: u32) -> Option<JobTemplate>;

    /// Group definitions referenced by template segments
    fn groups(&self) -> &ElementTree;
}

/// In-memory template set
#[derive(Clone, Debug, Default)]
pub struct TemplateSet {
    jobs: Vec<JobTemplate>,
    groups: ElementTree,
}

impl TemplateSet {
    pub fn new(groups: ElementTree) -> Self {
        Self {
            jobs: Vec::new(),
            groups,
        }
    }

    pub fn with_job(mut self, t: JobTemplate) -> Self {
        self.jobs.push(t);
        self
    }
}

impl TemplateProvider for TemplateSet {
    fn find_job(&self, name: &str, version: u32) -> Option<JobTemplate> {
        self.jobs
            .iter()
            .filter(|t| t.name == name && (version == 0 || t.version == version))
            .max_by_key(|t| t.version)
            .cloned()
    }

    fn groups(&self) -> &ElementTree {
        &self.groups
    }
}
