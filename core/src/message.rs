// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Messages
//!
//! A [Message] collects the encoded segments of the jobs in one queue and
//! wraps them with signature heads / tails, the encryption envelope and the
//! message header / trailer. A message is encoded exactly once.
//!
//! Incoming data is parsed into a [Response], decrypted and verified via
//! the [Crypt] dispatcher, then dispatched to jobs by segment reference.

use encdec::Encode;
use log::{debug, trace};
use ripemd::Ripemd160;
use sha1::{Digest, Sha1};
use zeroize::Zeroizing;

use hbci_proto::{segment::decode_all, tan::ONE_STEP_FUNCTION, JobStatus, Segment};

use crate::{
    crypt::{Crypt, SignRequest},
    job::{Job, JobFlags},
    Error,
};

/// Message header
pub const HNHBK: &str = "HNHBK";
/// Message trailer
pub const HNHBS: &str = "HNHBS";
/// Signature head
pub const HNSHK: &str = "HNSHK";
/// Signature tail
pub const HNSHA: &str = "HNSHA";
/// Encryption head
pub const HNVSK: &str = "HNVSK";
/// Encrypted data
pub const HNVSD: &str = "HNVSD";

/// Segment number of the encryption head
pub const HNVSK_NUM: u32 = 998;
/// Segment number of the encrypted data
pub const HNVSD_NUM: u32 = 999;

/// Digits of the message size field
pub const SIZE_DIGITS: usize = 12;

/// Signers and crypter found on a response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Security {
    pub signers: Vec<String>,
    pub crypter: Option<String>,
}

/// Outgoing message
#[derive(Debug)]
pub struct Message {
    hbci_version: u32,
    dialog_id: String,
    msg_num: u32,
    next_segment: u32,

    segments: Vec<Segment>,
    signers: Vec<String>,
    crypter: Option<String>,

    need_tan: bool,
    tan: Option<Zeroizing<String>>,
    security_function: u32,

    itan_hash_mode: u32,
    itan_hash: Option<Vec<u8>>,

    expected_signer: Option<String>,
    expected_crypter: Option<String>,
    encoded: Option<Vec<u8>>,
}

impl Message {
    pub fn new(hbci_version: u32, dialog_id: &str, msg_num: u32) -> Self {
        Self {
            hbci_version,
            dialog_id: dialog_id.to_string(),
            msg_num,
            next_segment: 2,
            segments: Vec::new(),
            signers: Vec::new(),
            crypter: None,
            need_tan: false,
            tan: None,
            security_function: ONE_STEP_FUNCTION,
            itan_hash_mode: 0,
            itan_hash: None,
            expected_signer: None,
            expected_crypter: None,
            encoded: None,
        }
    }

    /// Set the iTAN hash mode (0 / 1: RIPEMD-160, 2: SHA-1)
    pub fn with_itan_hash_mode(mut self, mode: u32) -> Self {
        self.itan_hash_mode = mode;
        self
    }

    /// Set the security function (TAN method function) for signature heads
    pub fn with_security_function(mut self, f: u32) -> Self {
        self.security_function = f;
        self
    }

    pub fn msg_num(&self) -> u32 {
        self.msg_num
    }

    pub fn dialog_id(&self) -> &str {
        &self.dialog_id
    }

    /// Add a signer, heads are numbered before any job segment
    pub fn add_signer(&mut self, signer: &str) -> Result<(), Error> {
        if self.signers.iter().any(|s| s == signer) {
            return Ok(());
        }
        if !self.segments.is_empty() {
            return Err(Error::Internal(format!(
                "signer {signer} added after job segments"
            )));
        }

        self.signers.push(signer.to_string());
        self.next_segment += 1;

        Ok(())
    }

    pub fn signers(&self) -> &[String] {
        &self.signers
    }

    pub fn crypter(&self) -> Option<&str> {
        self.crypter.as_deref()
    }

    pub fn need_tan(&self) -> bool {
        self.need_tan
    }

    pub fn set_need_tan(&mut self, need_tan: bool) {
        self.need_tan = need_tan;
    }

    /// Attach a TAN, carried in the first signature tail
    pub fn set_tan(&mut self, tan: &str) {
        self.tan = Some(Zeroizing::new(tan.to_string()));
    }

    /// Hash over the first job segment, when computed
    pub fn itan_hash(&self) -> Option<&[u8]> {
        self.itan_hash.as_deref()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn expected_signer(&self) -> Option<&str> {
        self.expected_signer.as_deref()
    }

    pub fn expected_crypter(&self) -> Option<&str> {
        self.expected_crypter.as_deref()
    }

    /// Encoded message, once [Message::encode] succeeded
    pub fn encoded(&self) -> Option<&[u8]> {
        self.encoded.as_deref()
    }

    /// Encode a job into this message
    ///
    /// On failure the job is moved to [JobStatus::Error].
    pub fn add_job(&mut self, job: &mut Job) -> Result<(), Error> {
        if self.encoded.is_some() {
            return Err(Error::AlreadyEncoded);
        }

        let flags = job.flags();

        if flags.contains(JobFlags::NEED_TAN) {
            self.need_tan = true;
        }

        // Signers must be known before the first job segment
        if flags.contains(JobFlags::SIGN) {
            if job.signers().is_empty() {
                job.set_status(JobStatus::Error);
                return Err(Error::Internal(format!(
                    "job {} requires a signature but has no signers",
                    job.name()
                )));
            }
            for s in job.signers().to_vec() {
                if let Err(e) = self.add_signer(&s) {
                    job.set_status(JobStatus::Error);
                    return Err(e);
                }
            }
        }

        if flags.contains(JobFlags::CRYPT) {
            self.crypter = Some(job.user().to_string());
        }

        let first = self.next_segment;

        let (segment, data) = match job.build_segment(first).and_then(|s| {
            let d = s.to_vec()?;
            Ok((s, d))
        }) {
            Ok(v) => v,
            Err(e) => {
                job.log(log::Level::Error, &format!("Unable to encode job: {e}"));
                job.set_status(JobStatus::Error);
                return Err(Error::Internal(format!("encoding job {}: {e}", job.name())));
            }
        };

        // Order hash over the first job only
        if self.segments.is_empty() && !flags.contains(JobFlags::NO_ITAN) {
            match itan_hash(self.itan_hash_mode, &data) {
                Ok(h) => self.itan_hash = Some(h),
                Err(e) => {
                    job.set_status(JobStatus::Error);
                    return Err(e);
                }
            }
        }

        trace!("Encoded job {}: {}", job.name(), String::from_utf8_lossy(&data));

        self.segments.push(segment);
        self.next_segment += 1;

        job.set_segments(first, first);
        job.set_message_info(self.msg_num, &self.dialog_id);
        job.set_status(JobStatus::Encoded);

        Ok(())
    }

    /// Sign, encrypt and frame the message
    pub fn encode(&mut self, crypt: &Crypt) -> Result<&[u8], Error> {
        if self.encoded.is_some() {
            return Err(Error::AlreadyEncoded);
        }

        let tan = match (self.need_tan, &self.tan) {
            (true, None) => {
                return Err(Error::Internal("message requires a TAN".to_string()))
            }
            (true, Some(t)) if self.signers.is_empty() => {
                debug!("TAN of length {} has no signer to carry it", t.len());
                return Err(Error::Internal("TAN requires a signer".to_string()));
            }
            (true, Some(t)) => Some(t.as_str()),
            (false, _) => None,
        };

        let mut jobs = Vec::new();
        for s in &self.segments {
            jobs.extend_from_slice(&s.to_vec()?);
        }

        // Signature heads, numbered 2..
        let heads = self
            .signers
            .iter()
            .enumerate()
            .map(|(i, signer)| {
                let mut s = Segment::new(HNSHK, 4).with_number(2 + i as u32);
                s.push_deg(&[self.security_function.to_string().as_bytes()]);
                s.push_deg(&[self.control_ref(i).as_bytes()]);
                s.push_deg(&[signer.as_bytes()]);
                s.to_vec()
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Each signer covers its own head, inner heads and the job segments
        let mut tails = Vec::new();
        let mut next = self.next_segment;
        let mut expected_signer = None;

        for (i, signer) in self.signers.iter().enumerate().rev() {
            let mut data = heads[i..].concat();
            data.extend_from_slice(&jobs);

            let sig = crypt.sign(&SignRequest {
                data: &data,
                signer,
                tan: if i == 0 { tan } else { None },
            })?;

            if expected_signer.is_none() {
                expected_signer = sig.expected_signer.clone();
            }

            let mut s = Segment::new(HNSHA, 2).with_number(next);
            s.push_deg(&[self.control_ref(i).as_bytes()]);
            s.push_binary(&sig.value);
            if let (0, Some(t)) = (i, tan) {
                s.push_deg(&[b"", t.as_bytes()]);
            }
            tails.push(s.to_vec()?);
            next += 1;
        }

        let mut body = heads.concat();
        body.extend_from_slice(&jobs);
        body.extend_from_slice(&tails.concat());

        // Encryption envelope
        let mut expected_crypter = None;
        if let Some(c) = &self.crypter {
            let enc = crypt.encrypt(c, &body)?;

            let mut head = Segment::new(HNVSK, 3).with_number(HNVSK_NUM);
            head.push_deg(&[enc.key_name.as_bytes()]);

            let mut payload = Segment::new(HNVSD, 1).with_number(HNVSD_NUM);
            payload.push_binary(&enc.data);

            body = head.to_vec()?;
            body.extend_from_slice(&payload.to_vec()?);
            expected_crypter = enc.expected_crypter;
        }

        let mut trailer = Segment::new(HNHBS, 1).with_number(next);
        trailer.push_deg(&[self.msg_num.to_string().as_bytes()]);
        let trailer = trailer.to_vec()?;

        // Header size is fixed width, compute it with a placeholder first
        let header_len = self.header(0).encode_len()?;
        let size = header_len + body.len() + trailer.len();

        let mut buff = self.header(size).to_vec()?;
        buff.extend_from_slice(&body);
        buff.extend_from_slice(&trailer);

        debug!(
            "Encoded message {} ({} bytes, {} segments, {} signers)",
            self.msg_num,
            buff.len(),
            self.segments.len(),
            self.signers.len()
        );

        self.expected_signer = expected_signer;
        self.expected_crypter = expected_crypter;

        Ok(self.encoded.insert(buff))
    }

    /// Parse, decrypt and verify a response to this message
    pub fn decode_response(&self, data: &[u8], crypt: &Crypt) -> Result<Response, Error> {
        let mut r = Response::parse(data)?;

        if r.is_encrypted() {
            crypt.decrypt(&mut r)?;
        }
        if r.is_signed() {
            crypt.verify(&mut r)?;
        }

        Ok(r)
    }

    fn header(&self, size: usize) -> Segment {
        let mut s = Segment::new(HNHBK, 3).with_number(1);
        let size = format!("{:0width$}", size, width = SIZE_DIGITS);

        s.push_deg(&[size.as_bytes()]);
        s.push_deg(&[self.hbci_version.to_string().as_bytes()]);
        s.push_deg(&[self.dialog_id.as_bytes()]);
        s.push_deg(&[self.msg_num.to_string().as_bytes()]);
        s
    }

    fn control_ref(&self, signer: usize) -> String {
        format!("{}{:02}", self.msg_num, signer + 1)
    }
}

/// Compute the iTAN order hash for the provided mode
pub fn itan_hash(mode: u32, data: &[u8]) -> Result<Vec<u8>, Error> {
    match mode {
        0 | 1 => Ok(Ripemd160::digest(data).to_vec()),
        2 => Ok(Sha1::digest(data).to_vec()),
        _ => Err(Error::NotSupported(format!("iTAN hash mode {mode}"))),
    }
}

/// Parsed response message
#[derive(Clone, Debug, Default)]
pub struct Response {
    /// Dialog id assigned by the bank
    pub dialog_id: String,
    /// Message number of the response
    pub msg_num: u32,
    /// Message number of the request this answers
    pub ref_msg_num: Option<u32>,
    pub segments: Vec<Segment>,
    /// Signers / crypter found by the crypt engine
    pub security: Security,
}

impl Response {
    /// Parse a response message, without decrypting or verifying it
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let segments = decode_all(data)?;

        let head = match segments.first() {
            Some(s) if s.code == HNHBK => s,
            _ => return Err(Error::BadData("response without message header".to_string())),
        };

        let dialog_id = head.text(2, 0).unwrap_or("0").to_string();
        let msg_num = head
            .text(3, 0)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| Error::BadData("invalid message number".to_string()))?;
        let ref_msg_num = head.text(4, 1).and_then(|v| v.parse().ok());

        Ok(Self {
            dialog_id,
            msg_num,
            ref_msg_num,
            segments,
            security: Security::default(),
        })
    }

    /// Number of the request this response answers
    pub fn request_num(&self) -> u32 {
        self.ref_msg_num.unwrap_or(self.msg_num)
    }

    /// Find the first segment with the provided code
    pub fn find(&self, code: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.code == code)
    }

    pub fn is_signed(&self) -> bool {
        self.find(HNSHK).is_some()
    }

    pub fn is_encrypted(&self) -> bool {
        self.find(HNVSD).is_some()
    }

    /// Encrypted payload of an encrypted response
    pub fn encrypted_payload(&self) -> Option<&[u8]> {
        self.find(HNVSD).and_then(|s| s.value(0, 0))
    }

    /// Key name of the encryption head
    pub fn crypt_key_name(&self) -> Option<&str> {
        self.find(HNVSK).and_then(|s| s.text(0, 0))
    }

    /// Replace the encryption envelope with decrypted segments
    pub fn replace_payload(&mut self, data: &[u8]) -> Result<(), Error> {
        let inner = decode_all(data)?;

        let pos = self
            .segments
            .iter()
            .position(|s| s.code == HNVSK || s.code == HNVSD)
            .ok_or_else(|| Error::BadData("response not encrypted".to_string()))?;

        self.segments.retain(|s| s.code != HNVSK && s.code != HNVSD);
        let tail = self.segments.split_off(pos);
        self.segments.extend(inner);
        self.segments.extend(tail);

        Ok(())
    }

    /// Signature heads, as `(control reference, signer)`
    pub fn signature_heads(&self) -> impl Iterator<Item = (&str, &str)> {
        self.segments
            .iter()
            .filter(|s| s.code == HNSHK)
            .map(|s| (s.text(1, 0).unwrap_or(""), s.text(2, 0).unwrap_or("")))
    }

    /// Signature value for a control reference
    pub fn signature(&self, control_ref: &str) -> Option<&[u8]> {
        self.segments
            .iter()
            .filter(|s| s.code == HNSHA)
            .find(|s| s.text(0, 0) == Some(control_ref))
            .and_then(|s| s.value(1, 0))
    }

    /// Segments excluding the message and security envelopes
    pub fn payload(&self) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(|s| ![HNHBK, HNHBS, HNSHK, HNSHA, HNVSK, HNVSD].contains(&s.code.as_str()))
    }
}
