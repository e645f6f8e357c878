// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Simulated bank
//!
//! [BankSim] implements [Transport], answering each request with a
//! response message built from the request segments. TAN requests are
//! answered according to the configured challenge and expected TAN.

use std::{collections::VecDeque, io, sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, trace};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use hbci::Transport;
use hbci_core::message::{
    Response, HNHBK, HNHBS, HNSHA, HNSHK, HNVSD, HNVSK, HNVSD_NUM, HNVSK_NUM, SIZE_DIGITS,
};
use hbci_proto::{
    result::{MSG_RESULTS, SEG_RESULTS},
    tan::{TAN_REQUEST, TAN_RESPONSE},
    Segment,
};

/// Dialog id assigned by the simulated bank
pub const DIALOG_ID: &str = "dlg-1";
/// Key / signer name used by the simulated bank
pub const BANK_KEY: &str = "bank";
/// Order reference returned with challenges
pub const ORDER_REFERENCE: &str = "ref-0001";

/// Simulated bank behaviour
#[derive(Clone, Debug)]
pub struct BankConfig {
    /// Challenge returned for two-step TAN requests, `None` omits it
    pub challenge: Option<String>,
    /// TAN accepted by the bank
    pub tan: String,
    /// Sign responses
    pub sign: bool,
    /// Number of rounds answered with an attach point
    pub attach_rounds: usize,
    /// Answer requests at all
    pub respond: bool,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            challenge: Some("12345-ABC".to_string()),
            tan: "999999".to_string(),
            sign: true,
            attach_rounds: 0,
            respond: true,
        }
    }
}

/// Request received by the simulated bank
#[derive(Clone, Debug)]
pub struct Request {
    pub msg_num: u32,
    pub dialog_id: String,
    /// Job segments, excluding message and security envelopes
    pub segments: Vec<Segment>,
    /// TAN carried in the first signature tail
    pub tan: Option<String>,
    pub encrypted: bool,
}

impl Request {
    /// Segment codes in message order
    pub fn codes(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.code.as_str()).collect()
    }

    pub fn find(&self, code: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.code == code)
    }
}

struct State {
    config: BankConfig,
    requests: Vec<Request>,
    pending: VecDeque<Vec<u8>>,
    msg_num: u32,
    attach_sent: usize,
}

/// Simulated bank transport
#[derive(Clone)]
pub struct BankSim {
    state: Arc<Mutex<State>>,
}

impl BankSim {
    pub fn new(config: BankConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                config,
                requests: Vec::new(),
                pending: VecDeque::new(),
                msg_num: 0,
                attach_sent: 0,
            })),
        }
    }

    /// Fetch the requests received so far
    pub async fn requests(&self) -> Vec<Request> {
        self.state.lock().await.requests.clone()
    }
}

#[async_trait]
impl Transport for BankSim {
    type Error = io::Error;

    async fn send(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        trace!("bank rx: {}", String::from_utf8_lossy(data));

        let mut s = self.state.lock().await;

        let resp = s
            .handle(data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if s.config.respond {
            s.pending.push_back(resp);
        }

        Ok(())
    }

    async fn receive(&mut self) -> Result<Vec<u8>, Self::Error> {
        let next = self.state.lock().await.pending.pop_front();

        match next {
            Some(r) => Ok(r),
            None => {
                // Never answer, leaving the timeout to the caller
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(io::Error::new(io::ErrorKind::TimedOut, "no response"))
            }
        }
    }
}

impl State {
    fn handle(&mut self, data: &[u8]) -> Result<Vec<u8>, hbci_core::Error> {
        let mut req = Response::parse(data)?;

        let encrypted = req.is_encrypted();
        if let Some(p) = req.encrypted_payload().map(|p| p.to_vec()) {
            req.replace_payload(&p)?;
        }

        let tan = req
            .segments
            .iter()
            .filter(|s| s.code == HNSHA)
            .find_map(|s| s.text(2, 1))
            .map(String::from);

        let request = Request {
            msg_num: req.msg_num,
            dialog_id: req.dialog_id.clone(),
            segments: req.payload().cloned().collect(),
            tan,
            encrypted,
        };

        debug!(
            "bank: message {} ({:?}, TAN: {})",
            request.msg_num,
            request.codes(),
            request.tan.is_some()
        );

        let mut segments = vec![results(MSG_RESULTS, None, &[("0010", "Message received", None)])];
        segments.extend(self.answer(&request));

        self.msg_num += 1;
        let resp = self.frame(request.msg_num, segments, encrypted)?;

        self.requests.push(request);

        Ok(resp)
    }

    /// Build the answer segments for a request
    fn answer(&mut self, req: &Request) -> Vec<Segment> {
        let challenge_request = req
            .segments
            .iter()
            .any(|s| s.code == TAN_REQUEST && s.text(0, 0) == Some("4"));

        let mut out = Vec::new();

        for s in &req.segments {
            let reference = s.number;

            match (s.code.as_str(), s.text(0, 0)) {
                (TAN_REQUEST, Some("4")) => {
                    out.push(results(
                        SEG_RESULTS,
                        Some(reference),
                        &[("0030", "Order received, TAN required", None)],
                    ));

                    let mut t = Segment::new(TAN_RESPONSE, s.version).with_reference(reference);
                    t.push_deg(&[b"4"]);
                    t.push_deg(&[b""]);
                    t.push_deg(&[ORDER_REFERENCE.as_bytes()]);
                    if let Some(c) = &self.config.challenge {
                        t.push_deg(&[c.as_bytes()]);
                    }
                    out.push(t);
                }
                (TAN_REQUEST, Some("2")) => {
                    let r = match s.text(3, 0) == Some(ORDER_REFERENCE) {
                        true => self.check_tan(req),
                        false => ("9210", "Unknown order reference"),
                    };
                    out.push(results(SEG_RESULTS, Some(reference), &[(r.0, r.1, None)]));
                }
                (TAN_REQUEST, _) => {
                    let r = self.check_tan(req);
                    out.push(results(SEG_RESULTS, Some(reference), &[(r.0, r.1, None)]));
                }
                // Orders are executed once the TAN is submitted
                _ if challenge_request => (),
                ("HKEND", _) => {
                    out.push(results(
                        SEG_RESULTS,
                        Some(reference),
                        &[("0100", "Dialog ended", None)],
                    ));
                }
                _ => out.extend(self.execute(req, s)),
            }
        }

        out
    }

    fn check_tan(&self, req: &Request) -> (&'static str, &'static str) {
        match req.tan.as_deref() {
            Some(t) if t == self.config.tan => ("0020", "Order executed"),
            Some(_) => ("9941", "TAN invalid"),
            None => ("9931", "TAN missing"),
        }
    }

    /// Execute an order, returning results and a data segment
    fn execute(&mut self, req: &Request, s: &Segment) -> Vec<Segment> {
        let r = match req.tan {
            Some(_) => self.check_tan(req),
            None => ("0020", "Order executed"),
        };

        let status = match (r.0, self.attach_sent < self.config.attach_rounds) {
            ("0020", true) => {
                self.attach_sent += 1;
                let point = format!("cont-{}", self.attach_sent);
                results(
                    SEG_RESULTS,
                    Some(s.number),
                    &[("3040", "More data available", Some(point.as_str()))],
                )
            }
            (code, _) => results(SEG_RESULTS, Some(s.number), &[(code, r.1, None)]),
        };

        let code = format!("HI{}", s.code.get(2..).unwrap_or_default());
        let mut data = Segment::new(&code, s.version).with_reference(s.number);
        data.push_deg(&[format!("data-{}", req.msg_num).as_bytes()]);

        vec![status, data]
    }

    /// Sign, encrypt and frame response segments
    fn frame(
        &self,
        ref_msg_num: u32,
        segments: Vec<Segment>,
        encrypt: bool,
    ) -> Result<Vec<u8>, hbci_core::Error> {
        let ctrl_ref = format!("{}01", self.msg_num);
        let mut next = 2;

        let mut body = Vec::new();

        if self.config.sign {
            let mut head = Segment::new(HNSHK, 4).with_number(next);
            head.push_deg(&[b"1"]);
            head.push_deg(&[ctrl_ref.as_bytes()]);
            head.push_deg(&[BANK_KEY.as_bytes()]);
            body.extend_from_slice(&head.to_vec()?);
            next += 1;
        }

        for mut s in segments {
            s.number = next;
            body.extend_from_slice(&s.to_vec()?);
            next += 1;
        }

        if self.config.sign {
            let mut tail = Segment::new(HNSHA, 2).with_number(next);
            tail.push_deg(&[ctrl_ref.as_bytes()]);
            tail.push_binary(&Sha256::digest(&body));
            body.extend_from_slice(&tail.to_vec()?);
            next += 1;
        }

        if encrypt {
            let mut head = Segment::new(HNVSK, 3).with_number(HNVSK_NUM);
            head.push_deg(&[BANK_KEY.as_bytes()]);

            let mut payload = Segment::new(HNVSD, 1).with_number(HNVSD_NUM);
            payload.push_binary(&body);

            body = head.to_vec()?;
            body.extend_from_slice(&payload.to_vec()?);
        }

        let mut trailer = Segment::new(HNHBS, 1).with_number(next);
        trailer.push_deg(&[self.msg_num.to_string().as_bytes()]);
        let trailer = trailer.to_vec()?;

        let header_len = self.header(0, ref_msg_num).to_vec()?.len();
        let size = header_len + body.len() + trailer.len();

        let mut buff = self.header(size, ref_msg_num).to_vec()?;
        buff.extend_from_slice(&body);
        buff.extend_from_slice(&trailer);

        trace!("bank tx: {}", String::from_utf8_lossy(&buff));

        Ok(buff)
    }

    fn header(&self, size: usize, ref_msg_num: u32) -> Segment {
        let size = format!("{:0width$}", size, width = SIZE_DIGITS);

        let mut s = Segment::new(HNHBK, 3).with_number(1);
        s.push_deg(&[size.as_bytes()]);
        s.push_deg(&[b"300"]);
        s.push_deg(&[DIALOG_ID.as_bytes()]);
        s.push_deg(&[self.msg_num.to_string().as_bytes()]);
        s.push_deg(&[DIALOG_ID.as_bytes(), ref_msg_num.to_string().as_bytes()]);
        s
    }
}

/// Build a result segment, entries are `(code, text, param)`
fn results(code: &str, reference: Option<u32>, entries: &[(&str, &str, Option<&str>)]) -> Segment {
    let mut s = Segment::new(code, 2);
    if let Some(r) = reference {
        s = s.with_reference(r);
    }

    for (c, text, param) in entries {
        match param {
            Some(p) => s.push_deg(&[c.as_bytes(), b"", text.as_bytes(), p.as_bytes()]),
            None => s.push_deg(&[c.as_bytes(), b"", text.as_bytes()]),
        };
    }

    s
}
