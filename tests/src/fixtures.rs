// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Templates, parameters, users and collaborators for dialog tests

use std::{
    collections::VecDeque,
    str::FromStr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use log::{debug, LevelFilter};
use sha2::{Digest, Sha256};

use hbci::{ConfigStore, Interaction, Outbox, OutboxConfig, Services};
use hbci_core::{
    crypt::{CryptEngine, CryptEngines, Encrypted, SignRequest, Signature},
    job::JobHandle,
    message::Response,
    params::{BankParams, ParamSet},
    tan::{TanMethod, TAN_JOB},
    template::{JobTemplate, TemplateFlags, TemplateSet},
    user::User,
};
use hbci_proto::{CryptMode, Element, ElementTree};

use crate::bank::{BankSim, BANK_KEY};

pub const BALANCE: &str = "JobGetBalance";
pub const END_DIALOG: &str = "JobEndDialog";

/// Two-step method with challenge
pub const MOBILE_TAN: u32 = 942;
/// One-step method with order hash
pub const INDEXED_TAN: u32 = 900;

/// Setup logging, level from `LOG_LEVEL` (defaults to debug)
pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = simplelog::SimpleLogger::init(log_level, simplelog::Config::default());
}

/// Group definitions, account id (`ktv`) version 1
fn groups() -> ElementTree {
    let mut t = ElementTree::new();
    let root = t.root();

    let ktv = t.add_child(root, Element::group("ktv", "", 1));
    t.add_child(ktv, Element::de("number"));
    t.add_child(ktv, Element::de("country"));
    t.add_child(ktv, Element::de("bank"));

    t
}

fn optional_des(names: &[&str]) -> ElementTree {
    let mut t = ElementTree::new();
    let root = t.root();
    for n in names {
        t.add_child(root, Element::de(n).with_bounds(0, 1));
    }
    t
}

pub fn templates() -> TemplateSet {
    let mut balance = ElementTree::new();
    let root = balance.root();
    balance.add_child(root, Element::group("acc", "ktv", 1));
    balance.add_child(root, Element::de("attach").with_bounds(0, 1));

    let mut tan = ElementTree::new();
    let root = tan.root();
    tan.add_child(root, Element::de("process"));
    tan.add_child(root, Element::de("segcode").with_bounds(0, 1));
    tan.add_child(root, Element::de("orderhash").with_bounds(0, 1).binary());
    tan.add_child(root, Element::de("reference").with_bounds(0, 1));
    tan.add_child(root, Element::de("moretans").with_bounds(0, 1));
    tan.add_child(root, Element::de("medium").with_bounds(0, 1));

    TemplateSet::new(groups())
        .with_job(
            JobTemplate::new(BALANCE, "HKSAL", 5)
                .with_flags(
                    TemplateFlags::SIGN
                        | TemplateFlags::CRYPT
                        | TemplateFlags::NEED_BPD
                        | TemplateFlags::ATTACHABLE,
                )
                .with_params("SaldoParams")
                .with_response("BalanceResponse")
                .with_segment(balance),
        )
        .with_job(
            JobTemplate::new(TAN_JOB, "HKTAN", 6)
                .with_flags(TemplateFlags::SIGN | TemplateFlags::CRYPT | TemplateFlags::NO_ITAN)
                .with_segment(tan),
        )
        .with_job(
            JobTemplate::new(END_DIALOG, "HKEND", 1)
                .with_flags(TemplateFlags::DLG | TemplateFlags::SIGN | TemplateFlags::CRYPT)
                .with_segment(optional_des(&["dialogid"])),
        )
}

pub fn params() -> BankParams {
    BankParams::default()
        .with_job("SaldoParams", ParamSet::new(5).with("minsigs", "1"))
        .with_tan_required("HKSAL", true)
}

fn method(function: u32, process: u8, name: &str) -> TanMethod {
    TanMethod {
        function,
        job_version: 6,
        process,
        method_id: format!("M{function}"),
        method_name: name.to_string(),
    }
}

/// Key file user, no TAN required
pub fn rdh_user() -> User {
    User::new("user", "customer", "10020030", CryptMode::Rdh)
}

/// PIN/TAN user with the provided methods available
///
/// The bank advertises a two-step mobile TAN and a one-step indexed TAN.
pub fn pintan_user(available: &[u32]) -> User {
    let mut u = User::new("user", "customer", "10020030", CryptMode::PinTan);

    u.tan_methods = available.to_vec();
    u.tan_method_descriptions = vec![
        method(MOBILE_TAN, 2, "mobileTAN"),
        method(INDEXED_TAN, 1, "iTAN"),
    ];
    u.tan_medium_id = Some("phone".to_string());

    u
}

/// Crypt engine with plain payloads and digest signatures
pub struct PlainEngine;

impl PlainEngine {
    pub fn shared() -> Arc<dyn CryptEngine> {
        Arc::new(PlainEngine)
    }
}

impl CryptEngine for PlainEngine {
    fn sign(&self, req: &SignRequest) -> Result<Signature, hbci_core::Error> {
        let mut h = Sha256::new();
        h.update(req.data);
        if let Some(t) = req.tan {
            h.update(t.as_bytes());
        }

        Ok(Signature {
            value: h.finalize().to_vec(),
            expected_signer: Some(BANK_KEY.to_string()),
        })
    }

    fn encrypt(&self, crypter: &str, data: &[u8]) -> Result<Encrypted, hbci_core::Error> {
        Ok(Encrypted {
            key_name: crypter.to_string(),
            data: data.to_vec(),
            expected_crypter: Some(BANK_KEY.to_string()),
        })
    }

    fn decrypt(&self, resp: &mut Response) -> Result<(), hbci_core::Error> {
        let key = resp.crypt_key_name().map(String::from);

        let payload = resp
            .encrypted_payload()
            .map(|p| p.to_vec())
            .ok_or_else(|| hbci_core::Error::BadData("missing encrypted payload".to_string()))?;
        resp.replace_payload(&payload)?;

        resp.security.crypter = key;
        Ok(())
    }

    fn verify(&self, resp: &mut Response) -> Result<(), hbci_core::Error> {
        let signers = resp
            .signature_heads()
            .map(|(ctrl, signer)| match resp.signature(ctrl) {
                Some(_) => signer.to_string(),
                None => format!("?{signer}"),
            })
            .collect();

        resp.security.signers = signers;
        Ok(())
    }
}

#[derive(Default)]
struct UiState {
    tans: VecDeque<Option<String>>,
    choices: VecDeque<Option<usize>>,
    challenges: Vec<Option<String>>,
    confirms: Vec<String>,
}

/// Interaction replaying scripted answers
///
/// Prompts beyond the script are aborted.
#[derive(Clone, Default)]
pub struct ScriptedUi {
    state: Arc<Mutex<UiState>>,
}

impl ScriptedUi {
    pub fn with_tan(self, tan: Option<&str>) -> Self {
        self.lock().tans.push_back(tan.map(String::from));
        self
    }

    pub fn with_choice(self, choice: Option<usize>) -> Self {
        self.lock().choices.push_back(choice);
        self
    }

    /// Challenges shown to the user so far
    pub fn challenges(&self) -> Vec<Option<String>> {
        self.lock().challenges.clone()
    }

    /// Titles of confirmations requested so far
    pub fn confirms(&self) -> Vec<String> {
        self.lock().confirms.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, UiState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl Interaction for ScriptedUi {
    async fn input_tan(&self, challenge: Option<&str>, _hhd: Option<&[u8]>) -> Option<String> {
        let mut s = self.lock();
        s.challenges.push(challenge.map(String::from));

        let tan = s.tans.pop_front().flatten();
        debug!("ui: challenge {:?}, TAN entered: {}", challenge, tan.is_some());
        tan
    }

    async fn confirm(&self, title: &str, text: &str, choices: &[&str]) -> Option<usize> {
        let mut s = self.lock();
        s.confirms.push(title.to_string());

        let choice = s.choices.pop_front().flatten();
        debug!("ui: {} ({}) {:?} -> {:?}", title, text, choices, choice);
        choice
    }
}

#[derive(Default)]
struct StoreState {
    locked: bool,
    saved: Vec<User>,
    calls: Vec<&'static str>,
}

/// In-memory configuration store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    /// Users saved so far
    pub fn saved(&self) -> Vec<User> {
        self.state.lock().unwrap().saved.clone()
    }

    /// Store operations in call order
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl ConfigStore for MemoryStore {
    fn lock_user(&self, user: &User) -> anyhow::Result<()> {
        let mut s = self.state.lock().unwrap();
        s.calls.push("lock");

        if s.locked {
            return Err(anyhow::anyhow!("user {} already locked", user.user_id));
        }
        s.locked = true;

        Ok(())
    }

    fn save_user(&self, user: &User) -> anyhow::Result<()> {
        let mut s = self.state.lock().unwrap();
        s.calls.push("save");

        if !s.locked {
            return Err(anyhow::anyhow!("user {} not locked", user.user_id));
        }
        s.saved.push(user.clone());

        Ok(())
    }

    fn unlock_user(&self, _user: &User) -> anyhow::Result<()> {
        let mut s = self.state.lock().unwrap();
        s.calls.push("unlock");
        s.locked = false;

        Ok(())
    }
}

/// Create an outbox talking to `bank`
pub fn outbox(
    bank: &BankSim,
    user: User,
    ui: &ScriptedUi,
    store: &MemoryStore,
    config: OutboxConfig,
) -> Outbox<BankSim> {
    let engines = CryptEngines::default()
        .with_rdh(PlainEngine::shared())
        .with_pintan(PlainEngine::shared());

    let services = Services {
        templates: Arc::new(templates()),
        params: Arc::new(params()),
        ui: Arc::new(ui.clone()),
        store: Arc::new(store.clone()),
    };

    Outbox::new(bank.clone(), user, &engines, services, config)
}

/// Create a balance request for the test account
pub fn balance(outbox: &mut Outbox<BankSim>) -> anyhow::Result<JobHandle> {
    let j = outbox.job(BALANCE, None, 0)?;

    {
        let mut l = j.lock();
        l.set_argument("acc/number", "1234567");
        l.set_argument("acc/country", "280");
        l.set_argument("acc/bank", "10020030");
    }

    Ok(j)
}
