// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Outbox / dialog controller
//!
//! The [Outbox] owns one dialog with the bank. Queued jobs are sent in
//! rounds until no job requests a further message, queues containing jobs
//! that require a TAN are sent via the [ItanState] exchange.

use std::sync::Arc;

use log::{debug, info};

use hbci_core::{
    crypt::{Crypt, CryptEngines},
    job::{Job, JobFlags, JobHandle, SignatureCheck},
    message::{Message, Response},
    params::ParamStore,
    queue::JobQueue,
    tan::{new_tan_job, TanMethod},
    template::TemplateProvider,
    user::{Account, User, UserFlags},
};
use hbci_proto::{
    result::MSG_RESULTS,
    tan::{TanJobProcess, ONE_STEP_FUNCTION},
    JobStatus,
};

use crate::{
    ConfigStore, Error, Interaction, OutboxConfig, Phase, Transport, UNSIGNED_CHOICES,
};

mod itan;
pub use itan::ItanState;
use itan::ItanFlow;

/// External collaborators used by the outbox
#[derive(Clone)]
pub struct Services {
    pub templates: Arc<dyn TemplateProvider + Send + Sync>,
    pub params: Arc<dyn ParamStore + Send + Sync>,
    pub ui: Arc<dyn Interaction>,
    pub store: Arc<dyn ConfigStore>,
}

/// Dialog state
#[derive(Clone, Debug)]
struct Dialog {
    /// Dialog id, `0` until assigned by the bank
    id: String,
    /// Number of the last message sent
    msg_num: u32,
    /// TAN method selected for this dialog
    tan_method: Option<TanMethod>,
}

impl Default for Dialog {
    fn default() -> Self {
        Self {
            id: "0".to_string(),
            msg_num: 0,
            tan_method: None,
        }
    }
}

/// Outbox for one user / dialog
pub struct Outbox<T: Transport> {
    t: T,
    user: User,
    crypt: Crypt,
    services: Services,
    dialog: Dialog,
    config: OutboxConfig,
    next_job_id: u32,
}

impl<T: Transport> Outbox<T> {
    /// Create a new outbox, selecting the crypt engine for the user
    pub fn new(
        t: T,
        user: User,
        engines: &CryptEngines,
        services: Services,
        config: OutboxConfig,
    ) -> Self {
        let crypt = Crypt::for_user(&user, engines);

        Self {
            t,
            user,
            crypt,
            services,
            dialog: Dialog::default(),
            config,
            next_job_id: 1,
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// Dialog id assigned by the bank
    pub fn dialog_id(&self) -> &str {
        &self.dialog.id
    }

    /// TAN method selected for this dialog
    pub fn tan_method(&self) -> Option<&TanMethod> {
        self.dialog.tan_method.as_ref()
    }

    /// Fetch the underlying transport
    pub fn transport(&self) -> &T {
        &self.t
    }

    /// Create a job for this user
    pub fn job(
        &mut self,
        name: &str,
        account: Option<&Account>,
        version: u32,
    ) -> Result<JobHandle, Error> {
        let mut j = Job::new(
            name,
            &self.user,
            account,
            version,
            self.services.templates.as_ref(),
            self.services.params.as_ref(),
        )?;

        self.init_job(&mut j);

        Ok(JobHandle::new(j))
    }

    /// Create a TAN job on behalf of `origin`
    pub(crate) fn tan_job(
        &mut self,
        process: TanJobProcess,
        method: &TanMethod,
        origin: &JobHandle,
    ) -> Result<JobHandle, Error> {
        let mut j = new_tan_job(
            &self.user,
            self.services.templates.as_ref(),
            self.services.params.as_ref(),
            process,
            method,
        )?;

        self.init_job(&mut j);

        let o = origin.lock();
        for s in o.signers() {
            j.add_signer(s);
        }
        j.set_tan_segcode(o.code());

        Ok(JobHandle::new(j))
    }

    fn init_job(&mut self, j: &mut Job) {
        j.set_id(self.next_job_id);
        self.next_job_id += 1;

        if j.flags().contains(JobFlags::SIGN) {
            j.add_signer(&self.user.user_id);
        }
    }

    /// Execute a queue of jobs
    ///
    /// Rounds are sent until no job requests another message. TAN jobs
    /// added during the exchange are not added to `queue`.
    pub async fn execute(&mut self, queue: &JobQueue) -> Result<(), Error> {
        let mut round = JobQueue::from_queue(queue);

        loop {
            self.send_round(&mut round).await?;

            let mut next = JobQueue::new();
            for j in round.jobs() {
                let more = {
                    let mut j = j.lock();
                    !j.flags().contains(JobFlags::TAN_JOB) && j.prepare_next_message()
                };
                if more {
                    next.add_aux_job(j);
                }
            }

            if next.is_empty() {
                break;
            }

            debug!("Sending continuation round for {} jobs", next.len());
            round = next;
        }

        Ok(())
    }

    async fn send_round(&mut self, queue: &mut JobQueue) -> Result<(), Error> {
        if queue.needs_tan() {
            return ItanFlow::new(queue)?.run(self).await;
        }

        let mut msg = self.new_message(ONE_STEP_FUNCTION);
        for j in queue.jobs() {
            Self::encode_job(&mut msg, j)?;
        }

        self.send_message(&mut msg, queue.jobs()).await?;
        self.receive_queue(&msg, queue).await
    }

    /// Start a new message in this dialog
    pub(crate) fn new_message(&mut self, security_function: u32) -> Message {
        self.dialog.msg_num += 1;

        Message::new(self.config.hbci_version, &self.dialog.id, self.dialog.msg_num)
            .with_itan_hash_mode(self.config.itan_hash_mode)
            .with_security_function(security_function)
    }

    /// Encode a job into a message
    pub(crate) fn encode_job(msg: &mut Message, job: &JobHandle) -> Result<(), Error> {
        let mut j = job.lock();
        msg.add_job(&mut j)
            .map_err(|e| Error::from(e).in_job(&j, Phase::Encode))
    }

    /// Encode and send a message containing `jobs`
    pub(crate) async fn send_message(
        &mut self,
        msg: &mut Message,
        jobs: &[JobHandle],
    ) -> Result<(), Error> {
        let data = match msg.encode(&self.crypt).map(|d| d.to_vec()) {
            Ok(d) => d,
            Err(e) => return Err(Self::fail_jobs(msg, jobs, e.into(), Phase::Encode)),
        };

        for j in Self::message_jobs(msg.msg_num(), jobs) {
            let mut j = j.lock();
            j.set_expected_signer(msg.expected_signer());
            j.set_expected_crypter(msg.expected_crypter());
        }

        debug!("Sending message {} ({} bytes)", msg.msg_num(), data.len());

        if let Err(e) = self.t.send(&data).await {
            let e = Error::Transport(anyhow::Error::new(e));
            return Err(Self::fail_jobs(msg, jobs, e, Phase::Send));
        }

        for j in Self::message_jobs(msg.msg_num(), jobs) {
            j.lock().set_status(JobStatus::Sent);
        }

        Ok(())
    }

    /// Receive the response to `msg`, dispatching segments to the jobs in
    /// `queue` encoded into that message
    pub(crate) async fn receive_queue(
        &mut self,
        msg: &Message,
        queue: &JobQueue,
    ) -> Result<(), Error> {
        let resp = match self.receive_response(msg).await {
            Ok(r) => r,
            Err(e) => return Err(Self::fail_jobs(msg, queue.jobs(), e, Phase::Receive)),
        };

        if self.dialog.id == "0" && resp.dialog_id != "0" {
            info!("Dialog id assigned: {}", resp.dialog_id);
            self.dialog.id = resp.dialog_id.clone();
        }

        let num = resp.request_num();
        let jobs: Vec<_> = Self::message_jobs(num, queue.jobs()).cloned().collect();
        if jobs.is_empty() {
            return Err(
                hbci_core::Error::BadData(format!("response to unknown message {num}")).into(),
            );
        }

        Self::dispatch(&resp, num, &jobs);

        for j in &jobs {
            self.check_security(j, &resp).await?;

            let mut j = j.lock();
            j.set_status(JobStatus::Answered);
            j.sample_results();
        }

        Ok(())
    }

    async fn receive_response(&mut self, msg: &Message) -> Result<Response, Error> {
        let data = tokio::time::timeout(self.config.request_timeout(), self.t.receive())
            .await?
            .map_err(|e| Error::Transport(anyhow::Error::new(e)))?;

        debug!("Received response to message {} ({} bytes)", msg.msg_num(), data.len());

        Ok(msg.decode_response(&data, &self.crypt)?)
    }

    /// Route response segments to their jobs by segment reference,
    /// message results go to every job of the message
    fn dispatch(resp: &Response, num: u32, jobs: &[JobHandle]) {
        for s in resp.payload() {
            match s.reference {
                Some(r) => {
                    match jobs.iter().find(|j| j.lock().owns_segment(num, r)) {
                        Some(j) => j.lock().add_response(s.clone()),
                        None => debug!(
                            "Unassigned response segment {}:{} (ref {})",
                            s.code, s.number, r
                        ),
                    }
                }
                None if s.code == MSG_RESULTS => {
                    for j in jobs {
                        j.lock().add_response(s.clone());
                    }
                }
                None => debug!("Ignoring unreferenced segment {}:{}", s.code, s.number),
            }
        }
    }

    /// Check response encryption and signatures for a job
    async fn check_security(&mut self, job: &JobHandle, resp: &Response) -> Result<(), Error> {
        let check = {
            let mut j = job.lock();
            let r = j
                .check_encryption(&resp.security)
                .and_then(|_| j.check_signature(&resp.security, self.user.flags));

            match r {
                Ok(c) => c,
                Err(e) => {
                    let e = Error::from(e).in_job(&j, Phase::Receive);
                    j.set_status(JobStatus::Error);
                    return Err(e);
                }
            }
        };

        if check == SignatureCheck::NeedsConfirmation {
            let name = job.lock().name().to_string();
            let text = format!(
                "The response to job {name} is not signed by the bank. \
                 Accept it anyway?"
            );

            let choice = self
                .services
                .ui
                .confirm("Unsigned response", &text, &UNSIGNED_CHOICES)
                .await;

            match choice {
                Some(0) => job.lock().accept_unsigned(false),
                Some(1) => {
                    self.persist_unsigned_override()?;
                    job.lock().accept_unsigned(true);
                }
                _ => {
                    let mut j = job.lock();
                    j.log(log::Level::Error, "Unsigned response rejected by user");
                    j.set_status(JobStatus::Error);

                    let e = hbci_core::Error::Security("unsigned response rejected".to_string());
                    return Err(Error::from(e).in_job(&j, Phase::Receive));
                }
            }
        }

        Ok(())
    }

    /// Accept unsigned responses for this user from now on
    fn persist_unsigned_override(&mut self) -> Result<(), Error> {
        let store = self.services.store.clone();

        store.lock_user(&self.user).map_err(Error::Config)?;

        self.user.flags |= UserFlags::BANK_DOESNT_SIGN;
        let saved = store.save_user(&self.user);

        let unlocked = store.unlock_user(&self.user);
        saved.and(unlocked).map_err(Error::Config)
    }

    /// Jobs of `jobs` encoded into message `num`
    fn message_jobs(num: u32, jobs: &[JobHandle]) -> impl Iterator<Item = &JobHandle> {
        jobs.iter().filter(move |j| {
            let j = j.lock();
            j.msg_num() == num && j.first_segment() != 0
        })
    }

    /// Mark the jobs of a failed message and attach job context
    fn fail_jobs(msg: &Message, jobs: &[JobHandle], e: Error, phase: Phase) -> Error {
        let mut first = None;

        for j in Self::message_jobs(msg.msg_num(), jobs) {
            j.lock().set_status(JobStatus::Error);
            first.get_or_insert_with(|| j.clone());
        }

        match first {
            Some(j) => e.in_job(&j.lock(), phase),
            None => e,
        }
    }

    /// Select the TAN method for this dialog
    pub(crate) fn select_tan_method(&mut self) -> Result<TanMethod, Error> {
        if let Some(m) = &self.dialog.tan_method {
            return Ok(m.clone());
        }

        let m = hbci_core::tan::select_tan_method(&self.user)?;
        if !m.is_one_step() {
            self.user.selected_tan_method = Some(m.id());
        }

        info!("Selected TAN method {} ({})", m.function, m.method_name);
        self.dialog.tan_method = Some(m.clone());

        Ok(m)
    }

    pub(crate) fn ui(&self) -> Arc<dyn Interaction> {
        self.services.ui.clone()
    }
}
