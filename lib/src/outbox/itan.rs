// Copyright (c) 2022-2023 The MobileCoin Foundation

//! TAN exchange
//!
//! Process 2 (two-step) sends the jobs with a challenge request, prompts
//! the user with the returned challenge and submits the TAN in a second
//! message referencing the order. The second message uses a duplicate of
//! the queue, so the TAN job's results are fanned out to the same jobs the
//! caller holds. Process 1 (one-step) sends the TAN with the jobs.

use log::{debug, info};
use zeroize::Zeroizing;

use hbci_core::{
    job::{JobFlags, JobHandle},
    message::Message,
    queue::{copy_results_to_queue, JobQueue},
    tan::{TanChallenge, TanMethod},
};
use hbci_proto::tan::{TanJobProcess, TanProcess};

use super::Outbox;
use crate::{Error, Phase, Transport};

/// States of the TAN exchange
#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::Display)]
pub enum ItanState {
    SelectMethod,
    SendChallengeRequest,
    AwaitChallenge,
    PromptUser,
    SendTanMessage,
    AwaitResult,
    Dispatch,
    Done,
}

impl ItanState {
    /// Protocol phase for error context
    fn phase(&self) -> Phase {
        match self {
            ItanState::SelectMethod => Phase::SelectMethod,
            ItanState::SendChallengeRequest => Phase::SendChallengeRequest,
            ItanState::AwaitChallenge => Phase::AwaitChallenge,
            ItanState::PromptUser => Phase::PromptUser,
            ItanState::SendTanMessage => Phase::SendTanMessage,
            ItanState::AwaitResult => Phase::AwaitResult,
            ItanState::Dispatch | ItanState::Done => Phase::Dispatch,
        }
    }
}

/// One TAN exchange over a queue
pub(crate) struct ItanFlow<'q> {
    state: ItanState,
    queue: &'q mut JobQueue,
    /// First job requiring a TAN
    origin: JobHandle,

    method: Option<TanMethod>,
    challenge: TanChallenge,
    tan: Option<Zeroizing<String>>,

    /// Challenge request and message
    challenge_job: Option<JobHandle>,
    challenge_msg: Option<Message>,

    /// TAN message, its jobs and the TAN job whose results fan out
    tan_queue: Option<JobQueue>,
    tan_msg: Option<Message>,
    tan_job: Option<JobHandle>,
}

impl<'q> ItanFlow<'q> {
    pub fn new(queue: &'q mut JobQueue) -> Result<Self, Error> {
        let origin = queue
            .jobs()
            .iter()
            .find(|j| j.lock().flags().contains(JobFlags::NEED_TAN))
            .cloned()
            .ok_or_else(|| hbci_core::Error::Internal("no job requires a TAN".to_string()))?;

        Ok(Self {
            state: ItanState::SelectMethod,
            queue,
            origin,
            method: None,
            challenge: TanChallenge::default(),
            tan: None,
            challenge_job: None,
            challenge_msg: None,
            tan_queue: None,
            tan_msg: None,
            tan_job: None,
        })
    }

    /// Run the exchange to completion
    pub async fn run<T: Transport>(mut self, outbox: &mut Outbox<T>) -> Result<(), Error> {
        while self.state != ItanState::Done {
            let state = self.state;

            self.state = match self.step(outbox).await {
                Ok(s) => s,
                Err(e) => {
                    debug!("TAN exchange failed in state {}: {}", state, e);
                    let j = self.origin.lock();
                    return Err(e.in_job(&j, state.phase()));
                }
            };

            debug!("TAN exchange: {} -> {}", state, self.state);
        }

        Ok(())
    }

    async fn step<T: Transport>(&mut self, outbox: &mut Outbox<T>) -> Result<ItanState, Error> {
        match self.state {
            ItanState::SelectMethod => self.select_method(outbox),
            ItanState::SendChallengeRequest => self.send_challenge_request(outbox).await,
            ItanState::AwaitChallenge => self.await_challenge(outbox).await,
            ItanState::PromptUser => self.prompt_user(outbox).await,
            ItanState::SendTanMessage => self.send_tan_message(outbox).await,
            ItanState::AwaitResult => self.await_result(outbox).await,
            ItanState::Dispatch => Ok(self.dispatch()),
            ItanState::Done => Ok(ItanState::Done),
        }
    }

    fn method(&self) -> Result<&TanMethod, Error> {
        self.method
            .as_ref()
            .ok_or_else(|| hbci_core::Error::Internal("no TAN method selected".to_string()).into())
    }

    fn two_step(&self) -> bool {
        self.method
            .as_ref()
            .and_then(|m| m.process())
            .map_or(false, |p| p == TanProcess::TwoStep)
    }

    fn select_method<T: Transport>(&mut self, outbox: &mut Outbox<T>) -> Result<ItanState, Error> {
        let m = outbox.select_tan_method()?;

        let next = match m.process() {
            Some(TanProcess::TwoStep) => ItanState::SendChallengeRequest,
            Some(TanProcess::OneStep) => ItanState::PromptUser,
            None => {
                return Err(hbci_core::Error::NotSupported(format!(
                    "TAN process {}",
                    m.process
                ))
                .into())
            }
        };

        self.method = Some(m);
        Ok(next)
    }

    /// Send the jobs together with a challenge request
    async fn send_challenge_request<T: Transport>(
        &mut self,
        outbox: &mut Outbox<T>,
    ) -> Result<ItanState, Error> {
        let method = self.method()?.clone();

        let tan_job = outbox.tan_job(TanJobProcess::Challenge, &method, &self.origin)?;
        self.queue.add_aux_job(&tan_job);

        let mut msg = outbox.new_message(method.function);
        for j in self.queue.jobs() {
            Outbox::<T>::encode_job(&mut msg, j)?;
        }
        // No TAN with the challenge request
        msg.set_need_tan(false);

        outbox.send_message(&mut msg, self.queue.jobs()).await?;

        self.challenge_job = Some(tan_job);
        self.challenge_msg = Some(msg);

        Ok(ItanState::AwaitChallenge)
    }

    async fn await_challenge<T: Transport>(
        &mut self,
        outbox: &mut Outbox<T>,
    ) -> Result<ItanState, Error> {
        let msg = self
            .challenge_msg
            .take()
            .ok_or_else(|| hbci_core::Error::Internal("challenge not requested".to_string()))?;

        outbox.receive_queue(&msg, &*self.queue).await?;

        let challenge = match &self.challenge_job {
            Some(j) => TanChallenge::from_job(&j.lock()),
            None => TanChallenge::default(),
        };

        if challenge.is_empty() {
            return Err(hbci_core::Error::BadData("no TAN challenge returned".to_string()).into());
        }

        info!(
            "Received TAN challenge (reference {})",
            challenge.reference.as_deref().unwrap_or("none")
        );
        self.challenge = challenge;

        Ok(ItanState::PromptUser)
    }

    async fn prompt_user<T: Transport>(
        &mut self,
        outbox: &mut Outbox<T>,
    ) -> Result<ItanState, Error> {
        let tan = outbox
            .ui()
            .input_tan(
                self.challenge.challenge.as_deref(),
                self.challenge.challenge_hhd.as_deref(),
            )
            .await
            .ok_or(Error::UserAborted)?;

        self.tan = Some(Zeroizing::new(tan));

        Ok(ItanState::SendTanMessage)
    }

    async fn send_tan_message<T: Transport>(
        &mut self,
        outbox: &mut Outbox<T>,
    ) -> Result<ItanState, Error> {
        let method = self.method()?.clone();
        let tan = self
            .tan
            .clone()
            .ok_or_else(|| hbci_core::Error::Internal("no TAN entered".to_string()))?;

        let mut msg = outbox.new_message(method.function);

        if self.two_step() {
            // Submit the TAN for the challenged order, on a duplicate queue
            let reference = self.challenge.reference.clone().ok_or_else(|| {
                hbci_core::Error::BadData("TAN challenge without order reference".to_string())
            })?;

            let tan_job = outbox.tan_job(TanJobProcess::Submit, &method, &self.origin)?;
            tan_job.lock().set_tan_reference(&reference);

            let mut queue = JobQueue::from_queue(&*self.queue);
            queue.add_aux_job(&tan_job);

            Outbox::<T>::encode_job(&mut msg, &tan_job)?;
            msg.set_need_tan(true);
            msg.set_tan(&tan);

            outbox.send_message(&mut msg, queue.jobs()).await?;

            self.tan_queue = Some(queue);
            self.tan_job = Some(tan_job);
        } else {
            // Jobs with the TAN, plus the order hash unless single step
            let jobs: Vec<_> = self.queue.jobs().to_vec();
            for j in &jobs {
                Outbox::<T>::encode_job(&mut msg, j)?;
            }

            if !method.is_one_step() {
                let tan_job = outbox.tan_job(TanJobProcess::OrderHash, &method, &self.origin)?;
                if let Some(h) = msg.itan_hash() {
                    tan_job.lock().set_order_hash(h);
                }

                self.queue.add_aux_job(&tan_job);
                Outbox::<T>::encode_job(&mut msg, &tan_job)?;
                self.tan_job = Some(tan_job);
            }

            msg.set_need_tan(true);
            msg.set_tan(&tan);

            outbox.send_message(&mut msg, self.queue.jobs()).await?;
        }

        self.tan_msg = Some(msg);

        Ok(ItanState::AwaitResult)
    }

    async fn await_result<T: Transport>(
        &mut self,
        outbox: &mut Outbox<T>,
    ) -> Result<ItanState, Error> {
        let msg = self
            .tan_msg
            .take()
            .ok_or_else(|| hbci_core::Error::Internal("TAN not sent".to_string()))?;

        let queue = match &self.tan_queue {
            Some(q) => q,
            None => &*self.queue,
        };
        outbox.receive_queue(&msg, queue).await?;

        Ok(ItanState::Dispatch)
    }

    /// Record the TAN and fan out the TAN job's results
    fn dispatch(&mut self) -> ItanState {
        let tan = self.tan.as_deref().map(|t| t.as_str()).unwrap_or_default();

        self.origin.lock().set_used_tan(tan);

        if let Some(j) = &self.tan_job {
            j.lock().set_used_tan(tan);
            copy_results_to_queue(j, &*self.queue);
        }

        // Release the duplicate queue and the TAN jobs it references
        self.tan_queue = None;
        self.tan_job = None;
        self.challenge_job = None;

        ItanState::Done
    }
}
