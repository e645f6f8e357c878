// Copyright (c) 2022-2023 The MobileCoin Foundation

use hbci_core::job::Job;
use tokio::time::error::Elapsed;

pub use hbci_core::ErrorKind;

/// Protocol phase in which an error occurred
#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::Display)]
pub enum Phase {
    /// Encoding jobs into a message
    Encode,
    /// Sending a message
    Send,
    /// Receiving and dispatching a response
    Receive,
    /// Selecting the TAN method
    SelectMethod,
    /// Requesting a TAN challenge
    SendChallengeRequest,
    /// Waiting for the TAN challenge
    AwaitChallenge,
    /// Prompting the user for a TAN
    PromptUser,
    /// Sending the TAN
    SendTanMessage,
    /// Waiting for the TAN result
    AwaitResult,
    /// Distributing results
    Dispatch,
}

/// HBCI outbox error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Engine error
    #[error(transparent)]
    Core(#[from] hbci_core::Error),

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(anyhow::Error),

    /// Request timeout
    #[error("Timeout waiting for bank response")]
    RequestTimeout,

    /// User aborted the operation
    #[error("Operation aborted by user")]
    UserAborted,

    /// Configuration store error
    #[error("Configuration store error: {0}")]
    Config(anyhow::Error),

    /// Error with job context
    #[error("Job {job} failed ({phase}): {source}")]
    Job {
        job: String,
        phase: Phase,
        /// Cumulative job log at the time of the error
        log: Vec<String>,
        source: Box<Error>,
    },
}

impl Error {
    /// Fetch the kind of an error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Core(e) => e.kind(),
            Error::Transport(_) | Error::RequestTimeout => ErrorKind::Transport,
            Error::UserAborted => ErrorKind::Aborted,
            Error::Config(_) => ErrorKind::Internal,
            Error::Job { source, .. } => source.kind(),
        }
    }

    /// Attach job context to an error
    ///
    /// Errors already carrying job context are returned unchanged.
    pub fn in_job(self, job: &Job, phase: Phase) -> Self {
        match self {
            Error::Job { .. } => self,
            _ => Error::Job {
                job: job.name().to_string(),
                phase,
                log: job.logs().iter().map(|l| l.to_string()).collect(),
                source: Box::new(self),
            },
        }
    }

    /// Name of the job an error occurred in
    pub fn job(&self) -> Option<&str> {
        match self {
            Error::Job { job, .. } => Some(job),
            _ => None,
        }
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}
