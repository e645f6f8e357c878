// Copyright (c) 2022-2023 The MobileCoin Foundation

//! HBCI / FinTS job engine core
//!
//! This provides the [Job][job::Job] model, [JobQueue][queue::JobQueue]s
//! grouping compatible jobs into one message, [Message][message::Message]
//! assembly with signing and encryption via the [Crypt][crypt::Crypt]
//! dispatcher, and TAN method selection for two-step authorisation.
//!
//! Transport, user interaction and persistence are provided by the caller,
//! see the `hbci` crate for the asynchronous outbox driving jobs through a
//! dialog with the bank.
//!
//! ## Operations
//!
//! 1. Create a [Job][job::Job] from a [template][template::TemplateProvider]
//!    and the negotiated [bank parameters][params::ParamStore]
//! 2. Add jobs to a [JobQueue][queue::JobQueue], a job that does not fit
//!    the current queue starts a new one
//! 3. Build a [Message][message::Message] per queue, adding signers and
//!    jobs, then [encode][message::Message::encode] it
//! 4. Parse the response, check security and dispatch segments back to
//!    the owning jobs by message number and segment reference
//! 5. [Sample results][job::Job::sample_results] and decide via
//!    [prepare_next_message][job::Job::prepare_next_message] whether
//!    another round is required
//!

pub use hbci_proto as proto;

mod error;
pub use error::{Error, ErrorKind};

pub mod crypt;
pub mod job;
pub mod message;
pub mod params;
pub mod queue;
pub mod tan;
pub mod template;
pub mod user;
