// Copyright (c) 2022-2023 The MobileCoin Foundation

//! HBCI outbox / dialog controller
//!
//! An [Outbox] drives queued jobs through a dialog with the bank: it builds
//! and encodes messages, exchanges them via a [Transport], dispatches the
//! responses back to their jobs and runs the two-step TAN exchange when
//! jobs require a TAN.
//!
//! User interaction and configuration persistence are provided by the
//! caller via the [Interaction] and [ConfigStore] traits.
//!

pub use hbci_core as engine;
pub use hbci_proto as proto;

mod config;
pub use config::OutboxConfig;

mod error;
pub use error::{Error, ErrorKind, Phase};

mod interaction;
pub use interaction::{Interaction, UNSIGNED_CHOICES};

mod store;
pub use store::ConfigStore;

pub mod transport;
pub use transport::Transport;

pub mod outbox;
pub use outbox::{ItanState, Outbox, Services};
