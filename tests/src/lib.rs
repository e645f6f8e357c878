// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Dialog tests for the HBCI outbox.
//!
//! Scenarios run against [bank::BankSim], a simulated bank implementing
//! [hbci::Transport], for reuse by the crate tests.
//!

pub mod bank;

pub mod fixtures;

pub mod itan;

pub mod dialog;
