// Copyright (c) 2022-2023 The MobileCoin Foundation

//! TAN exchange scenarios

use hbci::{ErrorKind, OutboxConfig};
use hbci_core::{
    job::JobFlags,
    queue::{AddResult, JobQueue},
};
use hbci_proto::{tan::TAN_REQUEST, JobStatus};
use log::info;

use crate::{
    bank::{BankConfig, BankSim, ORDER_REFERENCE},
    fixtures::*,
};

/// Two-step TAN: challenge request, prompt, TAN submission
pub async fn two_step() -> anyhow::Result<()> {
    let bank = BankSim::new(BankConfig::default());
    let ui = ScriptedUi::default().with_tan(Some("999999"));
    let store = MemoryStore::default();

    let mut o = outbox(
        &bank,
        pintan_user(&[MOBILE_TAN]),
        &ui,
        &store,
        OutboxConfig::default(),
    );

    let j = balance(&mut o)?;
    assert!(j.lock().flags().contains(JobFlags::NEED_TAN));

    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&j), AddResult::Added);

    o.execute(&q).await?;

    // Challenge shown to the user
    assert_eq!(ui.challenges(), vec![Some("12345-ABC".to_string())]);

    // Method remembered for the dialog and the user
    assert_eq!(o.tan_method().map(|m| m.function), Some(MOBILE_TAN));
    assert_eq!(o.user().selected_tan_method, Some(6942));
    assert_eq!(o.dialog_id(), crate::bank::DIALOG_ID);

    let r = bank.requests().await;
    assert_eq!(r.len(), 2);

    // Order with challenge request, no TAN
    assert_eq!(r[0].codes(), vec!["HKSAL", TAN_REQUEST]);
    assert_eq!(r[0].find(TAN_REQUEST).and_then(|s| s.text(0, 0)), Some("4"));
    assert_eq!(r[0].tan, None);
    assert!(r[0].encrypted);

    // TAN submission only, referencing the order
    assert_eq!(r[1].codes(), vec![TAN_REQUEST]);
    let s = r[1].find(TAN_REQUEST).unwrap();
    assert_eq!(s.text(0, 0), Some("2"));
    assert_eq!(s.text(3, 0), Some(ORDER_REFERENCE));
    assert_eq!(s.text(4, 0), Some("N"));
    assert_eq!(r[1].tan.as_deref(), Some("999999"));
    assert_eq!(r[1].dialog_id, crate::bank::DIALOG_ID);

    // Results of the TAN submission are fanned out to the order
    let j = j.lock();
    assert_eq!(j.status(), JobStatus::Answered);
    assert_eq!(j.used_tan(), Some("999999"));
    assert!(!j.flags().contains(JobFlags::HAS_ERRORS));

    let codes: Vec<_> = j.segment_results().iter().map(|r| r.code()).collect();
    assert_eq!(codes, vec![20]);
    assert_eq!(j.message_results().len(), 2);

    info!("two-step TAN OK");

    Ok(())
}

/// Two-step TAN rejected by the bank, errors reach the order
pub async fn wrong_tan() -> anyhow::Result<()> {
    let bank = BankSim::new(BankConfig::default());
    let ui = ScriptedUi::default().with_tan(Some("000000"));
    let store = MemoryStore::default();

    let mut o = outbox(
        &bank,
        pintan_user(&[MOBILE_TAN]),
        &ui,
        &store,
        OutboxConfig::default(),
    );

    let j = balance(&mut o)?;
    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&j), AddResult::Added);

    o.execute(&q).await?;

    let j = j.lock();
    assert!(j.flags().contains(JobFlags::HAS_ERRORS));
    assert!(j.segment_results().iter().any(|r| r.code() == 9941));

    Ok(())
}

/// One-step TAN: TAN and order hash sent with the order
pub async fn one_step() -> anyhow::Result<()> {
    let bank = BankSim::new(BankConfig::default());
    let ui = ScriptedUi::default().with_tan(Some("999999"));
    let store = MemoryStore::default();

    let mut o = outbox(
        &bank,
        pintan_user(&[INDEXED_TAN]),
        &ui,
        &store,
        OutboxConfig::default(),
    );

    let j = balance(&mut o)?;
    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&j), AddResult::Added);

    o.execute(&q).await?;

    // No challenge for one-step methods
    assert_eq!(ui.challenges(), vec![None]);

    let r = bank.requests().await;
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].codes(), vec!["HKSAL", TAN_REQUEST]);
    assert_eq!(r[0].tan.as_deref(), Some("999999"));

    // Order hash over the order segment (RIPEMD-160)
    let s = r[0].find(TAN_REQUEST).unwrap();
    assert_eq!(s.text(0, 0), Some("1"));
    assert_eq!(s.value(2, 0).map(|h| h.len()), Some(20));

    let j = j.lock();
    assert_eq!(j.used_tan(), Some("999999"));
    assert!(!j.flags().contains(JobFlags::HAS_ERRORS));
    assert!(j.segment_results().iter().all(|r| r.code() == 20));

    // Order and TAN job share one message, its results are not duplicated
    let codes: Vec<_> = j.message_results().iter().map(|r| r.code()).collect();
    assert_eq!(codes, vec![10]);
    assert_eq!(j.segment_results().len(), 2);

    Ok(())
}

/// No methods advertised, TAN sent with the order alone
pub async fn single_step() -> anyhow::Result<()> {
    let bank = BankSim::new(BankConfig::default());
    let ui = ScriptedUi::default().with_tan(Some("999999"));
    let store = MemoryStore::default();

    let mut user = pintan_user(&[]);
    user.tan_method_descriptions.clear();

    let mut o = outbox(&bank, user, &ui, &store, OutboxConfig::default());

    let j = balance(&mut o)?;
    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&j), AddResult::Added);

    o.execute(&q).await?;

    assert_eq!(o.tan_method().map(|m| m.is_one_step()), Some(true));
    assert_eq!(o.user().selected_tan_method, None);

    let r = bank.requests().await;
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].codes(), vec!["HKSAL"]);
    assert_eq!(r[0].tan.as_deref(), Some("999999"));

    assert_eq!(j.lock().used_tan(), Some("999999"));

    Ok(())
}

/// Bank returns no challenge
pub async fn missing_challenge() -> anyhow::Result<()> {
    let bank = BankSim::new(BankConfig {
        challenge: None,
        ..Default::default()
    });
    let ui = ScriptedUi::default().with_tan(Some("999999"));
    let store = MemoryStore::default();

    let mut o = outbox(
        &bank,
        pintan_user(&[MOBILE_TAN]),
        &ui,
        &store,
        OutboxConfig::default(),
    );

    let j = balance(&mut o)?;
    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&j), AddResult::Added);

    let e = o.execute(&q).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::BadData);
    assert_eq!(e.job(), Some(BALANCE));

    // User never prompted, no TAN sent
    assert!(ui.challenges().is_empty());
    assert_eq!(bank.requests().await.len(), 1);

    Ok(())
}

/// User aborts the TAN prompt
pub async fn user_abort() -> anyhow::Result<()> {
    let bank = BankSim::new(BankConfig::default());
    let ui = ScriptedUi::default().with_tan(None);
    let store = MemoryStore::default();

    let mut o = outbox(
        &bank,
        pintan_user(&[MOBILE_TAN]),
        &ui,
        &store,
        OutboxConfig::default(),
    );

    let j = balance(&mut o)?;
    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&j), AddResult::Added);

    let e = o.execute(&q).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Aborted);

    assert_eq!(bank.requests().await.len(), 1);
    assert_eq!(j.lock().used_tan(), None);

    Ok(())
}

/// Bank never answers the challenge request
pub async fn timeout() -> anyhow::Result<()> {
    let bank = BankSim::new(BankConfig {
        respond: false,
        ..Default::default()
    });
    let ui = ScriptedUi::default().with_tan(Some("999999"));
    let store = MemoryStore::default();

    let config = OutboxConfig {
        request_timeout_s: 1,
        ..Default::default()
    };
    let mut o = outbox(&bank, pintan_user(&[MOBILE_TAN]), &ui, &store, config);

    let j = balance(&mut o)?;
    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&j), AddResult::Added);

    let e = o.execute(&q).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Transport);

    assert!(ui.challenges().is_empty());
    assert_eq!(j.lock().status(), JobStatus::Error);

    Ok(())
}
