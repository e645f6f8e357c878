// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Dialog scenarios without TANs: continuation rounds, unsigned responses

use hbci::{ErrorKind, OutboxConfig, UNSIGNED_CHOICES};
use hbci_core::{
    job::JobFlags,
    queue::{AddResult, JobQueue},
    user::UserFlags,
};
use hbci_proto::JobStatus;

use crate::{
    bank::{BankConfig, BankSim},
    fixtures::*,
};

/// Bank returns attach points, the job is resent until complete
pub async fn continuation() -> anyhow::Result<()> {
    let bank = BankSim::new(BankConfig {
        attach_rounds: 2,
        ..Default::default()
    });
    let ui = ScriptedUi::default();
    let store = MemoryStore::default();

    let mut o = outbox(&bank, rdh_user(), &ui, &store, OutboxConfig::default());

    let j = balance(&mut o)?;
    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&j), AddResult::Added);

    o.execute(&q).await?;

    let r = bank.requests().await;
    assert_eq!(r.len(), 3);

    // Attach point returned with each round is sent with the next
    let attach: Vec<_> = r
        .iter()
        .map(|r| r.find("HKSAL").and_then(|s| s.text(3, 0)).map(String::from))
        .collect();
    assert_eq!(
        attach,
        vec![None, Some("cont-1".to_string()), Some("cont-2".to_string())]
    );

    let msg_nums: Vec<_> = r.iter().map(|r| r.msg_num).collect();
    assert_eq!(msg_nums, vec![1, 2, 3]);

    let j = j.lock();
    assert_eq!(j.status(), JobStatus::Answered);
    assert_eq!(j.attach_point(), None);
    assert!(!j.flags().contains(JobFlags::HAS_ATTACHPOINT));

    // Three data segments, one per round
    let data = j.responses().iter().filter(|s| s.code == "HISAL").count();
    assert_eq!(data, 3);

    // Signed by the bank, no confirmation required
    assert!(ui.confirms().is_empty());

    Ok(())
}

/// Unsigned response accepted permanently
pub async fn unsigned_accept_always() -> anyhow::Result<()> {
    let bank = BankSim::new(BankConfig {
        sign: false,
        ..Default::default()
    });
    let ui = ScriptedUi::default().with_choice(Some(1));
    let store = MemoryStore::default();

    let mut o = outbox(&bank, rdh_user(), &ui, &store, OutboxConfig::default());

    let j = balance(&mut o)?;
    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&j), AddResult::Added);

    o.execute(&q).await?;

    assert_eq!(UNSIGNED_CHOICES[1], "Accept always");
    assert_eq!(ui.confirms().len(), 1);
    assert_eq!(j.lock().status(), JobStatus::Answered);

    // Override persisted under the user lock
    assert_eq!(store.calls(), vec!["lock", "save", "unlock"]);
    let saved = store.saved();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].flags.contains(UserFlags::BANK_DOESNT_SIGN));
    assert!(o.user().flags.contains(UserFlags::BANK_DOESNT_SIGN));

    // No further confirmation for this user
    let j = balance(&mut o)?;
    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&j), AddResult::Added);

    o.execute(&q).await?;

    assert_eq!(ui.confirms().len(), 1);
    assert_eq!(j.lock().status(), JobStatus::Answered);

    Ok(())
}

/// Unsigned response accepted once, then rejected
pub async fn unsigned_once_then_abort() -> anyhow::Result<()> {
    let bank = BankSim::new(BankConfig {
        sign: false,
        ..Default::default()
    });
    let ui = ScriptedUi::default().with_choice(Some(0)).with_choice(Some(2));
    let store = MemoryStore::default();

    let mut o = outbox(&bank, rdh_user(), &ui, &store, OutboxConfig::default());

    let j = balance(&mut o)?;
    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&j), AddResult::Added);

    o.execute(&q).await?;
    assert_eq!(j.lock().status(), JobStatus::Answered);
    assert!(store.calls().is_empty());

    let j = balance(&mut o)?;
    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&j), AddResult::Added);

    let e = o.execute(&q).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Security);
    assert_eq!(ui.confirms().len(), 2);
    assert_eq!(j.lock().status(), JobStatus::Error);
    assert!(!o.user().flags.contains(UserFlags::BANK_DOESNT_SIGN));

    Ok(())
}

/// Dialog end job, sent alone
pub async fn end_dialog() -> anyhow::Result<()> {
    let bank = BankSim::new(BankConfig::default());
    let ui = ScriptedUi::default();
    let store = MemoryStore::default();

    let mut o = outbox(&bank, rdh_user(), &ui, &store, OutboxConfig::default());

    let b = balance(&mut o)?;
    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&b), AddResult::Added);
    o.execute(&q).await?;

    let end = o.job(END_DIALOG, None, 0)?;
    end.lock().set_argument("dialogid", o.dialog_id());

    // Dialog jobs are not combined with other jobs
    let mut q = JobQueue::new();
    assert_eq!(q.add_job(&end), AddResult::Added);
    assert_eq!(q.add_job(&balance(&mut o)?), AddResult::Full);

    o.execute(&q).await?;

    let r = bank.requests().await;
    assert_eq!(r.len(), 2);
    assert_eq!(r[1].codes(), vec!["HKEND"]);
    assert_eq!(r[1].segments[0].text(0, 0), Some(crate::bank::DIALOG_ID));

    let end = end.lock();
    assert!(end.flags().contains(JobFlags::DLG_JOB));
    assert!(end.segment_results().iter().any(|r| r.code() == 100));

    Ok(())
}
