#![allow(non_snake_case)]

mod support;

use lottery_client::AppController;
use std::time::Duration;
use support::{
    ScriptedLedger,
    StaticAgent,
    addr,
};

fn connected_app(
    ledger: &ScriptedLedger,
    identity: u8,
) -> AppController<ScriptedLedger, StaticAgent> {
    AppController::new(
        ledger.clone(),
        StaticAgent::with_accounts(vec![addr(identity)]),
        Duration::from_secs(2),
    )
}

#[tokio::test]
async fn distribute_reward__success_names_the_finalized_round_and_winner() {
    let ledger = ScriptedLedger::starting_at(1);
    let mut owner = connected_app(&ledger, 0xCC);
    owner.connect_wallet().await;
    owner.enter().await;
    let mut alice = connected_app(&ledger, 2);
    alice.connect_wallet().await;
    alice.enter().await;
    owner.select_winner().await;

    owner.distribute_reward().await;

    let snap = owner.snapshot();
    assert_eq!(snap.error, None);
    let message = snap.success.unwrap();
    assert!(message.contains("round 1"));
    assert!(message.contains(&addr(0xCC).to_string()));
}

#[tokio::test]
async fn distribute_reward__without_a_decided_round_reverts() {
    let ledger = ScriptedLedger::starting_at(1);
    let mut owner = connected_app(&ledger, 1);
    owner.connect_wallet().await;

    owner.distribute_reward().await;

    let snap = owner.snapshot();
    assert!(snap.error.unwrap().contains("no winner selected"));
    assert_eq!(snap.success, None);
    assert_eq!(snap.current_round_id, 1);
}
