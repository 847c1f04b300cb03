#![allow(dead_code)]

use fuels::types::Address;
use lottery_client::{
    ClientError,
    IdentityAgent,
    LedgerReader,
    LedgerWriter,
    RoundId,
    TxReceipt,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
};
use tokio::sync::mpsc;

pub fn addr(tag: u8) -> Address {
    Address::new([tag; 32])
}

#[derive(Default)]
struct LedgerInner {
    round_id: RoundId,
    players: Vec<Address>,
    winners: HashMap<RoundId, Address>,
    fail_reads: bool,
}

/// In-process ledger double enforcing the same round rules as the deployed
/// contract: entries accumulate, winner selection needs at least two entries
/// and opens the next round, distribution needs a decided previous round.
#[derive(Clone)]
pub struct ScriptedLedger {
    inner: Arc<Mutex<LedgerInner>>,
}

impl ScriptedLedger {
    pub fn starting_at(round_id: RoundId) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LedgerInner {
                round_id,
                ..LedgerInner::default()
            })),
        }
    }

    pub fn record_winner(&self, round_id: RoundId, winner: Address) {
        self.inner.lock().unwrap().winners.insert(round_id, winner);
    }

    pub fn set_round_id(&self, round_id: RoundId) {
        self.inner.lock().unwrap().round_id = round_id;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.lock().unwrap().fail_reads = fail;
    }

    pub fn players(&self) -> Vec<Address> {
        self.inner.lock().unwrap().players.clone()
    }

    pub fn round_id(&self) -> RoundId {
        self.inner.lock().unwrap().round_id
    }

    fn receipt(tag: &str) -> TxReceipt {
        TxReceipt {
            transaction_id: format!("0xtx-{tag}"),
        }
    }
}

impl LedgerReader for ScriptedLedger {
    async fn current_round_id(&self) -> Result<RoundId, ClientError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            return Err(ClientError::Rpc("gateway unreachable".into()));
        }
        Ok(inner.round_id)
    }

    async fn active_players(&self) -> Result<Vec<Address>, ClientError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            return Err(ClientError::Rpc("gateway unreachable".into()));
        }
        Ok(inner.players.clone())
    }

    async fn round_winner(&self, round_id: RoundId) -> Result<Address, ClientError> {
        let inner = self.inner.lock().unwrap();
        inner.winners.get(&round_id).copied().ok_or_else(|| {
            ClientError::Rpc(format!("no winner recorded for round {round_id}"))
        })
    }
}

impl LedgerWriter for ScriptedLedger {
    async fn submit_entry(&self, sender: &Address) -> Result<TxReceipt, ClientError> {
        let mut inner = self.inner.lock().unwrap();
        inner.players.push(*sender);
        Ok(Self::receipt("enter"))
    }

    async fn submit_select_winner(
        &self,
        _sender: &Address,
    ) -> Result<TxReceipt, ClientError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.players.len() < 2 {
            return Err(ClientError::Revert(
                "at least two players required".into(),
            ));
        }
        // Deterministic draw: the first entry wins.
        let winner = inner.players[0];
        let decided = inner.round_id;
        inner.winners.insert(decided, winner);
        inner.round_id += 1;
        inner.players.clear();
        Ok(Self::receipt("select"))
    }

    async fn submit_distribute_reward(
        &self,
        _sender: &Address,
    ) -> Result<TxReceipt, ClientError> {
        let inner = self.inner.lock().unwrap();
        let finalized = inner.round_id.saturating_sub(1);
        if !inner.winners.contains_key(&finalized) {
            return Err(ClientError::Revert(
                "no winner selected for the previous round".into(),
            ));
        }
        Ok(Self::receipt("distribute"))
    }
}

/// Identity agent double exposing a fixed account list.
pub struct StaticAgent {
    accounts: Vec<Address>,
    refuse: bool,
    senders: Vec<mpsc::UnboundedSender<Vec<Address>>>,
}

impl StaticAgent {
    pub fn with_accounts(accounts: Vec<Address>) -> Self {
        Self {
            accounts,
            refuse: false,
            senders: Vec::new(),
        }
    }

    pub fn refusing() -> Self {
        Self {
            accounts: Vec::new(),
            refuse: true,
            senders: Vec::new(),
        }
    }
}

impl IdentityAgent for StaticAgent {
    async fn request_access(&mut self) -> Result<Vec<Address>, ClientError> {
        if self.refuse {
            return Err(ClientError::Connection("access refused".into()));
        }
        Ok(self.accounts.clone())
    }

    fn accounts(&self) -> Vec<Address> {
        self.accounts.clone()
    }

    fn subscribe_identity_changes(&mut self) -> mpsc::UnboundedReceiver<Vec<Address>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.senders.push(sender);
        receiver
    }

    fn select_account(&mut self, index: usize) {
        if index == 0 || index >= self.accounts.len() {
            return;
        }
        self.accounts.rotate_left(index);
        let accounts = self.accounts.clone();
        self.senders
            .retain(|sender| sender.send(accounts.clone()).is_ok());
    }
}
