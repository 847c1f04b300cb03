use crate::{
    ledger::{
        ClientError,
        LedgerReader,
        LedgerWriter,
    },
    status::StatusChannel,
};
use fuels::types::Address;

/// The three state-changing requests the ledger accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Enter,
    SelectWinner,
    DistributeReward,
}

impl ActionKind {
    fn label(self) -> &'static str {
        match self {
            ActionKind::Enter => "enter",
            ActionKind::SelectWinner => "select winner",
            ActionKind::DistributeReward => "distribute reward",
        }
    }
}

/// How a dispatch attempt ended, as seen by the caller deciding whether to
/// resync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchResult {
    /// Accepted by the ledger; the caller should run a full resync.
    Completed,
    /// Rejected; the failure message is already in the status channel.
    Failed,
    /// A request of the same kind is still in flight; nothing was submitted.
    AlreadyInFlight,
}

/// Submits state-changing requests, one attempt each, with a single-flight
/// guard per request kind so rapid repeated triggers cannot submit
/// duplicates.
pub struct ActionDispatcher {
    entering: bool,
    selecting: bool,
    distributing: bool,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self {
            entering: false,
            selecting: false,
            distributing: false,
        }
    }

    pub fn in_flight(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::Enter => self.entering,
            ActionKind::SelectWinner => self.selecting,
            ActionKind::DistributeReward => self.distributing,
        }
    }

    fn slot(&mut self, kind: ActionKind) -> &mut bool {
        match kind {
            ActionKind::Enter => &mut self.entering,
            ActionKind::SelectWinner => &mut self.selecting,
            ActionKind::DistributeReward => &mut self.distributing,
        }
    }

    /// Marks `kind` as in flight. Returns false if it already was.
    pub fn begin(&mut self, kind: ActionKind) -> bool {
        let slot = self.slot(kind);
        if *slot {
            return false;
        }
        *slot = true;
        true
    }

    pub fn finish(&mut self, kind: ActionKind) {
        *self.slot(kind) = false;
    }

    /// Runs one best-effort attempt of `kind` with `sender` as the signing
    /// identity.
    ///
    /// Message slots are cleared before the attempt, per kind: entering a
    /// round clears only a stale error and leaves the previous success
    /// message standing; the two owner actions clear both slots. Any
    /// rejection, transport or revert, lands in the error slot and the cached
    /// round state and history are left untouched for the caller.
    pub async fn dispatch<L>(
        &mut self,
        ledger: &L,
        kind: ActionKind,
        sender: Address,
        status: &mut StatusChannel,
    ) -> DispatchResult
    where
        L: LedgerReader + LedgerWriter,
    {
        if !self.begin(kind) {
            tracing::warn!(action = kind.label(), "request already in flight; ignored");
            return DispatchResult::AlreadyInFlight;
        }

        match kind {
            ActionKind::Enter => status.clear_error(),
            ActionKind::SelectWinner | ActionKind::DistributeReward => {
                status.clear_error();
                status.clear_success();
            }
        }

        let outcome = self.run(ledger, kind, &sender, status).await;
        self.finish(kind);

        match outcome {
            Ok(()) => DispatchResult::Completed,
            Err(err) => {
                tracing::warn!(action = kind.label(), error = %err, "request rejected");
                status.set_error(err.to_string());
                DispatchResult::Failed
            }
        }
    }

    async fn run<L>(
        &self,
        ledger: &L,
        kind: ActionKind,
        sender: &Address,
        status: &mut StatusChannel,
    ) -> Result<(), ClientError>
    where
        L: LedgerReader + LedgerWriter,
    {
        match kind {
            ActionKind::Enter => {
                let receipt = ledger.submit_entry(sender).await?;
                tracing::info!(tx = %receipt.transaction_id, "entered the round");
            }
            ActionKind::SelectWinner => {
                let receipt = ledger.submit_select_winner(sender).await?;
                tracing::info!(tx = %receipt.transaction_id, "winner selection accepted");
                status.set_success("Winner selected for the current round");
            }
            ActionKind::DistributeReward => {
                let receipt = ledger.submit_distribute_reward(sender).await?;
                tracing::info!(tx = %receipt.transaction_id, "reward distribution accepted");
                // The ledger advanced past the decided round when the winner
                // was selected, so the round just paid out is the one before
                // the current id.
                let current = ledger.current_round_id().await?;
                let finalized = current.saturating_sub(1);
                let winner = ledger.round_winner(finalized).await?;
                status.set_success(format!(
                    "Reward of round {finalized} went to {winner}"
                ));
            }
        }
        Ok(())
    }
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
