use fuels::types::Address;
use thiserror::Error;

/// Identifier of a lottery round. Strictly increasing on the ledger.
pub type RoundId = u64;

/// Everything that can go wrong while talking to the ledger or the wallet
/// agent. None of these are fatal; each is surfaced as a message and the
/// session stays usable.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No wallet agent present, or the operator refused the access request.
    #[error("wallet connection failed: {0}")]
    Connection(String),
    /// Transport-level failure on a read or write call.
    #[error("ledger request failed: {0}")]
    Rpc(String),
    /// The ledger rejected a write because a precondition was not met.
    #[error("ledger rejected the request: {0}")]
    Revert(String),
    /// A step of the history walk failed, leaving a partial sequence.
    #[error("history sync aborted at round {round}: {reason}")]
    StateSync { round: RoundId, reason: String },
}

/// Receipt returned by the ledger for an accepted write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_id: String,
}

/// Read surface of the lottery ledger.
///
/// Implementations suspend the caller until the response arrives; the client
/// never issues these calls in parallel.
pub trait LedgerReader {
    async fn current_round_id(&self) -> Result<RoundId, ClientError>;
    async fn active_players(&self) -> Result<Vec<Address>, ClientError>;
    async fn round_winner(&self, round_id: RoundId) -> Result<Address, ClientError>;
}

/// Write surface of the lottery ledger. Every submission is a single
/// best-effort attempt; a revert or transport failure is never retried here.
pub trait LedgerWriter {
    async fn submit_entry(&self, sender: &Address) -> Result<TxReceipt, ClientError>;
    async fn submit_select_winner(
        &self,
        sender: &Address,
    ) -> Result<TxReceipt, ClientError>;
    async fn submit_distribute_reward(
        &self,
        sender: &Address,
    ) -> Result<TxReceipt, ClientError>;
}
