pub mod actions;
pub mod client;
pub mod gateway;
pub mod ledger;
pub mod session;
pub mod status;
pub mod sync;
pub mod ui;
pub mod wallets;

pub use client::{
    AppConfig,
    AppController,
    AppSnapshot,
    WalletConfig,
};
pub use gateway::LedgerGateway;
pub use ledger::{
    ClientError,
    LedgerReader,
    LedgerWriter,
    RoundId,
    TxReceipt,
};
pub use session::{
    ConnectionManager,
    IdentityAgent,
    Session,
};
pub use sync::{
    HistoryEntry,
    RoundHistory,
    RoundState,
    RoundStateReader,
};
pub use wallets::{
    KeyRing,
    KeystoreAgent,
};
