use crate::ledger::ClientError;
use fuels::types::Address;
use tokio::sync::mpsc;

/// Capability interface over the locally-held signing identity (a wallet
/// keystore, a hardware device, a browser extension). Injected so tests can
/// substitute a scripted double.
pub trait IdentityAgent {
    /// Asks the agent for access to its accounts. The first returned address
    /// is the active identity.
    async fn request_access(&mut self) -> Result<Vec<Address>, ClientError>;

    /// Accounts currently exposed by the agent, active identity first.
    fn accounts(&self) -> Vec<Address>;

    /// Channel on which the agent reports account changes. Every message is
    /// the full, reordered account list with the new active identity first.
    fn subscribe_identity_changes(&mut self) -> mpsc::UnboundedReceiver<Vec<Address>>;

    /// Switches the active account, notifying subscribers. Out-of-range
    /// indices are ignored.
    fn select_account(&mut self, index: usize);
}

/// The connected identity and the accounts behind it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub identity: Address,
    pub accounts: Vec<Address>,
}

/// Owns the wallet handshake and the active identity for the lifetime of the
/// process. Nothing else mutates the session.
pub struct ConnectionManager<A: IdentityAgent> {
    agent: A,
    session: Option<Session>,
    identity_events: Option<mpsc::UnboundedReceiver<Vec<Address>>>,
}

impl<A: IdentityAgent> ConnectionManager<A> {
    pub fn new(agent: A) -> Self {
        Self {
            agent,
            session: None,
            identity_events: None,
        }
    }

    /// Performs the wallet handshake and captures the primary address.
    ///
    /// The identity-change subscription is registered on the first successful
    /// connect and reused on reconnect, so the agent never ends up with a
    /// second listener for the same session.
    pub async fn connect(&mut self) -> Result<Address, ClientError> {
        let accounts = self.agent.request_access().await?;
        let identity = accounts.first().copied().ok_or_else(|| {
            ClientError::Connection("the wallet agent exposed no accounts".into())
        })?;
        if self.identity_events.is_none() {
            self.identity_events = Some(self.agent.subscribe_identity_changes());
        }
        self.session = Some(Session { identity, accounts });
        Ok(identity)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn identity(&self) -> Option<Address> {
        self.session.as_ref().map(|session| session.identity)
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    /// Applies an identity-change notification in place. Deliberately does
    /// not touch any cached ledger state; readers pick up the new identity on
    /// their own next resync.
    pub fn apply_identity_change(&mut self, accounts: Vec<Address>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(identity) = accounts.first().copied() else {
            return;
        };
        tracing::info!(%identity, "active identity changed");
        session.identity = identity;
        session.accounts = accounts;
    }

    /// Resolves with the next identity-change notification, or never if no
    /// subscription is active. Cancel-safe, so it can sit in a `select!` arm.
    pub async fn next_identity_change(&mut self) -> Vec<Address> {
        match self.identity_events.as_mut() {
            Some(events) => match events.recv().await {
                Some(accounts) => accounts,
                None => {
                    // Agent dropped its sender; park instead of spinning.
                    self.identity_events = None;
                    std::future::pending().await
                }
            },
            None => std::future::pending().await,
        }
    }
}
