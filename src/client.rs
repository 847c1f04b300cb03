use crate::{
    actions::{
        ActionDispatcher,
        ActionKind,
        DispatchResult,
    },
    gateway::LedgerGateway,
    ledger::{
        LedgerReader,
        LedgerWriter,
        RoundId,
    },
    session::{
        ConnectionManager,
        IdentityAgent,
    },
    status::StatusChannel,
    sync::{
        HistoryEntry,
        RoundHistory,
        RoundStateReader,
    },
    ui,
    wallets::{
        self,
        KeyRing,
    },
};
use color_eyre::eyre::Result;
use fuels::types::Address;
use std::{
    path::PathBuf,
    time::Duration,
};
use tokio::time;

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8080";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub enum WalletConfig {
    Keystore { owner: String, dir: PathBuf },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gateway_url: String,
    pub wallet: WalletConfig,
    pub poll_interval: Duration,
}

/// Read-only view handed to the presentation layer. Everything in here is a
/// copy; drawing never touches live component state.
#[derive(Clone, Debug, Default)]
pub struct AppSnapshot {
    pub connected: bool,
    pub identity: Option<Address>,
    pub accounts: Vec<Address>,
    pub current_round_id: RoundId,
    pub players: Vec<Address>,
    pub history: Vec<HistoryEntry>,
    pub error: Option<String>,
    pub success: Option<String>,
    pub activity: String,
}

/// Composition root of the session core. Owns the injected ledger and wallet
/// agent plus the components holding cached state, and drives every operation
/// the presentation layer can trigger.
///
/// All ledger and agent interaction goes through `&mut self` async calls
/// awaited to completion on one task, so no two operations ever interleave
/// their suspend points.
pub struct AppController<L, A>
where
    L: LedgerReader + LedgerWriter,
    A: IdentityAgent,
{
    ledger: L,
    connection: ConnectionManager<A>,
    round_state: RoundStateReader,
    history: RoundHistory,
    dispatcher: ActionDispatcher,
    status: StatusChannel,
    activity: String,
    poll_interval: Duration,
}

impl<L, A> AppController<L, A>
where
    L: LedgerReader + LedgerWriter,
    A: IdentityAgent,
{
    pub fn new(ledger: L, agent: A, poll_interval: Duration) -> Self {
        Self {
            ledger,
            connection: ConnectionManager::new(agent),
            round_state: RoundStateReader::new(),
            history: RoundHistory::new(),
            dispatcher: ActionDispatcher::new(),
            status: StatusChannel::default(),
            activity: String::from("Not connected"),
            poll_interval,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    fn set_activity(&mut self, message: impl Into<String>) {
        self.activity = message.into();
    }

    /// Wallet handshake followed by the initial full resync.
    pub async fn connect_wallet(&mut self) {
        self.status.clear_error();
        self.status.clear_success();
        match self.connection.connect().await {
            Ok(identity) => {
                tracing::info!(%identity, "wallet connected");
                self.set_activity(format!("Connected as {}", short_address(&identity)));
                self.resync().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "wallet connection failed");
                self.status.set_error(err.to_string());
            }
        }
    }

    /// Refreshes the round state, then rebuilds the winner history from the
    /// freshly fetched round id. Any failure becomes the visible error and
    /// the previously synced values stay on screen.
    pub async fn resync(&mut self) {
        if let Err(err) = self.round_state.refresh(&self.ledger).await {
            tracing::warn!(error = %err, "round state refresh failed");
            self.status.set_error(err.to_string());
            return;
        }
        let current_round_id = self.round_state.current_round_id();
        if let Err(err) = self.history.rebuild(&self.ledger, current_round_id).await {
            tracing::warn!(error = %err, "history rebuild failed");
            self.status.set_error(err.to_string());
            return;
        }
        self.set_activity(format!("Synced round {current_round_id}"));
    }

    pub async fn enter(&mut self) {
        self.run_action(ActionKind::Enter).await;
    }

    pub async fn select_winner(&mut self) {
        self.run_action(ActionKind::SelectWinner).await;
    }

    pub async fn distribute_reward(&mut self) {
        self.run_action(ActionKind::DistributeReward).await;
    }

    async fn run_action(&mut self, kind: ActionKind) {
        let Some(identity) = self.connection.identity() else {
            self.status
                .set_error("Connect a wallet before submitting requests");
            return;
        };
        let result = self
            .dispatcher
            .dispatch(&self.ledger, kind, identity, &mut self.status)
            .await;
        if result == DispatchResult::Completed {
            self.resync().await;
        }
    }

    /// Rotates to the next unlocked account. The new identity arrives through
    /// the agent's notification channel, exactly as an external switch would.
    pub fn select_next_account(&mut self) {
        if self.connection.is_connected() {
            self.connection.agent_mut().select_account(1);
        }
    }

    pub async fn next_identity_change(&mut self) -> Vec<Address> {
        self.connection.next_identity_change().await
    }

    pub fn apply_identity_change(&mut self, accounts: Vec<Address>) {
        self.connection.apply_identity_change(accounts);
        if let Some(identity) = self.connection.identity() {
            self.set_activity(format!("Connected as {}", short_address(&identity)));
        }
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let session = self.connection.session();
        let round = self.round_state.state();
        AppSnapshot {
            connected: session.is_some(),
            identity: session.map(|session| session.identity),
            accounts: session
                .map(|session| session.accounts.clone())
                .unwrap_or_default(),
            current_round_id: round.map(|state| state.current_round_id).unwrap_or(0),
            players: round.map(|state| state.players.clone()).unwrap_or_default(),
            history: self.history.entries().to_vec(),
            error: self.status.error().map(str::to_owned),
            success: self.status.success().map(str::to_owned),
            activity: self.activity.clone(),
        }
    }
}

pub fn short_address(address: &Address) -> String {
    let full = address.to_string();
    let hex = full.trim_start_matches("0x");
    if hex.len() <= 12 {
        return full;
    }
    format!("0x{}..{}", &hex[..6], &hex[hex.len() - 4..])
}

enum LoopEvent {
    Tick,
    IdentityChanged(Vec<Address>),
    Input(ui::UserEvent),
    Shutdown,
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let AppConfig {
        gateway_url,
        wallet,
        poll_interval,
    } = config;

    let key_ring = KeyRing::default();
    let WalletConfig::Keystore { owner, dir } = wallet;
    // The password prompt needs a cooked terminal, so unlock before the UI
    // takes over.
    let agent = wallets::KeystoreAgent::unlock(&dir, &owner, &key_ring)?;
    let ledger = LedgerGateway::new(gateway_url, key_ring)?;
    tracing::info!(%ledger, "gateway configured");
    let controller = AppController::new(ledger, agent, poll_interval);

    let mut ui_state = ui::UiState::default();
    let mut input = ui::input_events();
    ui::terminal_enter(&mut ui_state)?;
    let result = run_loop(controller, &mut ui_state, &mut input).await;
    ui::terminal_exit()?;
    result
}

async fn run_loop<L, A>(
    mut controller: AppController<L, A>,
    ui_state: &mut ui::UiState,
    input: &mut ui::InputEvents,
) -> Result<()>
where
    L: LedgerReader + LedgerWriter,
    A: IdentityAgent,
{
    let mut ticker = time::interval(controller.poll_interval());
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
    ui::draw(ui_state, &controller.snapshot())?;

    loop {
        let event = tokio::select! {
            _ = ticker.tick() => LoopEvent::Tick,
            accounts = controller.next_identity_change() => {
                LoopEvent::IdentityChanged(accounts)
            }
            _ = tokio::signal::ctrl_c() => LoopEvent::Shutdown,
            raw = ui::next_raw_event(input) => {
                match ui::interpret_event(raw?) {
                    Some(user_event) => LoopEvent::Input(user_event),
                    None => continue,
                }
            }
        };

        match event {
            LoopEvent::Tick => {
                if controller.is_connected() {
                    controller.resync().await;
                }
            }
            LoopEvent::IdentityChanged(accounts) => {
                controller.apply_identity_change(accounts);
            }
            LoopEvent::Shutdown => break,
            LoopEvent::Input(user_event) => match user_event {
                ui::UserEvent::Quit => break,
                ui::UserEvent::Connect => controller.connect_wallet().await,
                ui::UserEvent::EnterRound => controller.enter().await,
                ui::UserEvent::SelectWinner => controller.select_winner().await,
                ui::UserEvent::DistributeReward => controller.distribute_reward().await,
                ui::UserEvent::Resync => {
                    if controller.is_connected() {
                        controller.resync().await;
                    }
                }
                ui::UserEvent::NextAccount => controller.select_next_account(),
                ui::UserEvent::Redraw => {}
            },
        }

        ui::draw(ui_state, &controller.snapshot())?;
    }
    Ok(())
}
