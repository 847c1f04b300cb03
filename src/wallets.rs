use crate::{
    ledger::ClientError,
    session::IdentityAgent,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use fuels::{
    crypto::{
        Message,
        SecretKey,
        Signature,
    },
    types::Address,
};
use rpassword::prompt_password;
use std::{
    collections::HashMap,
    fs,
    path::{
        Path,
        PathBuf,
    },
    sync::{
        Arc,
        Mutex,
    },
};
use tokio::sync::mpsc;

/// Accounts derived from a single mnemonic keystore.
const MNEMONIC_ACCOUNT_COUNT: usize = 5;

#[derive(Clone, Debug)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl WalletDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".fuel").join("wallets"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_wallet_dir(),
    }
}

pub fn list_wallets(dir: &Path) -> Result<Vec<WalletDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut wallets = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read wallet directory")? {
        let entry = entry.wrap_err("Failed to read wallet entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("wallet") {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid wallet filename {:?}", path))?
            .to_owned();
        wallets.push(WalletDescriptor::new(name, path));
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

pub fn find_wallet(dir: &Path, name: &str) -> Result<WalletDescriptor> {
    let wallets = list_wallets(dir)?;
    wallets
        .into_iter()
        .find(|w| w.name == name)
        .ok_or_else(|| eyre!("Wallet '{name}' not found in {}", dir.to_string_lossy()))
}

/// Shared registry of unlocked signing keys, keyed by address. The keystore
/// agent fills it; the ledger gateway signs write envelopes out of it.
#[derive(Clone, Default)]
pub struct KeyRing {
    keys: Arc<Mutex<HashMap<Address, SecretKey>>>,
}

impl KeyRing {
    pub fn register(&self, address: Address, secret: SecretKey) {
        if let Ok(mut keys) = self.keys.lock() {
            keys.insert(address, secret);
        }
    }

    /// Signs `payload` with the key held for `sender`.
    pub fn sign(&self, sender: &Address, payload: &[u8]) -> Result<Signature, ClientError> {
        let keys = self
            .keys
            .lock()
            .map_err(|_| ClientError::Connection("key ring lock poisoned".into()))?;
        let secret = keys.get(sender).ok_or_else(|| {
            ClientError::Connection(format!("no unlocked key for sender {sender}"))
        })?;
        Ok(Signature::sign(secret, &Message::new(payload)))
    }
}

fn address_of(secret: &SecretKey) -> Address {
    let hash = secret.public_key().hash();
    Address::new(*hash)
}

fn derive_accounts(secret_material: &[u8]) -> Result<Vec<(Address, SecretKey)>> {
    if let Ok(secret_key) = SecretKey::try_from(secret_material) {
        return Ok(vec![(address_of(&secret_key), secret_key)]);
    }

    if let Ok(mnemonic) = std::str::from_utf8(secret_material) {
        let word_count = mnemonic.split_whitespace().count();
        if word_count >= 12 {
            let mut accounts = Vec::with_capacity(MNEMONIC_ACCOUNT_COUNT);
            for index in 0..MNEMONIC_ACCOUNT_COUNT {
                let path = format!("m/44'/1179993420'/{index}'/0/0");
                let secret_key =
                    SecretKey::new_from_mnemonic_phrase_with_path(mnemonic, &path)?;
                accounts.push((address_of(&secret_key), secret_key));
            }
            return Ok(accounts);
        }
    }

    Err(eyre!("keystore contained unsupported key material"))
}

/// Identity agent backed by a forc-wallet style keystore directory.
///
/// Unlocking happens once, before the terminal UI takes over, because the
/// password prompt needs a cooked terminal. The session handshake later just
/// hands out the already-unlocked addresses.
pub struct KeystoreAgent {
    accounts: Vec<Address>,
    subscribers: Vec<mpsc::UnboundedSender<Vec<Address>>>,
}

impl KeystoreAgent {
    pub fn unlock(dir: &Path, name: &str, key_ring: &KeyRing) -> Result<Self> {
        let descriptor = find_wallet(dir, name).wrap_err("Unable to locate wallet")?;
        let prompt = format!("Enter password for wallet '{}': ", descriptor.name);
        let password =
            prompt_password(prompt).wrap_err("Failed to read wallet password")?;

        let secret_material = decrypt_key(&descriptor.path, password.as_bytes())
            .map_err(|_| eyre!("Invalid password for wallet '{}'", descriptor.name))?;

        let derived = derive_accounts(&secret_material)?;
        let mut accounts = Vec::with_capacity(derived.len());
        for (address, secret_key) in derived {
            key_ring.register(address, secret_key);
            accounts.push(address);
        }
        tracing::info!(
            wallet = descriptor.name,
            count = accounts.len(),
            "keystore unlocked"
        );

        Ok(Self {
            accounts,
            subscribers: Vec::new(),
        })
    }

    fn notify_subscribers(&mut self) {
        let accounts = self.accounts.clone();
        self.subscribers
            .retain(|sender| sender.send(accounts.clone()).is_ok());
    }
}

impl IdentityAgent for KeystoreAgent {
    async fn request_access(&mut self) -> Result<Vec<Address>, ClientError> {
        if self.accounts.is_empty() {
            return Err(ClientError::Connection(
                "the keystore holds no unlocked accounts".into(),
            ));
        }
        Ok(self.accounts.clone())
    }

    fn accounts(&self) -> Vec<Address> {
        self.accounts.clone()
    }

    fn subscribe_identity_changes(&mut self) -> mpsc::UnboundedReceiver<Vec<Address>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.push(sender);
        receiver
    }

    fn select_account(&mut self, index: usize) {
        if index == 0 || index >= self.accounts.len() {
            return;
        }
        self.accounts.rotate_left(index);
        self.notify_subscribers();
    }
}
