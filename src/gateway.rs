use crate::{
    ledger::{
        ClientError,
        LedgerReader,
        LedgerWriter,
        RoundId,
        TxReceipt,
    },
    wallets::KeyRing,
};
use fuels::types::Address;
use reqwest::StatusCode;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
};

/// HTTP client for the lottery gateway, the single ledger endpoint this
/// session talks to. Reads are plain GETs; writes are signed envelopes, with
/// the signature produced from the key ring shared with the keystore agent.
#[derive(Clone)]
pub struct LedgerGateway {
    base_url: String,
    http: reqwest::Client,
    key_ring: KeyRing,
}

impl LedgerGateway {
    pub fn new(base_url: impl Into<String>, key_ring: KeyRing) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| ClientError::Rpc(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            base_url,
            http,
            key_ring,
        })
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, ClientError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| ClientError::Rpc(format!("GET {url} failed: {err}")))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ClientError::Rpc(format!("reading {url} failed: {err}")))?;
        if !status.is_success() {
            return Err(ClientError::Rpc(format!(
                "gateway responded with {status} for {url}: {}",
                String::from_utf8_lossy(&bytes)
            )));
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| ClientError::Rpc(format!("invalid payload from {url}: {err}")))
    }

    async fn post_signed(
        &self,
        method: &'static str,
        sender: &Address,
    ) -> Result<TxReceipt, ClientError> {
        let nonce: u64 = rand::random();
        let payload = format!("{method}|{sender}|{nonce}");
        let signature = self.key_ring.sign(sender, payload.as_bytes())?;
        let envelope = WriteEnvelopeDto {
            sender: sender.to_string(),
            nonce,
            signature: hex::encode(*signature),
        };

        let url = format!("{}/{method}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&envelope)
            .send()
            .await
            .map_err(|err| ClientError::Rpc(format!("POST {url} failed: {err}")))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ClientError::Rpc(format!("reading {url} failed: {err}")))?;
        if !status.is_success() {
            return Err(classify_write_failure(status, &bytes));
        }
        let receipt: ReceiptDto = serde_json::from_slice(&bytes)
            .map_err(|err| ClientError::Rpc(format!("invalid receipt from {url}: {err}")))?;
        Ok(TxReceipt {
            transaction_id: receipt.transaction_id,
        })
    }
}

fn parse_address(raw: &str) -> Result<Address, ClientError> {
    Address::from_str(raw)
        .map_err(|err| ClientError::Rpc(format!("invalid address '{raw}': {err}")))
}

fn classify_write_failure(status: StatusCode, body: &[u8]) -> ClientError {
    if status == StatusCode::CONFLICT {
        let reason = match serde_json::from_slice::<RevertDto>(body) {
            Ok(dto) => dto.reason,
            Err(_) => String::from_utf8_lossy(body).into_owned(),
        };
        return ClientError::Revert(reason);
    }
    ClientError::Rpc(format!(
        "gateway responded with {status}: {}",
        String::from_utf8_lossy(body)
    ))
}

impl LedgerReader for LedgerGateway {
    async fn current_round_id(&self) -> Result<RoundId, ClientError> {
        let dto: RoundDto = self.get_json("round").await?;
        Ok(dto.round_id)
    }

    async fn active_players(&self) -> Result<Vec<Address>, ClientError> {
        let dto: PlayersDto = self.get_json("players").await?;
        dto.players
            .iter()
            .map(|raw| parse_address(raw))
            .collect()
    }

    async fn round_winner(&self, round_id: RoundId) -> Result<Address, ClientError> {
        let dto: WinnerDto = self.get_json(&format!("round/{round_id}/winner")).await?;
        parse_address(&dto.winner)
    }
}

impl LedgerWriter for LedgerGateway {
    async fn submit_entry(&self, sender: &Address) -> Result<TxReceipt, ClientError> {
        self.post_signed("enter", sender).await
    }

    async fn submit_select_winner(
        &self,
        sender: &Address,
    ) -> Result<TxReceipt, ClientError> {
        self.post_signed("select-winner", sender).await
    }

    async fn submit_distribute_reward(
        &self,
        sender: &Address,
    ) -> Result<TxReceipt, ClientError> {
        self.post_signed("distribute-reward", sender).await
    }
}

impl fmt::Display for LedgerGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

#[derive(Deserialize)]
struct RoundDto {
    round_id: RoundId,
}

#[derive(Deserialize)]
struct PlayersDto {
    players: Vec<String>,
}

#[derive(Deserialize)]
struct WinnerDto {
    winner: String,
}

#[derive(Deserialize)]
struct RevertDto {
    reason: String,
}

#[derive(Deserialize)]
struct ReceiptDto {
    transaction_id: String,
}

#[derive(Serialize)]
struct WriteEnvelopeDto {
    sender: String,
    nonce: u64,
    signature: String,
}
