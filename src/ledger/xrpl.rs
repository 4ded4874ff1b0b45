use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LedgerError;
use crate::model::DROPS_PER_XRP;

use super::{AccountBalance, LedgerQuery};

/// Error code the ledger returns for addresses that are not on ledger.
const ACCOUNT_NOT_FOUND: &str = "actNotFound";
/// All queries run against the last validated ledger, never a proposed one.
const VALIDATED_LEDGER: &str = "validated";

/// JSON-RPC client for an XRP Ledger node.
pub struct XrplClient {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct RpcRequest<P: Serialize> {
    method: &'static str,
    params: [P; 1],
}

#[derive(Serialize)]
struct AccountInfoParams<'a> {
    account: &'a str,
    ledger_index: &'a str,
}

#[derive(Serialize)]
struct AccountObjectsParams<'a> {
    account: &'a str,
    #[serde(rename = "type")]
    object_type: &'a str,
    ledger_index: &'a str,
}

#[derive(Deserialize)]
struct RpcEnvelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct AccountInfoResult {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    account_data: Option<AccountData>,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    #[serde(rename = "Balance")]
    balance: String,
}

#[derive(Debug, Deserialize)]
struct AccountObjectsResult {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    account_objects: Option<Vec<EscrowObject>>,
}

#[derive(Debug, Deserialize)]
struct EscrowObject {
    /// Escrowed amount in drops. Non-XRP escrows carry an object here
    /// instead of a string and are ignored.
    #[serde(rename = "Amount", default)]
    amount: Option<serde_json::Value>,
}

impl XrplClient {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    async fn call<P, R>(&self, method: &'static str, params: P) -> Result<R, LedgerError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            method,
            params: [params],
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let envelope: RpcEnvelope<R> = response
            .json()
            .await
            .map_err(|e| LedgerError::UnexpectedResponse(format!("{}: {}", method, e)))?;

        Ok(envelope.result)
    }
}

fn balance_from_result(result: AccountInfoResult) -> Result<AccountBalance, LedgerError> {
    if result.error.as_deref() == Some(ACCOUNT_NOT_FOUND) {
        return Ok(AccountBalance::not_found());
    }
    if let Some(error) = result.error {
        return Err(LedgerError::UnexpectedResponse(format!(
            "account_info error: {}",
            error
        )));
    }

    let data = result.account_data.ok_or_else(|| {
        LedgerError::UnexpectedResponse("account_info response without account_data".to_string())
    })?;
    let drops: Decimal = data.balance.parse().map_err(|e| {
        LedgerError::UnexpectedResponse(format!("unparseable balance {:?}: {}", data.balance, e))
    })?;

    Ok(AccountBalance::existing(drops / DROPS_PER_XRP))
}

fn escrow_sum_from_result(result: AccountObjectsResult) -> Result<Decimal, LedgerError> {
    // An account deleted between the balance and escrow queries simply
    // has nothing in escrow.
    if result.error.as_deref() == Some(ACCOUNT_NOT_FOUND) {
        return Ok(Decimal::ZERO);
    }
    if let Some(error) = result.error {
        return Err(LedgerError::UnexpectedResponse(format!(
            "account_objects error: {}",
            error
        )));
    }

    let mut total_drops = Decimal::ZERO;
    for object in result.account_objects.unwrap_or_default() {
        if let Some(amount) = object.amount.as_ref().and_then(|a| a.as_str()) {
            if let Ok(drops) = amount.parse::<Decimal>() {
                total_drops += drops;
            }
        }
    }

    Ok(total_drops / DROPS_PER_XRP)
}

#[async_trait]
impl LedgerQuery for XrplClient {
    async fn get_balance(&self, address: &str) -> Result<AccountBalance, LedgerError> {
        debug!("account_info {}", address);
        let result: AccountInfoResult = self
            .call(
                "account_info",
                AccountInfoParams {
                    account: address,
                    ledger_index: VALIDATED_LEDGER,
                },
            )
            .await?;
        balance_from_result(result)
    }

    async fn get_escrow_sum(&self, address: &str) -> Result<Decimal, LedgerError> {
        debug!("account_objects {}", address);
        let result: AccountObjectsResult = self
            .call(
                "account_objects",
                AccountObjectsParams {
                    account: address,
                    object_type: "escrow",
                    ledger_index: VALIDATED_LEDGER,
                },
            )
            .await?;
        escrow_sum_from_result(result)
    }
}
