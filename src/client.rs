use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Welshcorgicoin contract on the Stacks blockchain.
pub const CONTRACT_ADDRESS: &str = "SP3NE50GEXFG9SZGTT51P40X2CKYSZ5CC4ZTZ7A2G.welshcorgicoin-token";
/// Address the token was minted from; balances still held here are not circulating.
pub const MINT_ADDRESS: &str = "SP3NE50GEXFG9SZGTT51P40X2CKYSZ5CC4ZTZ7A2G";

const TOKEN_NAME: &str = "welshcorgicoin";
const BALANCES_UNTIL_BLOCK: u64 = 60000;

// Largest f64 with exact integer representation (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Error, Debug)]
pub enum SupplyError {
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("token {0} not found in mint address balances")]
    TokenNotFound(String),
}

/// Token metadata as served by `/metadata/v1/ft/{contract}`. Base-unit counts
/// arrive as decimal strings and can exceed 32-bit range.
#[derive(Clone, Debug, Deserialize)]
struct TokenMetadata {
    decimals: u32,
    total_supply: String,
}

#[derive(Clone, Debug, Deserialize)]
struct FungibleTokenBalance {
    total_sent: String,
}

#[derive(Clone, Debug, Deserialize)]
struct AddressBalances {
    fungible_tokens: HashMap<String, FungibleTokenBalance>,
}

/// A supply figure ready for the wire. Whole values serialize as JSON
/// integers so `1000000` is emitted rather than `1000000.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SupplyValue(f64);

impl Serialize for SupplyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0.abs() < MAX_SAFE_INTEGER {
            serializer.serialize_i64(self.0 as i64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_url: String,
    scale_by_decimals: bool,
}

impl Client {
    pub fn new(http: reqwest::Client, api_url: String, scale_by_decimals: bool) -> Self {
        Self {
            http,
            api_url,
            scale_by_decimals,
        }
    }

    /// Total supply of the token, taken from the metadata endpoint. Scaled to
    /// display units when the client is configured to divide by decimals.
    pub async fn get_total_supply(&self) -> Result<SupplyValue, SupplyError> {
        let metadata = self.fetch_metadata().await?;
        let raw = parse_base_units(&metadata.total_supply)?;

        if self.scale_by_decimals {
            Ok(scale(raw, metadata.decimals))
        } else {
            Ok(SupplyValue(raw))
        }
    }

    /// Circulating supply: everything sent out of the mint address, read from
    /// the balances endpoint bounded at block 60000. The scaled flavour
    /// fetches metadata first for the decimals, matching the historical call
    /// order; the unscaled flavour makes no metadata call at all.
    pub async fn get_circulating_supply(&self) -> Result<SupplyValue, SupplyError> {
        let decimals = if self.scale_by_decimals {
            Some(self.fetch_metadata().await?.decimals)
        } else {
            None
        };

        let balances = self.fetch_mint_balances().await?;

        let key = format!("{CONTRACT_ADDRESS}::{TOKEN_NAME}");
        let token = balances
            .fungible_tokens
            .get(&key)
            .ok_or(SupplyError::TokenNotFound(key))?;

        let sent = parse_base_units(&token.total_sent)?;

        Ok(match decimals {
            Some(d) => scale(sent, d),
            None => SupplyValue(sent),
        })
    }

    async fn fetch_metadata(&self) -> Result<TokenMetadata, SupplyError> {
        self.get_json(format!(
            "{}/metadata/v1/ft/{}",
            self.api_url, CONTRACT_ADDRESS
        ))
        .await
    }

    async fn fetch_mint_balances(&self) -> Result<AddressBalances, SupplyError> {
        self.get_json(format!(
            "{}/extended/v1/address/{}/balances?until_block={}",
            self.api_url, MINT_ADDRESS, BALANCES_UNTIL_BLOCK
        ))
        .await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, SupplyError> {
        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SupplyError::Upstream(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SupplyError::Upstream(format!(
                "{url} returned {status}: {body}"
            )));
        }

        res.json::<T>()
            .await
            .map_err(|e| SupplyError::Upstream(format!("{url} returned malformed body: {e}")))
    }
}

fn parse_base_units(s: &str) -> Result<f64, SupplyError> {
    s.parse::<f64>()
        .map_err(|e| SupplyError::Upstream(format!("unparseable base-unit count {s:?}: {e}")))
}

fn scale(base_units: f64, decimals: u32) -> SupplyValue {
    SupplyValue(base_units / 10f64.powi(decimals as i32))
}
