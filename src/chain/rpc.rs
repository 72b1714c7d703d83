use std::time::Duration;

use alloy::{
    primitives::{Address, U256},
    contract::Error as ContractError,
    providers::{DynProvider, ProviderBuilder},
    transports::RpcError,
};
use anyhow::{anyhow, Context, Result};
use log::debug;
use tokio::time::error::Elapsed;
use url::Url;

use crate::{
    abis::{IERC20, IMetaSwap, ISwap, IXSwapDeposit},
    chain::{ChainReader, SwapStorage, TokenMetadata},
};

/// Timeout for individual RPC calls (30 seconds)
const RPC_CALL_TIMEOUT: Duration = Duration::from_secs(30);

type CallOutcome<T> = Result<Result<T, ContractError>, Elapsed>;

/// Whether the contract itself refused the call: a reverted `eth_call`, an
/// empty return or undecodable return data. Connection failures, HTTP
/// errors and rate limiting are transport trouble.
fn is_contract_failure(error: &ContractError) -> bool {
    match error {
        ContractError::TransportError(RpcError::ErrorResp(payload)) => !payload.is_retry_err(),
        ContractError::ZeroData(..) | ContractError::AbiError(_) => true,
        _ => false,
    }
}

/// Probe classification: a call the contract refused means "no value here",
/// anything else is an error.
fn probe<T>(what: &str, outcome: CallOutcome<T>) -> Result<Option<T>> {
    match outcome {
        Ok(Ok(value)) => Ok(Some(value)),
        Ok(Err(e)) if is_contract_failure(&e) => {
            debug!("{} failed: {}", what, e);
            Ok(None)
        },
        Ok(Err(e)) => Err(anyhow::Error::new(e).context(format!("{} failed", what))),
        Err(_) => Err(anyhow!("{} timed out after {:?}", what, RPC_CALL_TIMEOUT)),
    }
}

fn required<T>(what: &str, outcome: CallOutcome<T>) -> Result<T> {
    outcome
        .map_err(|_| anyhow!("{} timed out after {:?}", what, RPC_CALL_TIMEOUT))?
        .with_context(|| format!("{} failed", what))
}

/// JSON-RPC backed contract reader.
#[derive(Clone)]
pub struct RpcReader {
    provider: DynProvider,
}

impl RpcReader {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = Url::parse(rpc_url).context("Invalid RPC URL")?;

        let client = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            provider: DynProvider::new(client),
        })
    }
}

impl ChainReader for RpcReader {
    async fn get_token(&self, pool: Address, index: u8) -> Result<Option<Address>> {
        let swap = ISwap::new(pool, &self.provider);
        let call = swap.getToken(index);
        let outcome = tokio::time::timeout(RPC_CALL_TIMEOUT, call.call()).await;
        probe(&format!("{}.getToken({})", pool, index), outcome)
    }

    async fn get_token_balance(&self, pool: Address, index: u8) -> Result<Option<U256>> {
        let swap = ISwap::new(pool, &self.provider);
        let call = swap.getTokenBalance(index);
        let outcome = tokio::time::timeout(RPC_CALL_TIMEOUT, call.call()).await;
        probe(&format!("{}.getTokenBalance({})", pool, index), outcome)
    }

    async fn underlying_coin(&self, wrapper: Address, index: u64) -> Result<Option<Address>> {
        let deposit = IXSwapDeposit::new(wrapper, &self.provider);
        let call = deposit.UNDERLYING_COINS(U256::from(index));
        let outcome = tokio::time::timeout(RPC_CALL_TIMEOUT, call.call()).await;
        probe(&format!("{}.UNDERLYING_COINS({})", wrapper, index), outcome)
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<Option<U256>> {
        let erc20 = IERC20::new(token, &self.provider);
        let call = erc20.balanceOf(owner);
        let outcome = tokio::time::timeout(RPC_CALL_TIMEOUT, call.call()).await;
        probe(&format!("{}.balanceOf({})", token, owner), outcome)
    }

    async fn token_metadata(&self, token: Address) -> TokenMetadata {
        let erc20 = IERC20::new(token, &self.provider);
        let decimals_call = erc20.decimals();
        let symbol_call = erc20.symbol();
        let name_call = erc20.name();

        let (decimals, symbol, name) = futures::join!(
            tokio::time::timeout(RPC_CALL_TIMEOUT, decimals_call.call()),
            tokio::time::timeout(RPC_CALL_TIMEOUT, symbol_call.call()),
            tokio::time::timeout(RPC_CALL_TIMEOUT, name_call.call()),
        );

        TokenMetadata {
            decimals: decimals.ok().and_then(|r| r.ok()),
            symbol: symbol.ok().and_then(|r| r.ok()),
            name: name.ok().and_then(|r| r.ok()),
        }
    }

    async fn get_a(&self, pool: Address) -> Result<U256> {
        let swap = ISwap::new(pool, &self.provider);
        let call = swap.getA();
        let outcome = tokio::time::timeout(RPC_CALL_TIMEOUT, call.call()).await;
        required(&format!("{}.getA()", pool), outcome)
    }

    async fn swap_storage(&self, pool: Address) -> Result<SwapStorage> {
        let swap = ISwap::new(pool, &self.provider);
        let call = swap.swapStorage();
        let outcome = tokio::time::timeout(RPC_CALL_TIMEOUT, call.call()).await;
        let storage = required(&format!("{}.swapStorage()", pool), outcome)?;

        Ok(SwapStorage {
            swap_fee: storage.swapFee,
            admin_fee: storage.adminFee,
            lp_token: storage.lpToken,
        })
    }

    async fn virtual_price(&self, pool: Address) -> Result<U256> {
        let swap = ISwap::new(pool, &self.provider);
        let call = swap.getVirtualPrice();
        let outcome = tokio::time::timeout(RPC_CALL_TIMEOUT, call.call()).await;
        required(&format!("{}.getVirtualPrice()", pool), outcome)
    }

    async fn owner(&self, contract: Address) -> Result<Address> {
        let swap = ISwap::new(contract, &self.provider);
        let call = swap.owner();
        let outcome = tokio::time::timeout(RPC_CALL_TIMEOUT, call.call()).await;
        required(&format!("{}.owner()", contract), outcome)
    }

    async fn meta_swap_base(&self, pool: Address) -> Result<Address> {
        let meta = IMetaSwap::new(pool, &self.provider);
        let call = meta.metaSwapStorage();
        let outcome = tokio::time::timeout(RPC_CALL_TIMEOUT, call.call()).await;
        let storage = required(&format!("{}.metaSwapStorage()", pool), outcome)?;
        Ok(storage.baseSwap)
    }

    async fn base_pool(&self, wrapper: Address) -> Result<Address> {
        let deposit = IXSwapDeposit::new(wrapper, &self.provider);
        let call = deposit.BASE_POOL();
        let outcome = tokio::time::timeout(RPC_CALL_TIMEOUT, call.call()).await;
        required(&format!("{}.BASE_POOL()", wrapper), outcome)
    }

    async fn price_oracle(&self, wrapper: Address) -> Result<U256> {
        let deposit = IXSwapDeposit::new(wrapper, &self.provider);
        let call = deposit.priceOracle();
        let outcome = tokio::time::timeout(RPC_CALL_TIMEOUT, call.call()).await;
        required(&format!("{}.priceOracle()", wrapper), outcome)
    }

    async fn meta_lp_token(&self, wrapper: Address) -> Result<Address> {
        let deposit = IXSwapDeposit::new(wrapper, &self.provider);
        let call = deposit.META_LPTOKEN();
        let outcome = tokio::time::timeout(RPC_CALL_TIMEOUT, call.call()).await;
        required(&format!("{}.META_LPTOKEN()", wrapper), outcome)
    }
}
