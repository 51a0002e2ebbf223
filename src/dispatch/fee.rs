// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fee-option resolution
//!
//! Three tiers, tried in order:
//! 1. **simulate**: ask the runtime for quoted fee options (skipped when a
//!    non-native token was explicitly requested)
//! 2. **fee tokens**: pick a listed token the wallet actually holds, falling back
//!    to USDC, priced with the chain table's hand-tuned estimates
//! 3. **simulate again**, unconditionally
//!
//! Failures inside a tier are expected and only logged at debug level.
//! When every tier fails the error carries the retry's cause.

use crate::config::{ChainConfig, TokenResolver, STABLE_SYMBOL};
use crate::error::{AgentWalletError, Result};
use crate::utils::to_base_units;
use crate::wallet_client::{BalanceProvider, FeeOption, FeeToken, Transaction, WalletClient};
use ethers::types::{Address, U256};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeePreference {
    #[default]
    Default,
    Native,
    Token(String),
}

impl FeePreference {
    /// `--fee-token` value: `native`, the chain's native symbol, or a token symbol
    pub fn parse(value: Option<&str>, chain: &ChainConfig) -> Self {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => FeePreference::Default,
            Some(v)
                if v.eq_ignore_ascii_case("native")
                    || v.eq_ignore_ascii_case(&chain.native_token.symbol) =>
            {
                FeePreference::Native
            }
            Some(v) => FeePreference::Token(v.to_ascii_uppercase()),
        }
    }
}

fn is_native_token(token: &FeeToken) -> bool {
    token.address.map(|a| a == Address::zero()).unwrap_or(true)
}

fn pick_quoted(mut options: Vec<FeeOption>, preference: &FeePreference) -> Option<FeeOption> {
    let preferred = match preference {
        FeePreference::Native => options.iter().position(FeeOption::is_native),
        FeePreference::Token(symbol) => options
            .iter()
            .position(|o| o.symbol.eq_ignore_ascii_case(symbol)),
        FeePreference::Default => None,
    };
    match preferred {
        Some(index) => Some(options.swap_remove(index)),
        None if options.is_empty() => None,
        None => Some(options.swap_remove(0)),
    }
}

pub struct FeeResolver<'a> {
    pub client: &'a dyn WalletClient,
    pub balances: Option<&'a dyn BalanceProvider>,
    pub tokens: &'a dyn TokenResolver,
    pub chain: &'a ChainConfig,
    pub wallet: Address,
}

impl<'a> FeeResolver<'a> {
    /// `Ok(None)` when the runtime reports that no fee is required
    pub async fn resolve(
        &self,
        transactions: &[Transaction],
        preference: &FeePreference,
    ) -> Result<Option<FeeOption>> {
        if !matches!(preference, FeePreference::Token(_)) {
            match self.quote(transactions, preference).await {
                Ok(option) => return Ok(Some(option)),
                Err(cause) => debug!("Fee simulation unavailable: {}", cause),
            }
        }

        match self.from_fee_tokens(preference).await {
            Ok(option) => return Ok(option),
            Err(cause) => debug!("Fee token fallback failed: {}", cause),
        }

        self.quote(transactions, preference)
            .await
            .map(Some)
            .map_err(|cause| {
                debug!("Fee simulation retry failed: {}", cause);
                AgentWalletError::FeeResolution(cause)
            })
    }

    async fn quote(
        &self,
        transactions: &[Transaction],
        preference: &FeePreference,
    ) -> std::result::Result<FeeOption, String> {
        let options = self
            .client
            .get_fee_options(self.chain.chain_id, transactions)
            .await
            .map_err(|e| e.to_string())?;
        let option = pick_quoted(options, preference)
            .ok_or_else(|| "simulation returned no fee options".to_string())?;
        info!("💸 Fee quoted: {} {}", option.amount, option.symbol);
        Ok(option)
    }

    async fn holds(&self, token: &FeeToken, amount: U256) -> bool {
        let Some(balances) = self.balances else {
            return true;
        };
        let balance = match token.address.filter(|_| !is_native_token(token)) {
            None => balances.native_balance(self.chain, self.wallet).await,
            Some(address) => balances.token_balance(self.chain, address, self.wallet).await,
        };
        match balance {
            Ok(balance) => balance >= amount,
            Err(e) => {
                debug!("Balance lookup for {} failed: {}", token.symbol, e);
                false
            }
        }
    }

    fn fallback_amount(&self, token: &FeeToken) -> Option<U256> {
        let info = self
            .tokens
            .resolve_token(self.chain.chain_id, &token.symbol)
            .map_err(|e| debug!("No fallback fee for {}: {}", token.symbol, e))
            .ok()?;
        to_base_units(&info.fallback_fee, token.decimals)
            .map_err(|e| debug!("Bad fallback fee for {}: {}", token.symbol, e))
            .ok()
    }

    async fn from_fee_tokens(
        &self,
        preference: &FeePreference,
    ) -> std::result::Result<Option<FeeOption>, String> {
        let list = self
            .client
            .get_fee_tokens(self.chain.chain_id)
            .await
            .map_err(|e| e.to_string())?;
        if !list.fee_required {
            info!("💸 Relayer reports no fee required");
            return Ok(None);
        }
        let recipient = list
            .payment_address
            .ok_or_else(|| "fee token list has no payment address".to_string())?;
        if list.tokens.is_empty() {
            return Err("fee token list is empty".to_string());
        }

        let mut candidates: Vec<&FeeToken> = Vec::with_capacity(list.tokens.len());
        match preference {
            FeePreference::Native => candidates.extend(list.tokens.iter().filter(|t| is_native_token(t))),
            FeePreference::Token(symbol) => candidates.extend(
                list.tokens
                    .iter()
                    .filter(|t| t.symbol.eq_ignore_ascii_case(symbol)),
            ),
            FeePreference::Default => {}
        }
        for token in &list.tokens {
            if !candidates.iter().any(|c| std::ptr::eq(*c, token)) {
                candidates.push(token);
            }
        }

        let build = |token: &FeeToken, amount: U256| FeeOption {
            symbol: token.symbol.clone(),
            token_address: token.address.filter(|_| !is_native_token(token)),
            decimals: token.decimals,
            recipient,
            amount,
            gas_limit: 0,
        };

        for token in &candidates {
            let Some(amount) = self.fallback_amount(token) else {
                continue;
            };
            if self.holds(token, amount).await {
                info!("💸 Paying fee in {} ({})", token.symbol, amount);
                return Ok(Some(build(*token, amount)));
            }
            debug!("Wallet does not hold {} {}", amount, token.symbol);
        }

        let stable = list
            .tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(STABLE_SYMBOL))
            .ok_or_else(|| format!("no held fee token and {} is not accepted", STABLE_SYMBOL))?;
        let amount = self
            .fallback_amount(stable)
            .ok_or_else(|| format!("no fallback fee estimate for {}", STABLE_SYMBOL))?;
        info!("💸 Falling back to {} for fees", stable.symbol);
        Ok(Some(build(stable, amount)))
    }
}
