// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::{print_json, AppContext};
use crate::config::{ChainConfig, TokenResolver};
use crate::dispatch::{contract_call, token_transfer, DispatchRequest, FeePreference};
use crate::error::AgentWalletError;
use crate::utils::{checksum, parse_address};
use crate::wallet_client::{fetch_balances, Transaction};
use anyhow::Result;
use clap::Args;
use serde_json::json;

#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// Linked wallet to inspect
    #[arg(long, required_unless_present = "address", conflicts_with = "address")]
    pub name: Option<String>,

    /// Any address instead of a linked wallet
    #[arg(long)]
    pub address: Option<String>,

    /// Chain name or id (defaults to the wallet's chain)
    #[arg(long)]
    pub chain: Option<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[arg(long)]
    pub name: String,

    /// Recipient address
    #[arg(long)]
    pub to: String,

    /// Amount in human units, e.g. 1.5
    #[arg(long)]
    pub amount: String,

    /// Token symbol (defaults to the chain's native currency)
    #[arg(long)]
    pub token: Option<String>,

    /// Must match the wallet's chain when given
    #[arg(long)]
    pub chain: Option<String>,

    /// Preferred fee asset: "native" or a token symbol
    #[arg(long)]
    pub fee_token: Option<String>,

    /// Sign and relay; without it only a dry run is printed
    #[arg(long)]
    pub broadcast: bool,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    #[arg(long)]
    pub name: String,

    /// Contract address
    #[arg(long)]
    pub to: String,

    /// Hex calldata
    #[arg(long)]
    pub data: Option<String>,

    /// Value in base units (wei)
    #[arg(long)]
    pub value: Option<String>,

    #[arg(long)]
    pub chain: Option<String>,

    #[arg(long)]
    pub fee_token: Option<String>,

    #[arg(long)]
    pub broadcast: bool,
}

fn requested_chain<'a>(ctx: &'a AppContext, chain: Option<&str>) -> Result<Option<&'a ChainConfig>> {
    Ok(chain.map(|c| ctx.chains.resolve(c)).transpose()?)
}

pub async fn balance(ctx: &AppContext, args: BalanceArgs) -> Result<()> {
    let requested = requested_chain(ctx, args.chain.as_deref())?;

    let (owner, chain) = match (&args.name, &args.address) {
        (Some(name), _) => {
            let session = ctx.wallets().require(name)?;
            let chain = match requested {
                Some(chain) => chain,
                None => ctx.chains.get_chain(session.chain_id).ok_or_else(|| {
                    AgentWalletError::Storage(format!(
                        "wallet '{}' references unsupported chain {}",
                        name, session.chain_id
                    ))
                })?,
            };
            (parse_address("walletAddress", &session.wallet_address)?, chain)
        }
        (None, Some(address)) => {
            let chain = match requested {
                Some(chain) => chain,
                None => ctx.chains.resolve(&ctx.chains.default_chain().to_string())?,
            };
            (parse_address("--address", address)?, chain)
        }
        (None, None) => {
            return Err(AgentWalletError::usage("pass --name or --address").into());
        }
    };

    let balances = fetch_balances(&ctx.balance_provider(), chain, owner).await?;
    print_json(&json!({
        "address": checksum(&owner),
        "chainId": chain.chain_id,
        "chain": chain.name,
        "balances": balances,
    }))
}

/// The chain a dispatch will run on: the requested one, else the wallet's
fn dispatch_chain<'a>(
    ctx: &'a AppContext,
    wallet_name: &str,
    chain: Option<&str>,
) -> Result<&'a ChainConfig> {
    if let Some(chain) = requested_chain(ctx, chain)? {
        return Ok(chain);
    }
    let session = ctx.wallets().require(wallet_name)?;
    Ok(ctx.chains.get_chain(session.chain_id).ok_or_else(|| {
        AgentWalletError::Storage(format!(
            "wallet '{}' references unsupported chain {}",
            wallet_name, session.chain_id
        ))
    })?)
}

async fn dispatch(
    ctx: &AppContext,
    wallet_name: String,
    chain: &ChainConfig,
    requested: bool,
    transaction: Transaction,
    fee_token: Option<&str>,
    broadcast: bool,
) -> Result<()> {
    let outcome = ctx
        .dispatcher()?
        .execute(DispatchRequest {
            wallet_name,
            chain_id: requested.then_some(chain.chain_id),
            transactions: vec![transaction],
            broadcast,
            fee_preference: FeePreference::parse(fee_token, chain),
        })
        .await?;
    print_json(&outcome)
}

pub async fn send(ctx: &AppContext, args: SendArgs) -> Result<()> {
    let chain = dispatch_chain(ctx, &args.name, args.chain.as_deref())?;
    let symbol = args
        .token
        .clone()
        .unwrap_or_else(|| chain.native_token.symbol.clone());
    let token = ctx.chains.resolve_token(chain.chain_id, &symbol)?;
    let transaction = token_transfer(&token, &args.to, &args.amount)?;

    dispatch(
        ctx,
        args.name,
        chain,
        args.chain.is_some(),
        transaction,
        args.fee_token.as_deref(),
        args.broadcast,
    )
    .await
}

pub async fn call(ctx: &AppContext, args: CallArgs) -> Result<()> {
    let chain = dispatch_chain(ctx, &args.name, args.chain.as_deref())?;
    let transaction = contract_call(&args.to, args.value.as_deref(), args.data.as_deref())?;

    dispatch(
        ctx,
        args.name,
        chain,
        args.chain.is_some(),
        transaction,
        args.fee_token.as_deref(),
        args.broadcast,
    )
    .await
}
