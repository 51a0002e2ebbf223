// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::{print_json, AppContext};
use crate::delivery::{read_manual_ciphertext, CallbackServer};
use crate::error::AgentWalletError;
use crate::session::{build_permission_params, LinkOptions, PermissionFlags};
use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Subcommand, Debug)]
pub enum WalletCommand {
    /// Create a link request and print the approval URL
    Create(CreateArgs),
    /// Ingest the ciphertext returned by the approval page
    Ingest(IngestArgs),
    /// List linked wallets
    List,
    /// Show one linked wallet
    Show(NameArgs),
    /// Forget a linked wallet
    Remove(NameArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Local name for the wallet
    #[arg(long)]
    pub name: String,

    /// Chain name or numeric id
    #[arg(long, default_value = "polygon")]
    pub chain: String,

    /// Project access key (defaults to AGENT_WALLET_ACCESS_KEY, then the stored builder key)
    #[arg(long)]
    pub access_key: Option<String>,

    /// Native currency spending ceiling
    #[arg(long)]
    pub native_limit: Option<String>,

    /// USDC spending ceiling
    #[arg(long)]
    pub usdc_limit: Option<String>,

    /// Extra token ceiling as SYMBOL:amount (repeatable)
    #[arg(long)]
    pub token_limit: Vec<String>,

    /// One-off USDC grant recipient (requires --usdc-amount)
    #[arg(long)]
    pub usdc_to: Option<String>,

    /// One-off USDC grant amount (requires --usdc-to)
    #[arg(long)]
    pub usdc_amount: Option<String>,

    /// Contract the session may call (repeatable)
    #[arg(long)]
    pub contract: Vec<String>,

    /// Wait for the approval page to post back to a local listener
    #[arg(long)]
    pub callback: bool,

    /// Callback wait in seconds (defaults to AGENT_WALLET_CALLBACK_TIMEOUT_SECS)
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Request id printed by `wallet create` (auto-detected from --name when omitted)
    #[arg(long)]
    pub request_id: Option<String>,

    #[arg(long)]
    pub name: Option<String>,

    /// Ciphertext, or @path to read it from a file
    #[arg(long)]
    pub ciphertext: Option<String>,

    /// File holding the ciphertext
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct NameArgs {
    #[arg(long)]
    pub name: String,
}

pub async fn run(ctx: &AppContext, cmd: WalletCommand) -> Result<()> {
    match cmd {
        WalletCommand::Create(args) => create(ctx, args).await,
        WalletCommand::Ingest(args) => ingest(ctx, args),
        WalletCommand::List => list(ctx),
        WalletCommand::Show(args) => show(ctx, args),
        WalletCommand::Remove(args) => remove(ctx, args),
    }
}

fn resolve_access_key(ctx: &AppContext, flag: Option<String>) -> Result<Option<String>> {
    if flag.is_some() {
        return Ok(flag);
    }
    if let Some(key) = &ctx.config.access_key {
        return Ok(Some(key.clone()));
    }
    Ok(ctx.builder().load()?.map(|identity| identity.access_key))
}

async fn create(ctx: &AppContext, args: CreateArgs) -> Result<()> {
    let flags = PermissionFlags {
        native_limit: args.native_limit,
        usdc_limit: args.usdc_limit,
        token_limits: args.token_limit,
        usdc_to: args.usdc_to,
        usdc_amount: args.usdc_amount,
        contracts: args.contract,
    };
    // Flag errors must surface before a request is persisted
    let permissions = build_permission_params(&flags)?;
    let access_key = resolve_access_key(ctx, args.access_key)?;

    if !args.callback {
        let link = ctx.requests().create_request(
            &args.name,
            &args.chain,
            access_key,
            &LinkOptions {
                permissions,
                callback_url: None,
            },
        )?;
        return print_json(&json!({
            "status": "pending",
            "requestId": link.request.request_id,
            "walletName": link.request.wallet_name,
            "chainId": link.request.chain_id,
            "expiresAt": link.request.expires_at.to_rfc3339(),
            "approvalUrl": link.approval_url.as_str(),
            "nextStep": format!(
                "open approvalUrl, approve, then run: agent-wallet wallet ingest --request-id {} --ciphertext <ciphertext>",
                link.request.request_id
            ),
        }));
    }

    let server = CallbackServer::bind().await?;
    let link = ctx.requests().create_request(
        &args.name,
        &args.chain,
        access_key,
        &LinkOptions {
            permissions,
            callback_url: Some(server.callback_url()),
        },
    )?;
    let timeout = args
        .timeout
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(ctx.config.callback_timeout);

    eprintln!("🔗 Open this URL to approve the wallet session:\n{}", link.approval_url);
    eprintln!("⏳ Waiting up to {}s for the approval page...", timeout.as_secs());

    let delivered = server.wait(timeout).await?;
    if let Some(hint) = &delivered.request_id {
        if *hint != link.request.request_id {
            warn!(
                "⚠️ Callback named request {} while waiting for {}",
                hint, link.request.request_id
            );
        }
    }

    let session = ctx.linker().ingest(
        Some(&link.request.request_id),
        Some(&link.request.wallet_name),
        &delivered.ciphertext,
    )?;
    print_json(&json!({
        "status": "linked",
        "wallet": session.summary(Utc::now()),
    }))
}

fn ingest(ctx: &AppContext, args: IngestArgs) -> Result<()> {
    let delivered = read_manual_ciphertext(args.ciphertext.as_deref(), args.file.as_deref())?;
    let request_id = args.request_id.or(delivered.request_id);
    if request_id.is_none() && args.name.is_none() {
        return Err(AgentWalletError::usage(
            "pass --request-id, or --name to auto-detect the pending request",
        )
        .into());
    }

    let session =
        ctx.linker()
            .ingest(request_id.as_deref(), args.name.as_deref(), &delivered.ciphertext)?;
    info!("Wallet '{}' ready", session.wallet_name);
    print_json(&json!({
        "status": "linked",
        "wallet": session.summary(Utc::now()),
    }))
}

fn list(ctx: &AppContext) -> Result<()> {
    let now = Utc::now();
    let summaries: Vec<_> = ctx
        .wallets()
        .list()?
        .iter()
        .map(|session| session.summary(now))
        .collect();
    print_json(&json!({ "wallets": summaries }))
}

fn show(ctx: &AppContext, args: NameArgs) -> Result<()> {
    let session = ctx.wallets().require(&args.name)?;
    print_json(&session.summary(Utc::now()))
}

fn remove(ctx: &AppContext, args: NameArgs) -> Result<()> {
    if !ctx.wallets().remove(&args.name)? {
        return Err(AgentWalletError::wallet_not_found(&args.name).into());
    }
    print_json(&json!({ "removed": args.name }))
}
