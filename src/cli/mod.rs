// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod builder;
pub mod tx;
pub mod wallet;

use crate::config::{ChainRegistry, Config};
use crate::dispatch::TransactionDispatcher;
use crate::error::{AgentWalletError, ErrorReport};
use crate::observer::TracingObserver;
use crate::session::{BuilderStore, RequestRegistry, SessionLinker, WalletSessionStore};
use crate::storage::CredentialStore;
use crate::wallet_client::{HttpWalletClient, RpcBalanceProvider, WalletClient};
use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;

/// Delegated smart-wallet sessions for command-line agents
#[derive(Parser, Debug)]
#[command(name = "agent-wallet")]
#[command(version)]
#[command(about = "Link a spending-limited smart-wallet session and transact with it", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Link, ingest and manage wallet sessions
    #[command(subcommand)]
    Wallet(wallet::WalletCommand),

    /// Show native and token balances
    Balance(tx::BalanceArgs),

    /// Send native currency or an ERC-20 token
    Send(tx::SendArgs),

    /// Call a contract with raw calldata
    Call(tx::CallArgs),

    /// Manage the project access key attached to new link requests
    #[command(subcommand)]
    Builder(builder::BuilderCommand),
}

/// Shared services for one invocation, built from the resolved [`Config`]
pub struct AppContext {
    pub config: Config,
    pub chains: Arc<ChainRegistry>,
    pub store: CredentialStore,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let store = CredentialStore::open(&config.home, config.encryption_passphrase.as_deref())?;
        let chains = Arc::new(config.chain_registry());
        Ok(Self {
            config,
            chains,
            store,
        })
    }

    pub fn requests(&self) -> RequestRegistry {
        RequestRegistry::new(
            self.store.clone(),
            self.chains.clone(),
            self.config.approval_url.clone(),
        )
    }

    pub fn wallets(&self) -> WalletSessionStore {
        WalletSessionStore::new(self.store.clone())
    }

    pub fn builder(&self) -> BuilderStore {
        BuilderStore::new(self.store.clone())
    }

    pub fn linker(&self) -> SessionLinker {
        SessionLinker::new(self.requests(), self.wallets(), self.chains.clone())
    }

    pub fn wallet_client(&self) -> Result<Option<Arc<dyn WalletClient>>> {
        let Some(url) = &self.config.runtime_url else {
            return Ok(None);
        };
        let mut client = HttpWalletClient::new(url.clone())?;
        if self.config.debug_http {
            client = client.with_observer(Arc::new(TracingObserver));
        }
        Ok(Some(Arc::new(client)))
    }

    pub fn balance_provider(&self) -> RpcBalanceProvider {
        let provider = RpcBalanceProvider::new();
        if self.config.debug_http {
            return provider.with_observer(Arc::new(TracingObserver));
        }
        provider
    }

    pub fn dispatcher(&self) -> Result<TransactionDispatcher> {
        Ok(
            TransactionDispatcher::new(self.wallets(), self.chains.clone(), self.wallet_client()?)
                .with_balance_provider(Arc::new(self.balance_provider())),
        )
    }
}

/// Structured form of any error reaching the binary
pub fn error_report(err: &anyhow::Error) -> ErrorReport {
    match err.downcast_ref::<AgentWalletError>() {
        Some(domain) => domain.report(),
        None => ErrorReport {
            error: "internal_error".to_string(),
            message: format!("{:#}", err),
            next_step: "re-run with RUST_LOG=debug for details".to_string(),
            retryable: false,
        },
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Execute CLI command
pub async fn execute(cli: Cli, config: Config) -> Result<()> {
    let ctx = AppContext::new(config)?;
    match cli.command {
        Commands::Wallet(cmd) => wallet::run(&ctx, cmd).await,
        Commands::Balance(args) => tx::balance(&ctx, args).await,
        Commands::Send(args) => tx::send(&ctx, args).await,
        Commands::Call(args) => tx::call(&ctx, args).await,
        Commands::Builder(cmd) => builder::run(&ctx, cmd),
    }
}
