// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod crypto;
pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod observer;
pub mod session;
pub mod storage;
pub mod utils;
pub mod wallet_client;

pub use config::{ChainConfig, ChainRegistry, Config, TokenInfo, TokenResolver};
pub use delivery::{CallbackServer, DeliveredCiphertext};
pub use dispatch::{DispatchOutcome, DispatchRequest, FeePreference, TransactionDispatcher};
pub use error::{AgentWalletError, ErrorReport, Result};
pub use session::{
    build_permission_params, PermissionFlags, RequestRegistry, SessionEnvelope, SessionLinker,
    SessionRequest, WalletSession, WalletSessionStore,
};
pub use storage::{CredentialStore, RecordKind};
pub use wallet_client::{FeeOption, Transaction, WalletClient};
