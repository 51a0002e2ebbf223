// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod dispatcher;
pub mod fee;
pub mod tx;

pub use dispatcher::{DispatchOutcome, DispatchRequest, TransactionDispatcher};
pub use fee::{FeePreference, FeeResolver};
pub use tx::{contract_call, token_transfer, ERC20_TRANSFER_SELECTOR};
