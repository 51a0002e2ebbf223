// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Transaction builders for `send` and `call`

use crate::config::TokenInfo;
use crate::error::{AgentWalletError, Result};
use crate::utils::{parse_address, to_base_units};
use crate::wallet_client::Transaction;
use ethers::abi::{encode, Token};
use ethers::types::{Bytes, U256};

/// `transfer(address,uint256)`
pub const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Transfer `amount` (human units) of `token` to `to`
///
/// Native tokens become a plain value transfer; ERC-20 tokens become a
/// `transfer` call on the token contract with zero value.
pub fn token_transfer(token: &TokenInfo, to: &str, amount: &str) -> Result<Transaction> {
    let recipient = parse_address("--to", to)?;
    let units = to_base_units(amount, token.decimals)?;

    match &token.address {
        None => Ok(Transaction {
            to: recipient,
            value: units,
            data: Bytes::default(),
        }),
        Some(contract) => {
            let contract = parse_address(&token.symbol, contract)?;
            let mut data = ERC20_TRANSFER_SELECTOR.to_vec();
            data.extend(encode(&[Token::Address(recipient), Token::Uint(units)]));
            Ok(Transaction {
                to: contract,
                value: U256::zero(),
                data: data.into(),
            })
        }
    }
}

/// Raw call: `value` in base units (decimal), `data` as hex
pub fn contract_call(to: &str, value: Option<&str>, data: Option<&str>) -> Result<Transaction> {
    let to = parse_address("--to", to)?;

    let value = match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => U256::from_dec_str(v).map_err(|_| {
            AgentWalletError::usage(format!("--value must be an integer in base units, got '{}'", v))
        })?,
        None => U256::zero(),
    };

    let data = match data.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => {
            let hex_str = d.strip_prefix("0x").unwrap_or(d);
            hex::decode(hex_str)
                .map_err(|e| AgentWalletError::usage(format!("--data is not valid hex: {}", e)))?
        }
        None => Vec::new(),
    };

    if value.is_zero() && data.is_empty() {
        return Err(AgentWalletError::usage(
            "call needs --data, --value, or both",
        ));
    }

    Ok(Transaction {
        to,
        value,
        data: data.into(),
    })
}
