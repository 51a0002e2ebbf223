// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fee resolution across the simulate / fee-token / retry tiers

use crate::common::{chains, fee_option, FixedBalances, RecordingWalletClient, WALLET_ADDRESS};
use agent_wallet::dispatch::{FeePreference, FeeResolver};
use agent_wallet::wallet_client::{FeeToken, FeeTokenList, Transaction};
use agent_wallet::AgentWalletError;
use ethers::types::{Address, Bytes, U256};

const USDC: &str = "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359";
const USDT: &str = "0xc2132D05D31c914a87C6611C10748AEb04B58e8F";

fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

fn transfer() -> Vec<Transaction> {
    vec![Transaction {
        to: Address::repeat_byte(0x44),
        value: U256::from(1u64),
        data: Bytes::default(),
    }]
}

fn polygon_fee_tokens() -> FeeTokenList {
    FeeTokenList {
        fee_required: true,
        payment_address: Some(Address::repeat_byte(0x99)),
        tokens: vec![
            FeeToken {
                symbol: "POL".into(),
                address: None,
                decimals: 18,
            },
            FeeToken {
                symbol: "USDC".into(),
                address: Some(addr(USDC)),
                decimals: 6,
            },
            FeeToken {
                symbol: "USDT".into(),
                address: Some(addr(USDT)),
                decimals: 6,
            },
        ],
    }
}

async fn resolve(
    client: &RecordingWalletClient,
    balances: &FixedBalances,
    preference: FeePreference,
) -> agent_wallet::Result<Option<agent_wallet::FeeOption>> {
    let registry = chains();
    let resolver = FeeResolver {
        client,
        balances: Some(balances),
        tokens: &*registry,
        chain: registry.get_chain(137).unwrap(),
        wallet: addr(WALLET_ADDRESS),
    };
    resolver.resolve(&transfer(), &preference).await
}

#[tokio::test]
async fn test_simulation_quote_used_first() {
    let client =
        RecordingWalletClient::new().with_fee_options(vec![vec![fee_option("POL", None)]]);

    let option = resolve(&client, &FixedBalances::default(), FeePreference::Default)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(option.symbol, "POL");
    assert_eq!(client.calls(), vec!["get_fee_options"]);
}

#[tokio::test]
async fn test_native_preference_picks_native_quote() {
    let client = RecordingWalletClient::new().with_fee_options(vec![vec![
        fee_option("USDC", Some(addr(USDC))),
        fee_option("POL", None),
    ]]);

    let option = resolve(&client, &FixedBalances::default(), FeePreference::Native)
        .await
        .unwrap()
        .unwrap();
    assert!(option.is_native());
}

#[tokio::test]
async fn test_token_preference_skips_simulation() {
    let client = RecordingWalletClient::new()
        .with_fee_options(vec![vec![fee_option("POL", None)]])
        .with_fee_tokens(polygon_fee_tokens());
    let balances = FixedBalances::default().holding(Some(addr(USDT)), U256::from(5_000_000u64));

    let option = resolve(&client, &balances, FeePreference::Token("USDT".into()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(option.symbol, "USDT");
    assert_eq!(option.token_address, Some(addr(USDT)));
    // 0.02 USDT at 6 decimals
    assert_eq!(option.amount, U256::from(20_000u64));
    assert_eq!(client.calls(), vec!["get_fee_tokens"]);
}

#[tokio::test]
async fn test_held_token_chosen_when_simulation_down() {
    let client = RecordingWalletClient::new().with_fee_tokens(polygon_fee_tokens());
    let balances = FixedBalances::default().holding(Some(addr(USDT)), U256::from(1_000_000u64));

    let option = resolve(&client, &balances, FeePreference::Default)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(option.symbol, "USDT");
    assert_eq!(option.recipient, Address::repeat_byte(0x99));
    assert_eq!(client.calls(), vec!["get_fee_options", "get_fee_tokens"]);
}

#[tokio::test]
async fn test_native_chosen_when_held() {
    let client = RecordingWalletClient::new().with_fee_tokens(polygon_fee_tokens());
    let balances = FixedBalances::default().holding(None, U256::exp10(18));

    let option = resolve(&client, &balances, FeePreference::Default)
        .await
        .unwrap()
        .unwrap();
    assert!(option.is_native());
    // 0.05 POL
    assert_eq!(option.amount, U256::from(50_000_000_000_000_000u64));
}

#[tokio::test]
async fn test_usdc_fallback_when_nothing_held() {
    let client = RecordingWalletClient::new().with_fee_tokens(polygon_fee_tokens());

    let option = resolve(&client, &FixedBalances::default(), FeePreference::Default)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(option.symbol, "USDC");
    assert_eq!(option.amount, U256::from(20_000u64));
}

#[tokio::test]
async fn test_no_fee_required() {
    let list = FeeTokenList {
        fee_required: false,
        payment_address: None,
        tokens: vec![],
    };
    let client = RecordingWalletClient::new().with_fee_tokens(list);

    let option = resolve(&client, &FixedBalances::default(), FeePreference::Default)
        .await
        .unwrap();
    assert_eq!(option, None);
}

#[tokio::test]
async fn test_retry_tier_succeeds_after_fee_tokens_fail() {
    let client = RecordingWalletClient::new().with_fee_answers(vec![
        Err("relayer busy".into()),
        Ok(vec![fee_option("POL", None)]),
    ]);

    let option = resolve(&client, &FixedBalances::default(), FeePreference::Default)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(option.symbol, "POL");
    assert_eq!(
        client.calls(),
        vec!["get_fee_options", "get_fee_tokens", "get_fee_options"]
    );
}

#[tokio::test]
async fn test_last_cause_comes_from_retry() {
    let client = RecordingWalletClient::new()
        .with_fee_answers(vec![Err("relayer busy".into()), Ok(vec![])]);

    let err = resolve(&client, &FixedBalances::default(), FeePreference::Default)
        .await
        .unwrap_err();
    match err {
        AgentWalletError::FeeResolution(cause) => {
            assert_eq!(cause, "simulation returned no fee options")
        }
        other => panic!("expected fee resolution error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_all_tiers_fail_reports_last_cause() {
    let client = RecordingWalletClient::new();

    let err = resolve(&client, &FixedBalances::default(), FeePreference::Token("USDT".into()))
        .await
        .unwrap_err();
    assert_eq!(err.label(), "fee_resolution_error");
    assert!(err.to_string().contains("simulation unavailable"));
}

#[tokio::test]
async fn test_error_carries_only_the_retry_cause() {
    let client = RecordingWalletClient::new().with_fee_answers(vec![
        Err("first simulation down".into()),
        Err("retry simulation down".into()),
    ]);

    let err = resolve(&client, &FixedBalances::default(), FeePreference::Default)
        .await
        .unwrap_err();
    let message = err.to_string();
    assert_eq!(err.label(), "fee_resolution_error");
    assert!(message.contains("retry simulation down"));
    assert!(!message.contains("first simulation down"));
    assert!(!message.contains("fee tokens unavailable"));
}
