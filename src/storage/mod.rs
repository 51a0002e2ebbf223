// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod credential_store;

pub use credential_store::{validate_record_name, CredentialStore, RecordKind};
