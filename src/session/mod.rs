// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod builder;
pub mod envelope;
pub mod ingest;
pub mod permissions;
pub mod request;
pub mod wallet;

pub use builder::{BuilderIdentity, BuilderStore};
pub use envelope::{
    decrypt_envelope, seal_envelope, validate_envelope, ExplicitSessionMaterial,
    ImplicitSessionMaterial, PermissionConfig, SessionEnvelope, ValidatedEnvelope,
};
pub use ingest::SessionLinker;
pub use permissions::{build_permission_params, PermissionFlags, PermissionParams, PermissionRule};
pub use request::{LinkOptions, PendingLink, RequestRegistry, SessionRequest, REQUEST_TTL_HOURS};
pub use wallet::{WalletSession, WalletSessionStore, WalletSummary};
