// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Credential generation.
//!
//! Two distinct secrets exist per the platform's capability model:
//! - the tenant **API key**, presented on every authenticated API call
//! - the per-instance **token**, authorizing send operations on one instance
//!
//! Both are 32 bytes of CSPRNG output, hex encoded (64 characters), matching
//! the unique `VARCHAR(64)` columns in the schema.

use chrono::Utc;
use rand::RngCore;
use uuid::Uuid;

/// Length in bytes of generated secrets (API keys and instance tokens).
const SECRET_LEN: usize = 32;

/// Generate a tenant API key: 64 hex characters of cryptographically random data.
pub fn generate_api_key() -> String {
    random_hex(SECRET_LEN)
}

/// Generate an instance token: 64 hex characters of cryptographically random data.
pub fn generate_instance_token() -> String {
    random_hex(SECRET_LEN)
}

/// Generate a globally-unique instance name for a tenant.
///
/// The name combines a tenant id prefix, a millisecond timestamp, and a
/// random suffix, so collisions are not possible in practice even for a
/// tenant provisioning concurrently.
pub fn generate_instance_name(tenant_id: Uuid) -> String {
    let tenant_prefix = tenant_id.simple().to_string();
    format!(
        "wa_{}_{}_{}",
        &tenant_prefix[..8],
        Utc::now().timestamp_millis(),
        random_hex(4)
    )
}

fn random_hex(len: usize) -> String {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}
