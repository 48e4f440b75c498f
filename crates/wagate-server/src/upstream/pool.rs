// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Round-robin upstream server selection.
//!
//! The pool holds the fixed, configured server list and a shared atomic
//! cursor. `next()` is the only mutation and is a single `fetch_add`, so
//! concurrent provisioning requests each get a distinct slot with no lock.
//! There is no health checking and no weighting: the i-th allocation always
//! lands on `servers[(i - 1) % len]`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin pool of upstream gateway base URLs.
#[derive(Debug, Clone)]
pub struct UpstreamPool {
    servers: Arc<Vec<String>>,
    cursor: Arc<AtomicUsize>,
}

impl UpstreamPool {
    /// Create a pool over the configured server list.
    ///
    /// The list must be non-empty; `Config::from_env` guarantees this for
    /// the production path.
    pub fn new(servers: Vec<String>) -> Self {
        assert!(!servers.is_empty(), "upstream pool requires at least one server");
        Self {
            servers: Arc::new(servers),
            cursor: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Return the next server in rotation, advancing the shared cursor.
    pub fn next(&self) -> &str {
        let slot = self.cursor.fetch_add(1, Ordering::Relaxed);
        &self.servers[slot % self.servers.len()]
    }

    /// The ordered server list.
    pub fn all(&self) -> &[String] {
        &self.servers
    }

    /// Number of servers in the pool.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether the pool is empty. Always false for a constructed pool.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
