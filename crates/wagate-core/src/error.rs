// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for wagate.
//!
//! Every fallible platform operation surfaces one of these variants; the HTTP
//! layer maps each to a status code and response envelope.

use thiserror::Error;

/// Result type using wagate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Platform errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Missing or unknown tenant credential.
    #[error("{0}")]
    Unauthorized(String),

    /// Tenant is known but not in `active` status.
    #[error("{0}")]
    Forbidden(String),

    /// Tenant has reached its instance quota.
    #[error("Phone number limit reached: {current} of {max}")]
    QuotaExceeded {
        /// The tenant's current non-deleted instance count.
        current: i64,
        /// The tenant's configured maximum.
        max: i64,
    },

    /// Tenant or instance lookup miss.
    #[error("{0}")]
    NotFound(String),

    /// Instance is not in a sendable state.
    #[error("Phone number not connected. Current status: {status}")]
    NotConnected {
        /// The instance's current lifecycle status.
        status: String,
    },

    /// Duplicate unique field (e.g. email already registered).
    #[error("{0}")]
    Conflict(String),

    /// Request validation failed.
    #[error("{0}")]
    Validation(String),

    /// An upstream gateway call failed (timeout, network, non-2xx).
    #[error("Upstream gateway error: {message}")]
    Upstream {
        /// The upstream's error message, or a transport error description.
        message: String,
    },

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the stable error code string for this error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NotConnected { .. } => "NOT_CONNECTED",
            Self::Conflict(_) => "CONFLICT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
