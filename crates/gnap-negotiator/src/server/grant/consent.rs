//! End-user authorization step.
//!
//! The interaction endpoint is where a real deployment would authenticate the
//! end user and ask for consent. That step is pluggable; the default approves
//! every interaction, which suits a single-user or test server.

use async_trait::async_trait;

use crate::models::Transaction;

/// Outcome of the authorization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Denied,
}

/// Decides whether the end user grants the transaction.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, transaction: &Transaction) -> Decision;
}

/// Approves every interaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl Authorizer for AutoApprove {
    async fn authorize(&self, transaction: &Transaction) -> Decision {
        tracing::debug!(transaction = %transaction.log_id(), "Auto-approved interaction");
        Decision::Approved
    }
}

/// Denies every interaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl Authorizer for DenyAll {
    async fn authorize(&self, _transaction: &Transaction) -> Decision {
        Decision::Denied
    }
}
