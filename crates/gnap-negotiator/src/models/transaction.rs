//! The grant transaction entity and its state machine.

use chrono::{DateTime, Utc};

use crate::crypto::{HashAlgorithm, Jwk};

/// Progress of a grant negotiation.
///
/// `Initialized` only exists while a transaction is being built; the engine
/// never stores a transaction in that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionState {
    #[default]
    Initialized,
    WaitingForAuthz,
    WaitingForIssuing,
    Issued,
}

impl TransactionState {
    /// Whether the state machine allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Initialized, Self::WaitingForAuthz | Self::WaitingForIssuing)
                | (Self::WaitingForAuthz, Self::WaitingForAuthz | Self::WaitingForIssuing)
                | (Self::WaitingForIssuing | Self::Issued, Self::Issued)
        )
    }
}

/// Discriminant of [`Interaction`], used to match the interaction endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionType {
    None,
    Redirect,
    UserCode,
}

/// How the end user is brought in. Fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// No end-user interaction requested.
    None,
    /// Browser redirect to the interaction URL, optionally returning to a callback.
    Redirect { callback: Option<CallbackBinding> },
    /// Device flow: the end user types a short code.
    UserCode,
}

impl Interaction {
    #[must_use]
    pub const fn kind(&self) -> InteractionType {
        match self {
            Self::None => InteractionType::None,
            Self::Redirect { .. } => InteractionType::Redirect,
            Self::UserCode => InteractionType::UserCode,
        }
    }

    /// Callback registration, when this is a redirect with callback.
    #[must_use]
    pub const fn callback(&self) -> Option<&CallbackBinding> {
        match self {
            Self::Redirect { callback } => callback.as_ref(),
            _ => None,
        }
    }
}

/// Values that tie a callback redirect back to this transaction.
#[derive(Clone, PartialEq, Eq)]
pub struct CallbackBinding {
    pub uri: String,
    pub client_nonce: String,
    pub server_nonce: String,
    pub hash_algorithm: HashAlgorithm,
}

impl std::fmt::Debug for CallbackBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackBinding")
            .field("uri", &self.uri)
            .field("hash_algorithm", &self.hash_algorithm)
            .finish()
    }
}

/// A single grant negotiation.
///
/// Values handed out by the store are independent copies; changes only take
/// effect once committed back through the store.
#[derive(Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Current continuation handle.
    pub handle: String,
    pub state: TransactionState,
    pub interaction: Interaction,
    /// Pending interaction key (redirect path segment or user code).
    /// Cleared once the interaction is resolved.
    pub interaction_key: Option<String>,
    /// Reference the client must echo after a callback. Consumed on issuance.
    pub interaction_ref: Option<String>,
    /// Key bound at creation.
    pub key: Jwk,
    pub last_updated: DateTime<Utc>,
    /// Bumped by the store on every commit.
    pub(crate) revision: u64,
}

impl Transaction {
    /// A fresh transaction in `Initialized`.
    #[must_use]
    pub fn new(handle: impl Into<String>, key: Jwk, now: DateTime<Utc>) -> Self {
        Self {
            handle: handle.into(),
            state: TransactionState::Initialized,
            interaction: Interaction::None,
            interaction_key: None,
            interaction_ref: None,
            key,
            last_updated: now,
            revision: 0,
        }
    }

    /// Whether the transaction has outlived `timeout` at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        now.signed_duration_since(self.last_updated) > timeout
    }

    /// Move to `next`, rejecting transitions the state machine does not have.
    pub fn advance(&mut self, next: TransactionState) -> Result<(), crate::error::GrantError> {
        if !self.state.can_advance_to(next) {
            return Err(crate::error::GrantError::internal(format!(
                "illegal transition {:?} -> {:?}",
                self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Short, non-secret prefix of the handle for logs.
    #[must_use]
    pub fn log_id(&self) -> &str {
        self.handle.get(..6).unwrap_or(&self.handle)
    }

    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("handle", &self.log_id())
            .field("state", &self.state)
            .field("interaction", &self.interaction.kind())
            .field("last_updated", &self.last_updated)
            .field("revision", &self.revision)
            .finish()
    }
}
